//! Flag/value framing for typed channels over byte streams.
//!
//! Every write on the stream is one frame with:
//! - A 2-byte magic number ("NC") for stream synchronization
//! - A 1-byte frame kind (flag or value)
//! - A 4-byte little-endian payload length
//!
//! A channel direction is a strict alternation of a flag frame, optionally
//! followed by one value frame when the flag is `true`. A `false` flag ends
//! the direction. Values are encoded with `serde_json`, so the decoder needs
//! nothing beyond the element type.

pub mod codec;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, Frame, FrameCodec, FrameConfig, FrameKind, DEFAULT_MAX_PAYLOAD,
    HEADER_SIZE,
};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
