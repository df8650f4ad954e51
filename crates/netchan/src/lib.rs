//! Typed bidirectional message channels over byte streams.
//!
//! Wrap a connected stream in a [`Chan<T>`](engine::Chan) and both ends get
//! an ordered, back-pressured queue of `T` in each direction. Closing one
//! side tells the peer, stream failures are reported instead of panicking.
//!
//! # Crate Structure
//!
//! - [`transport`]: stream and listener abstraction (TCP, Unix sockets)
//! - [`frame`]: the flag/value wire codec
//! - [`engine`]: channels, pumps, error reporters, the accept loop
//! - [`packet`]: the chat protocol used by the `netchan` binary

/// Re-export transport types.
pub mod transport {
    pub use netchan_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use netchan_frame::*;
}

/// Re-export engine types.
pub mod engine {
    pub use netchan_engine::*;
}

pub mod packet;

pub use netchan_engine::{listen, wrap, Chan, ChanConfig, ChanError, SendError};
