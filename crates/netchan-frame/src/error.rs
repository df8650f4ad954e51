use std::io::ErrorKind;

use crate::codec::FrameKind;

/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The frame header contains an invalid magic number.
    #[error("invalid frame magic (expected 0x4E43 \"NC\")")]
    InvalidMagic,

    /// The frame header carries a kind byte this codec does not know.
    #[error("unknown frame kind 0x{0:02x}")]
    UnknownKind(u8),

    /// A frame of the wrong kind arrived for the current protocol state.
    #[error("unexpected {found} frame (expected {expected})")]
    UnexpectedFrame { expected: FrameKind, found: FrameKind },

    /// A flag frame whose payload is not a single 0x00/0x01 byte.
    #[error("malformed flag frame ({len} byte payload)")]
    InvalidFlag { len: usize },

    /// The payload exceeds the configured maximum size.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The value could not be serialized.
    #[error("value encoding failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The value frame could not be deserialized into the element type.
    #[error("value decoding failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection was closed cleanly on a frame boundary.
    #[error("connection closed")]
    ConnectionClosed,

    /// The connection was closed in the middle of a frame.
    #[error("connection closed (incomplete frame)")]
    UnexpectedEof,

    /// The stream was already torn down locally.
    #[error("stream closed")]
    StreamClosed,
}

impl FrameError {
    /// Whether the error came from the stream without consuming or producing
    /// any bytes, so the same read or write can be resumed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Io(err) => matches!(
                err.kind(),
                ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Whether the error is the orderly end of the stream.
    pub fn is_clean_close(&self) -> bool {
        matches!(self, Self::ConnectionClosed)
    }

    /// Whether the peer has already closed or reset its end of the stream.
    pub fn is_peer_gone(&self) -> bool {
        match self {
            Self::Io(err) => matches!(
                err.kind(),
                ErrorKind::BrokenPipe
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::UnexpectedEof
            ),
            Self::UnexpectedEof => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_kinds() {
        for kind in [ErrorKind::Interrupted, ErrorKind::WouldBlock, ErrorKind::TimedOut] {
            assert!(FrameError::Io(kind.into()).is_transient(), "{kind:?}");
        }
        assert!(!FrameError::Io(ErrorKind::BrokenPipe.into()).is_transient());
        assert!(!FrameError::UnexpectedEof.is_transient());
        assert!(!FrameError::ConnectionClosed.is_transient());
    }

    #[test]
    fn only_boundary_eof_is_clean() {
        assert!(FrameError::ConnectionClosed.is_clean_close());
        assert!(!FrameError::UnexpectedEof.is_clean_close());
        assert!(!FrameError::StreamClosed.is_clean_close());
    }

    #[test]
    fn peer_gone_kinds() {
        for kind in [
            ErrorKind::BrokenPipe,
            ErrorKind::ConnectionReset,
            ErrorKind::ConnectionAborted,
            ErrorKind::UnexpectedEof,
        ] {
            assert!(FrameError::Io(kind.into()).is_peer_gone(), "{kind:?}");
        }
        assert!(FrameError::UnexpectedEof.is_peer_gone());
        assert!(!FrameError::Io(ErrorKind::Interrupted.into()).is_peer_gone());
        assert!(!FrameError::StreamClosed.is_peer_gone());
        assert!(!FrameError::InvalidMagic.is_peer_gone());
    }
}
