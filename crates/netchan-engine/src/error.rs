use std::fmt;
use std::sync::Arc;

use netchan_frame::FrameError;

/// Which pump an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// The pump writing outgoing values to the stream.
    Send,
    /// The pump reading incoming values from the stream.
    Recv,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Send => write!(f, "send"),
            Self::Recv => write!(f, "receive"),
        }
    }
}

/// A stream failure observed by one of the pumps.
///
/// Fatal errors stopped the pump that reported them. Non-fatal errors were
/// transient I/O conditions after which the pump resumed the same frame.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{direction} failed: {source}")]
pub struct PumpError {
    direction: Direction,
    fatal: bool,
    #[source]
    source: Arc<FrameError>,
}

impl PumpError {
    pub(crate) fn new(direction: Direction, fatal: bool, source: FrameError) -> Self {
        Self {
            direction,
            fatal,
            source: Arc::new(source),
        }
    }

    /// The pump that reported the error.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether the pump stopped because of this error.
    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    /// The underlying framing error.
    pub fn frame_error(&self) -> &FrameError {
        &self.source
    }
}

/// Every fatal error a channel has seen so far, one per direction.
#[derive(Debug, Clone)]
pub struct ChanError {
    send: Option<PumpError>,
    recv: Option<PumpError>,
}

impl ChanError {
    /// Combine per-direction errors, `None` if there are none.
    pub(crate) fn combine(send: Option<PumpError>, recv: Option<PumpError>) -> Option<Self> {
        if send.is_none() && recv.is_none() {
            return None;
        }
        Some(Self { send, recv })
    }

    /// The error that stopped the send pump.
    pub fn send(&self) -> Option<&PumpError> {
        self.send.as_ref()
    }

    /// The error that stopped the receive pump.
    pub fn recv(&self) -> Option<&PumpError> {
        self.recv.as_ref()
    }
}

impl fmt::Display for ChanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.send, &self.recv) {
            (Some(send), Some(recv)) => write!(f, "{send}\n{recv}"),
            (Some(only), None) | (None, Some(only)) => write!(f, "{only}"),
            (None, None) => Ok(()),
        }
    }
}

impl std::error::Error for ChanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.send
            .as_ref()
            .or(self.recv.as_ref())
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

/// Returned by [`Chan::send`](crate::Chan::send) with the value that could
/// not be queued.
#[derive(thiserror::Error)]
pub enum SendError<T> {
    /// [`Chan::close`](crate::Chan::close) was already called.
    #[error("channel closed")]
    Closed(T),
    /// The send pump stopped after a fatal error or a stream teardown.
    #[error("send pump stopped")]
    Stopped(T),
}

impl<T> SendError<T> {
    /// Recover the value.
    pub fn into_inner(self) -> T {
        match self {
            Self::Closed(value) | Self::Stopped(value) => value,
        }
    }
}

impl<T> fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed(_) => f.write_str("Closed(..)"),
            Self::Stopped(_) => f.write_str("Stopped(..)"),
        }
    }
}
