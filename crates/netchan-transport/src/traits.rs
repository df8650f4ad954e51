use std::future::Future;
use std::io::{self, ErrorKind};

use tokio::io::{AsyncRead, AsyncWrite};

/// A connected byte stream a channel can be layered on.
///
/// Anything that is `AsyncRead + AsyncWrite` and can move between tasks
/// qualifies: TCP and Unix streams, TLS wrappers, in-memory duplex pipes.
pub trait Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<S> Stream for S where S: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

/// A source of inbound connections.
pub trait Acceptor: Send + Sync {
    /// The stream type of accepted connections.
    type Stream: Stream;
    /// The address reported for accepted connections.
    type Addr: std::fmt::Debug + Send + 'static;

    /// Wait for the next inbound connection.
    fn accept(&self) -> impl Future<Output = io::Result<(Self::Stream, Self::Addr)>> + Send;
}

impl Acceptor for tokio::net::TcpListener {
    type Stream = tokio::net::TcpStream;
    type Addr = std::net::SocketAddr;

    fn accept(&self) -> impl Future<Output = io::Result<(Self::Stream, Self::Addr)>> + Send {
        async move {
            let (stream, addr) = tokio::net::TcpListener::accept(self).await?;
            // Same as `connect_tcp`: a flag and its value are separate small writes.
            stream.set_nodelay(true)?;
            Ok((stream, addr))
        }
    }
}

#[cfg(unix)]
impl Acceptor for tokio::net::UnixListener {
    type Stream = tokio::net::UnixStream;
    type Addr = tokio::net::unix::SocketAddr;

    fn accept(&self) -> impl Future<Output = io::Result<(Self::Stream, Self::Addr)>> + Send {
        tokio::net::UnixListener::accept(self)
    }
}

/// Whether an accept error only concerns one connection attempt or a
/// momentary condition, so the accept loop may keep going.
pub fn is_transient_accept_error(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::ConnectionAborted
            | ErrorKind::ConnectionReset
            | ErrorKind::Interrupted
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
    ) || is_resource_exhaustion(err)
}

/// Whether the process ran out of descriptors or buffer memory.
///
/// Accepting again immediately would spin, callers should back off first.
#[cfg(unix)]
pub fn is_resource_exhaustion(err: &io::Error) -> bool {
    matches!(
        err.raw_os_error(),
        Some(libc::EMFILE | libc::ENFILE | libc::ENOBUFS | libc::ENOMEM)
    )
}

/// Whether the process ran out of descriptors or buffer memory.
#[cfg(not(unix))]
pub fn is_resource_exhaustion(_err: &io::Error) -> bool {
    false
}
