//! Byte stream and listener abstraction for netchan.
//!
//! A channel can sit on any [`Stream`]. This crate adds the pieces needed to
//! obtain streams:
//! - TCP bind/connect helpers
//! - Unix domain sockets with stale-socket cleanup (Linux/macOS)
//! - The [`Acceptor`] trait used by the accept loop, plus the classification
//!   of accept errors into transient and fatal

pub mod error;
pub mod tcp;
pub mod traits;

#[cfg(unix)]
pub mod uds;

pub use error::{Result, TransportError};
pub use tcp::{bind_tcp, connect_tcp};
pub use traits::{is_resource_exhaustion, is_transient_accept_error, Acceptor, Stream};

#[cfg(unix)]
pub use uds::UnixSocketListener;
