//! Typed bidirectional channels over byte streams.
//!
//! A [`Chan<T>`] turns any connected `AsyncRead + AsyncWrite` stream into a
//! pair of queues: values sent locally are written to the stream, values
//! written by the peer come out of [`Chan::recv`]. Each value travels as a
//! continuation flag frame followed by a value frame. Closing a channel
//! writes a termination flag, which closes the peer's receiving side.
//!
//! Stream failures never surface from `send` or `recv` directly. The
//! background pumps hand them to a [`Reporter`]: [`Latched`] keeps the
//! first fatal error per direction, [`Streamed`] delivers all of them.
//!
//! ```no_run
//! # async fn demo() -> netchan_transport::Result<()> {
//! use netchan_engine::{connect_tcp, Chan, ChanConfig};
//!
//! let mut chan: Chan<String> = connect_tcp("127.0.0.1:7000", ChanConfig::default()).await?;
//! let _ = chan.send("hello".to_string()).await;
//! if let Some(reply) = chan.recv().await {
//!     println!("{reply}");
//! }
//! chan.close();
//! # Ok(())
//! # }
//! ```

pub mod chan;
pub mod connector;
pub mod error;
pub mod listener;
mod pump;
pub mod report;

pub use chan::{Chan, ChanConfig, DEFAULT_MAX_TRANSIENT_RETRIES};
#[cfg(unix)]
pub use connector::connect_unix;
pub use connector::{connect_tcp, wrap};
pub use error::{ChanError, Direction, PumpError, SendError};
pub use listener::{listen, ACCEPT_BACKOFF};
pub use report::{Latched, Reporter, Streamed};
