use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use netchan_frame::{FrameConfig, FrameReader, FrameWriter};
use netchan_transport::Stream;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, debug_span, error, Instrument};

use crate::error::{ChanError, PumpError, SendError};
use crate::pump::{recv_pump, send_pump, Link};
use crate::report::{Latched, Reporter, Streamed};

/// Default number of consecutive transient errors a pump resumes from.
pub const DEFAULT_MAX_TRANSIENT_RETRIES: u32 = 8;

static NEXT_CHAN_ID: AtomicU64 = AtomicU64::new(1);

/// Channel configuration.
#[derive(Debug, Clone)]
pub struct ChanConfig {
    /// Capacity of the outgoing and incoming queues. Zero is treated as one.
    pub buffer: usize,
    /// Frame size limits.
    pub frame: FrameConfig,
    /// Consecutive transient I/O errors resumed before one is fatal.
    pub max_transient_retries: u32,
}

impl Default for ChanConfig {
    fn default() -> Self {
        Self {
            buffer: 1,
            frame: FrameConfig::default(),
            max_transient_retries: DEFAULT_MAX_TRANSIENT_RETRIES,
        }
    }
}

impl ChanConfig {
    pub fn with_buffer(mut self, buffer: usize) -> Self {
        self.buffer = buffer;
        self
    }

    pub fn with_max_payload_size(mut self, max_payload_size: usize) -> Self {
        self.frame.max_payload_size = max_payload_size;
        self
    }

    pub fn with_max_transient_retries(mut self, retries: u32) -> Self {
        self.max_transient_retries = retries;
        self
    }

    fn queue_capacity(&self) -> usize {
        self.buffer.max(1)
    }
}

/// A typed, bidirectional channel over a byte stream.
///
/// Values of `T` passed to [`send`](Self::send) come out of the peer's
/// [`recv`](Self::recv) in order, and vice versa. Both ends must agree on
/// `T`. Two background tasks move values between the local queues and the
/// stream, and report stream failures to the channel's [`Reporter`].
///
/// Dropping the channel closes it. Values already queued are still sent
/// before the stream is torn down.
pub struct Chan<T, R = Latched> {
    id: u64,
    outgoing: Option<mpsc::Sender<T>>,
    incoming: mpsc::Receiver<T>,
    reporter: Arc<R>,
    pumps: Vec<JoinHandle<()>>,
}

impl<T> Chan<T, Latched>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// Layer a channel over `stream` with queues of capacity `buffer`.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn new<S: Stream>(stream: S, buffer: usize) -> Self {
        Self::with_config(stream, ChanConfig::default().with_buffer(buffer))
    }

    /// Layer a channel over `stream` with explicit configuration.
    pub fn with_config<S: Stream>(stream: S, config: ChanConfig) -> Self {
        Self::with_reporter(stream, config, Latched::new())
    }

    /// Every fatal error seen so far, `None` while the channel is healthy.
    pub fn error(&self) -> Option<ChanError> {
        self.reporter.error()
    }
}

impl<T> Chan<T, Streamed>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    /// Wait for the next pump error, fatal or not.
    ///
    /// Returns `None` once both pumps have stopped and every error has been
    /// delivered.
    pub async fn next_error(&self) -> Option<PumpError> {
        self.reporter.next_error().await
    }
}

impl<T, R> Chan<T, R>
where
    T: Serialize + DeserializeOwned + Send + 'static,
    R: Reporter,
{
    /// Layer a channel over `stream`, sending pump errors to `reporter`.
    pub fn with_reporter<S: Stream>(stream: S, config: ChanConfig, reporter: R) -> Self {
        let id = NEXT_CHAN_ID.fetch_add(1, Ordering::Relaxed);
        let capacity = config.queue_capacity();
        let (outgoing, outgoing_rx) = mpsc::channel(capacity);
        let (incoming_tx, incoming) = mpsc::channel(capacity);

        let (read_half, write_half) = tokio::io::split(stream);
        let reporter = Arc::new(reporter);
        let link = Arc::new(Link::new(
            FrameWriter::with_config(write_half, &config.frame),
            Arc::clone(&reporter),
            config.max_transient_retries,
        ));
        let reader = FrameReader::with_config(read_half, &config.frame);

        let span = debug_span!("chan", id);
        let pumps = vec![
            tokio::spawn(send_pump(Arc::clone(&link), outgoing_rx).instrument(span.clone())),
            tokio::spawn(recv_pump(link, reader, incoming_tx).instrument(span)),
        ];
        debug!(id, capacity, "channel opened");

        Self {
            id,
            outgoing: Some(outgoing),
            incoming,
            reporter,
            pumps,
        }
    }

    /// Process-unique identifier, also attached to the pumps' log spans.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Queue a value for the peer, waiting while the outgoing queue is full.
    pub async fn send(&self, value: T) -> Result<(), SendError<T>> {
        match &self.outgoing {
            Some(outgoing) => outgoing
                .send(value)
                .await
                .map_err(|err| SendError::Stopped(err.0)),
            None => Err(SendError::Closed(value)),
        }
    }

    /// Receive the next value from the peer.
    ///
    /// Returns `None` once the peer closed its side, the stream ended, or
    /// the receive pump stopped on an error.
    pub async fn recv(&mut self) -> Option<T> {
        self.incoming.recv().await
    }

    /// Close the sending side.
    ///
    /// Values already queued are still delivered, then the peer is told
    /// no more will follow. Closing twice is a no-op.
    pub fn close(&mut self) {
        if self.outgoing.take().is_some() {
            debug!(id = self.id, "channel closed");
        }
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.outgoing.is_none()
    }

    /// The raw outgoing queue, `None` after [`close`](Self::close).
    ///
    /// Useful for `try_send` or for handing a clone to another task. The
    /// peer only sees the termination flag once every clone is dropped.
    pub fn sender(&self) -> Option<&mpsc::Sender<T>> {
        self.outgoing.as_ref()
    }

    /// The raw incoming queue.
    ///
    /// Closing it has the same effect on the receive pump as
    /// [`shutdown`](Self::shutdown).
    pub fn receiver(&mut self) -> &mut mpsc::Receiver<T> {
        &mut self.incoming
    }

    /// The reporter the pumps send errors to.
    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Close both queues and wait until both pumps have stopped.
    ///
    /// Values already queued for the peer are still sent, followed by the
    /// termination flag. Values arriving from the peer after this call are
    /// discarded, values already received stay readable through
    /// [`recv`](Self::recv).
    pub async fn shutdown(&mut self) {
        self.close();
        self.incoming.close();
        for pump in self.pumps.drain(..) {
            if let Err(err) = pump.await {
                error!(id = self.id, error = %err, "pump task failed");
            }
        }
    }
}

impl<T, R> std::fmt::Debug for Chan<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chan")
            .field("id", &self.id)
            .field("closed", &self.outgoing.is_none())
            .finish_non_exhaustive()
    }
}
