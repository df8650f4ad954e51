//! The two tasks that move values between the queues and the stream.
//!
//! The send pump owns the outgoing queue and writes through the shared
//! write half. The receive pump owns the read half and the incoming queue.
//! The receive pump is the only one that tears the stream down, after
//! which the send pump finds the write half gone.

use std::sync::Arc;

use netchan_frame::{Frame, FrameError, FrameReader, FrameWriter};
use netchan_transport::Stream;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{ReadHalf, WriteHalf};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{Direction, PumpError};
use crate::report::Reporter;

/// State shared by both pumps of one channel.
pub(crate) struct Link<S, R> {
    writer: Mutex<Option<FrameWriter<WriteHalf<S>>>>,
    torn_down: CancellationToken,
    send_done: CancellationToken,
    reporter: Arc<R>,
    max_transient_retries: u32,
}

impl<S, R> Link<S, R>
where
    S: Stream,
    R: Reporter,
{
    pub(crate) fn new(
        writer: FrameWriter<WriteHalf<S>>,
        reporter: Arc<R>,
        max_transient_retries: u32,
    ) -> Self {
        Self {
            writer: Mutex::new(Some(writer)),
            torn_down: CancellationToken::new(),
            send_done: CancellationToken::new(),
            reporter,
            max_transient_retries,
        }
    }

    fn report(&self, direction: Direction, fatal: bool, err: FrameError) {
        if fatal {
            warn!(%direction, error = %err, "pump stopped");
        } else {
            debug!(%direction, error = %err, "transient stream error, resuming");
        }
        self.reporter.report(PumpError::new(direction, fatal, err));
    }

    /// Close the stream for both pumps. Idempotent.
    async fn teardown(&self) {
        self.torn_down.cancel();
        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(err) = writer.shutdown().await {
                debug!(error = %err, "stream shutdown failed");
            }
            debug!("stream torn down");
        }
    }

    /// Write one frame, resuming after transient errors and giving up as
    /// soon as the stream is torn down.
    async fn write(
        &self,
        writer: &mut FrameWriter<WriteHalf<S>>,
        frame: Frame,
    ) -> Result<(), FrameError> {
        tokio::select! {
            biased;
            _ = self.torn_down.cancelled() => Err(FrameError::StreamClosed),
            result = self.write_resuming(writer, frame) => result,
        }
    }

    async fn write_resuming(
        &self,
        writer: &mut FrameWriter<WriteHalf<S>>,
        frame: Frame,
    ) -> Result<(), FrameError> {
        let mut result = writer.write_frame(frame).await;
        let mut attempts = 0;
        loop {
            match result {
                Err(err) if err.is_transient() && attempts < self.max_transient_retries => {
                    attempts += 1;
                    self.report(Direction::Send, false, err);
                    result = writer.resume().await;
                }
                other => return other,
            }
        }
    }

    async fn read_flag(&self, reader: &mut FrameReader<ReadHalf<S>>) -> Result<bool, FrameError> {
        let mut attempts = 0;
        loop {
            match reader.read_flag().await {
                Err(err) if err.is_transient() && attempts < self.max_transient_retries => {
                    attempts += 1;
                    self.report(Direction::Recv, false, err);
                }
                other => return other,
            }
        }
    }

    async fn read_value<T: DeserializeOwned>(
        &self,
        reader: &mut FrameReader<ReadHalf<S>>,
    ) -> Result<T, FrameError> {
        let mut attempts = 0;
        loop {
            match reader.read_value().await {
                Err(err) if err.is_transient() && attempts < self.max_transient_retries => {
                    attempts += 1;
                    self.report(Direction::Recv, false, err);
                }
                other => return other,
            }
        }
    }
}

/// Drain the outgoing queue onto the stream.
///
/// Every value goes out as a continuation flag followed by the value.
/// When the queue is closed a termination flag is written, unless the
/// stream was already torn down by the receive pump.
pub(crate) async fn send_pump<T, S, R>(link: Arc<Link<S, R>>, mut outgoing: mpsc::Receiver<T>)
where
    T: Serialize + Send + 'static,
    S: Stream,
    R: Reporter,
{
    debug!("send pump started");
    loop {
        let next = outgoing.recv().await;

        let mut guard = link.writer.lock().await;
        let Some(writer) = guard.as_mut() else {
            if next.is_some() {
                link.report(Direction::Send, true, FrameError::StreamClosed);
            }
            break;
        };

        let Some(value) = next else {
            match link.write(writer, Frame::flag(false)).await {
                Ok(()) => debug!("termination flag sent"),
                Err(err) if link.torn_down.is_cancelled() => {
                    debug!(error = %err, "stream torn down before termination flag");
                }
                // The peer closed first and already hung up.
                Err(err) if err.is_peer_gone() => {
                    debug!(error = %err, "peer gone before termination flag");
                }
                Err(err) => link.report(Direction::Send, true, err),
            }
            break;
        };

        // Encode before announcing the value so an unencodable value
        // never leaves a dangling continuation flag on the wire.
        let frame = match writer.prepare_value(&value) {
            Ok(frame) => frame,
            Err(err) => {
                link.report(Direction::Send, true, err);
                break;
            }
        };
        if let Err(err) = link.write(writer, Frame::flag(true)).await {
            link.report(Direction::Send, true, err);
            break;
        }
        if let Err(err) = link.write(writer, frame).await {
            link.report(Direction::Send, true, err);
            break;
        }
    }

    drop(outgoing);
    link.send_done.cancel();
    link.reporter.pump_finished(Direction::Send);
    debug!("send pump stopped");
}

/// Read flag/value pairs off the stream into the incoming queue.
///
/// Stops on a termination flag, a clean end of stream, a fatal error, or
/// when nobody holds the incoming queue any more. In every case the
/// stream is torn down and the incoming queue closed. In the last case the
/// send pump is allowed to finish first, so values queued before the
/// channel was dropped still go out.
pub(crate) async fn recv_pump<T, S, R>(
    link: Arc<Link<S, R>>,
    mut reader: FrameReader<ReadHalf<S>>,
    incoming: mpsc::Sender<T>,
) where
    T: DeserializeOwned + Send + 'static,
    S: Stream,
    R: Reporter,
{
    debug!("receive pump started");
    let mut abandoned = false;
    loop {
        let flag = tokio::select! {
            flag = link.read_flag(&mut reader) => flag,
            _ = incoming.closed() => {
                abandoned = true;
                break;
            }
        };
        match flag {
            Ok(true) => {}
            Ok(false) => {
                debug!("termination flag received");
                break;
            }
            Err(err) if err.is_clean_close() => {
                debug!("stream ended");
                break;
            }
            Err(err) => {
                link.report(Direction::Recv, true, err);
                break;
            }
        }

        let value = match link.read_value::<T>(&mut reader).await {
            Ok(value) => value,
            Err(err) => {
                link.report(Direction::Recv, true, err);
                break;
            }
        };

        if incoming.send(value).await.is_err() {
            abandoned = true;
            break;
        }
    }

    if abandoned {
        debug!("incoming queue dropped, waiting for send pump");
        link.send_done.cancelled().await;
    }

    // Tear down before closing the incoming queue, so a caller that saw
    // the queue end never finds the stream still writable.
    link.teardown().await;
    drop(reader);
    drop(incoming);
    link.reporter.pump_finished(Direction::Recv);
    debug!("receive pump stopped");
}
