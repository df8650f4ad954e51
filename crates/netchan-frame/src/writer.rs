use std::io::ErrorKind;

use bytes::BytesMut;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::codec::Encoder;
use tracing::trace;

use crate::codec::{Frame, FrameCodec, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Writes complete frames to any `AsyncWrite` stream.
///
/// The encoded frame stays buffered together with a write cursor until it
/// has been fully written and flushed. If the stream fails with a transient
/// error, [`resume`](Self::resume) continues exactly where the write stopped.
pub struct FrameWriter<W> {
    inner: W,
    buf: BytesMut,
    written: usize,
    flushed: bool,
    codec: FrameCodec,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: W) -> Self {
        Self::with_config(inner, &FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: W, config: &FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            written: 0,
            flushed: true,
            codec: FrameCodec::new(config),
        }
    }

    /// Serialize a value into a value frame without touching the stream.
    ///
    /// Fails with [`FrameError::Encode`] or [`FrameError::PayloadTooLarge`].
    pub fn prepare_value<T: Serialize + ?Sized>(&self, value: &T) -> Result<Frame> {
        let payload = serde_json::to_vec(value).map_err(FrameError::Encode)?;
        if payload.len() > self.codec.max_payload_size() {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: self.codec.max_payload_size(),
            });
        }
        Ok(Frame::value(payload))
    }

    /// Write and flush a complete frame.
    ///
    /// A frame left unfinished by an earlier error is completed first.
    pub async fn write_frame(&mut self, frame: Frame) -> Result<()> {
        if self.has_pending() {
            self.resume().await?;
        }

        let kind = frame.kind;
        self.buf.clear();
        self.written = 0;
        self.codec.encode(frame, &mut self.buf)?;
        self.flushed = false;
        trace!(%kind, len = self.buf.len(), "frame encoded");

        self.resume().await
    }

    /// Write a continuation (`true`) or termination (`false`) flag.
    pub async fn write_flag(&mut self, more: bool) -> Result<()> {
        self.write_frame(Frame::flag(more)).await
    }

    /// Serialize and write a value frame.
    pub async fn write_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let frame = self.prepare_value(value)?;
        self.write_frame(frame).await
    }

    /// Whether a frame has been started but not yet fully written and flushed.
    pub fn has_pending(&self) -> bool {
        !self.flushed
    }

    /// Finish writing the pending frame, if any.
    pub async fn resume(&mut self) -> Result<()> {
        while self.written < self.buf.len() {
            match self.inner.write(&self.buf[self.written..]).await {
                Ok(0) => return Err(FrameError::Io(ErrorKind::WriteZero.into())),
                Ok(n) => self.written += n,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        if !self.flushed {
            self.inner.flush().await?;
            self.flushed = true;
        }
        Ok(())
    }

    /// Shut down the write direction of the underlying stream.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.inner.shutdown().await.map_err(FrameError::Io)
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
