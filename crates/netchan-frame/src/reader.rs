use bytes::BytesMut;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::{Frame, FrameCodec, FrameConfig, FrameKind};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Reads complete frames from any `AsyncRead` stream.
///
/// Handles partial reads internally, callers always get complete frames.
/// A failed read leaves already buffered bytes in place, so a read that
/// failed with a transient error can simply be retried.
pub struct FrameReader<R> {
    inner: R,
    buf: BytesMut,
    codec: FrameCodec,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: R) -> Self {
        Self::with_config(inner, &FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: R, config: &FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            codec: FrameCodec::new(config),
        }
    }

    /// Read the next complete frame.
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached on a
    /// frame boundary and `Err(FrameError::UnexpectedEof)` inside a frame.
    pub async fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.codec.decode(&mut self.buf)? {
                trace!(kind = %frame.kind, len = frame.payload.len(), "frame read");
                return Ok(frame);
            }

            self.buf.reserve(READ_CHUNK_SIZE);
            let read = self.inner.read_buf(&mut self.buf).await?;

            if read == 0 {
                return Err(if self.buf.is_empty() {
                    FrameError::ConnectionClosed
                } else {
                    FrameError::UnexpectedEof
                });
            }
        }
    }

    /// Read a flag frame.
    pub async fn read_flag(&mut self) -> Result<bool> {
        self.read_frame().await?.as_flag()
    }

    /// Read a value frame and decode it into `T`.
    ///
    /// A value is always announced by a flag, so EOF here is never clean.
    pub async fn read_value<T: DeserializeOwned>(&mut self) -> Result<T> {
        let frame = match self.read_frame().await {
            Ok(frame) => frame,
            Err(FrameError::ConnectionClosed) => return Err(FrameError::UnexpectedEof),
            Err(err) => return Err(err),
        };
        frame.expect(FrameKind::Value)?;
        serde_json::from_slice(&frame.payload).map_err(FrameError::Decode)
    }

    /// Number of bytes received but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> R {
        self.inner
    }
}
