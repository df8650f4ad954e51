use std::fmt;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::{FrameError, Result};

/// Frame header: magic (2) + kind (1) + length (4) = 7 bytes.
pub const HEADER_SIZE: usize = 7;

/// Magic bytes: "NC" (0x4E 0x43).
pub const MAGIC: [u8; 2] = [0x4E, 0x43];

/// Default maximum payload size: 16 MiB.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

const FLAG_TERMINATE: u8 = 0x00;
const FLAG_CONTINUE: u8 = 0x01;

/// What a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    /// A one-byte continuation (`true`) or termination (`false`) flag.
    Flag = 0,
    /// One encoded element.
    Value = 1,
}

impl FrameKind {
    fn from_byte(byte: u8) -> Result<Self> {
        match byte {
            0 => Ok(Self::Flag),
            1 => Ok(Self::Value),
            other => Err(FrameError::UnknownKind(other)),
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flag => write!(f, "flag"),
            Self::Value => write!(f, "value"),
        }
    }
}

/// A single frame as it travels on the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// What the payload means.
    pub kind: FrameKind,
    /// The raw payload.
    pub payload: Bytes,
}

impl Frame {
    /// A flag frame: `true` announces a value, `false` ends the stream.
    pub fn flag(more: bool) -> Self {
        let byte = if more { FLAG_CONTINUE } else { FLAG_TERMINATE };
        Self {
            kind: FrameKind::Flag,
            payload: Bytes::copy_from_slice(&[byte]),
        }
    }

    /// A value frame around an already encoded element.
    pub fn value(payload: impl Into<Bytes>) -> Self {
        Self {
            kind: FrameKind::Value,
            payload: payload.into(),
        }
    }

    /// Interpret this frame as a flag.
    pub fn as_flag(&self) -> Result<bool> {
        self.expect(FrameKind::Flag)?;
        match self.payload.as_ref() {
            [FLAG_TERMINATE] => Ok(false),
            [FLAG_CONTINUE] => Ok(true),
            other => Err(FrameError::InvalidFlag { len: other.len() }),
        }
    }

    /// Fail unless this frame has the given kind.
    pub fn expect(&self, kind: FrameKind) -> Result<()> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(FrameError::UnexpectedFrame {
                expected: kind,
                found: self.kind,
            })
        }
    }

    /// The total wire size of this frame (header + payload).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload.len()
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────┬──────────┬────────────┬──────────────────┐
/// │ Magic (2B)   │ Kind (1B)│ Length     │ Payload          │
/// │ 0x4E 0x43    │ 0 / 1    │ (4B LE)    │ (Length bytes)   │
/// │ "NC"         │          │            │                  │
/// └──────────────┴──────────┴────────────┴──────────────────┘
/// ```
pub fn encode_frame(kind: FrameKind, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > u32::MAX as usize {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: u32::MAX as usize,
        });
    }
    dst.reserve(HEADER_SIZE + payload.len());
    dst.put_slice(&MAGIC);
    dst.put_u8(kind as u8);
    dst.put_u32_le(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// On success, consumes the frame bytes from the buffer.
pub fn decode_frame(src: &mut BytesMut, max_payload: usize) -> Result<Option<Frame>> {
    if src.len() < HEADER_SIZE {
        return Ok(None);
    }

    if src[0..2] != MAGIC {
        return Err(FrameError::InvalidMagic);
    }

    let kind = FrameKind::from_byte(src[2])?;
    let payload_len = u32::from_le_bytes([src[3], src[4], src[5], src[6]]) as usize;

    if payload_len > max_payload {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: max_payload,
        });
    }

    let total = HEADER_SIZE + payload_len;
    if src.len() < total {
        src.reserve(total - src.len());
        return Ok(None);
    }

    src.advance(HEADER_SIZE);
    let payload = src.split_to(payload_len).freeze();

    Ok(Some(Frame { kind, payload }))
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size in bytes. Default: 16 MiB.
    pub max_payload_size: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
        }
    }
}

/// [`tokio_util::codec`] adapter for the frame format.
#[derive(Debug, Clone)]
pub struct FrameCodec {
    max_payload_size: usize,
}

impl FrameCodec {
    /// Create a codec enforcing the configured payload limit.
    pub fn new(config: &FrameConfig) -> Self {
        Self {
            max_payload_size: config.max_payload_size,
        }
    }

    /// Largest payload accepted in either direction.
    pub fn max_payload_size(&self) -> usize {
        self.max_payload_size
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(&FrameConfig::default())
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        decode_frame(src, self.max_payload_size)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(FrameError::UnexpectedEof),
        }
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = FrameError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        if frame.payload.len() > self.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: frame.payload.len(),
                max: self.max_payload_size,
            });
        }
        encode_frame(frame.kind, &frame.payload, dst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_value() {
        let mut buf = BytesMut::new();
        let payload = br#"{"id":42}"#;

        encode_frame(FrameKind::Value, payload, &mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE + payload.len());

        let frame = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD)
            .unwrap()
            .unwrap();

        assert_eq!(frame.kind, FrameKind::Value);
        assert_eq!(frame.payload.as_ref(), payload);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_flag_frames() {
        assert!(Frame::flag(true).as_flag().unwrap());
        assert!(!Frame::flag(false).as_flag().unwrap());
        assert_eq!(Frame::flag(true).wire_size(), HEADER_SIZE + 1);
    }

    #[test]
    fn test_decode_incomplete_header() {
        let mut buf = BytesMut::from(&[0x4E, 0x43, 0x00][..]);
        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap();
        assert!(result.is_none());
        assert_eq!(buf.len(), 3);
    }

    #[test]
    fn test_decode_incomplete_payload() {
        let mut buf = BytesMut::new();
        encode_frame(FrameKind::Value, b"hello", &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 2);

        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_decode_invalid_magic() {
        let mut buf = BytesMut::from(&[0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00, 0x00][..]);
        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(FrameError::InvalidMagic)));
    }

    #[test]
    fn test_decode_unknown_kind() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u8(7);
        buf.put_u32_le(0);

        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(FrameError::UnknownKind(7))));
    }

    #[test]
    fn test_decode_payload_too_large() {
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC);
        buf.put_u8(FrameKind::Value as u8);
        buf.put_u32_le(1024 * 1024 * 32);

        let result = decode_frame(&mut buf, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(result, Err(FrameError::PayloadTooLarge { .. })));
    }

    #[test]
    fn test_flag_then_value_sequence() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::new();
        codec.encode(Frame::flag(true), &mut buf).unwrap();
        codec.encode(Frame::value(&b"\"potato\""[..]), &mut buf).unwrap();
        codec.encode(Frame::flag(false), &mut buf).unwrap();

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert!(first.as_flag().unwrap());
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.kind, FrameKind::Value);
        assert_eq!(second.payload.as_ref(), b"\"potato\"");
        let third = codec.decode(&mut buf).unwrap().unwrap();
        assert!(!third.as_flag().unwrap());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_value_frame_is_not_a_flag() {
        let err = Frame::value(&b"1"[..]).as_flag().unwrap_err();
        assert!(matches!(
            err,
            FrameError::UnexpectedFrame {
                expected: FrameKind::Flag,
                found: FrameKind::Value
            }
        ));
    }

    #[test]
    fn test_malformed_flag_payload() {
        let frame = Frame {
            kind: FrameKind::Flag,
            payload: Bytes::from_static(&[0x01, 0x01]),
        };
        assert!(matches!(
            frame.as_flag(),
            Err(FrameError::InvalidFlag { len: 2 })
        ));

        let frame = Frame {
            kind: FrameKind::Flag,
            payload: Bytes::from_static(&[0x05]),
        };
        assert!(matches!(
            frame.as_flag(),
            Err(FrameError::InvalidFlag { len: 1 })
        ));
    }

    #[test]
    fn test_codec_rejects_oversized_encode() {
        let mut codec = FrameCodec::new(&FrameConfig {
            max_payload_size: 4,
        });
        let mut buf = BytesMut::new();
        let err = codec
            .encode(Frame::value(&b"oversized"[..]), &mut buf)
            .unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { size: 9, max: 4 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_eof_mid_frame() {
        let mut codec = FrameCodec::default();
        let mut buf = BytesMut::new();
        encode_frame(FrameKind::Value, b"partial", &mut buf).unwrap();
        buf.truncate(HEADER_SIZE + 3);

        assert!(matches!(
            codec.decode_eof(&mut buf),
            Err(FrameError::UnexpectedEof)
        ));
        assert!(codec.decode_eof(&mut BytesMut::new()).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_framed_read_over_stream() {
        use futures_util::StreamExt;
        use tokio_util::codec::FramedRead;

        let mut wire = BytesMut::new();
        encode_frame(FrameKind::Flag, &[FLAG_CONTINUE], &mut wire).unwrap();
        encode_frame(FrameKind::Value, b"7", &mut wire).unwrap();
        let bytes = wire.to_vec();

        let mut framed = FramedRead::new(bytes.as_slice(), FrameCodec::default());
        assert!(framed.next().await.unwrap().unwrap().as_flag().unwrap());
        let value = framed.next().await.unwrap().unwrap();
        assert_eq!(value.payload.as_ref(), b"7");
        assert!(framed.next().await.is_none());
    }
}
