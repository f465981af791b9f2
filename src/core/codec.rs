//! Frame codec for the local command socket.
//!
//! Frame format: `[magic(4)] [version(1)] [length(4, BE)] [payload]`.
//! The magic bytes and version guard against a stray writer on the socket;
//! the length field is bounded by [`MAX_PAYLOAD_SIZE`] so a corrupt header
//! cannot make the decoder reserve unbounded memory.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::config::{MAGIC_BYTES, MAX_PAYLOAD_SIZE, PROTOCOL_VERSION};
use crate::error::BiosError;

const HEADER_SIZE: usize = 4 + 1 + 4;

/// One framed payload, request or response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub payload: Vec<u8>,
}

/// Codec for [`Frame`]s over the local socket.
pub struct FrameCodec;

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = BiosError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, BiosError> {
        if src.len() < HEADER_SIZE {
            return Ok(None);
        }
        if src[0..4] != MAGIC_BYTES {
            return Err(BiosError::TransportError(
                "bad magic bytes in frame header".to_string(),
            ));
        }
        let version = src[4];
        if version != PROTOCOL_VERSION {
            return Err(BiosError::TransportError(format!(
                "unsupported frame version {version}"
            )));
        }
        let length = u32::from_be_bytes([src[5], src[6], src[7], src[8]]) as usize;
        if length > MAX_PAYLOAD_SIZE {
            return Err(BiosError::TransportError(format!(
                "frame payload of {length} bytes exceeds limit"
            )));
        }
        if src.len() < HEADER_SIZE + length {
            src.reserve(HEADER_SIZE + length - src.len());
            return Ok(None);
        }
        src.advance(HEADER_SIZE);
        let payload = src.split_to(length).to_vec();
        Ok(Some(Frame { payload }))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = BiosError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<(), BiosError> {
        if frame.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(BiosError::TransportError(format!(
                "refusing to send {} byte frame",
                frame.payload.len()
            )));
        }
        dst.reserve(HEADER_SIZE + frame.payload.len());
        dst.put_slice(&MAGIC_BYTES);
        dst.put_u8(PROTOCOL_VERSION);
        dst.put_u32(frame.payload.len() as u32);
        dst.put_slice(&frame.payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::expect_used)]
    fn encode_decode_round_trip() {
        let mut codec = FrameCodec;
        let mut buf = BytesMut::new();
        let frame = Frame {
            payload: vec![0x0c, 1, 2, 3],
        };
        codec.encode(frame.clone(), &mut buf).expect("encode");
        let decoded = codec.decode(&mut buf).expect("decode").expect("complete");
        assert_eq!(decoded, frame);
        assert!(buf.is_empty());
    }

    #[test]
    #[allow(clippy::expect_used)]
    fn partial_frame_waits_for_more() {
        let mut codec = FrameCodec;
        let mut buf = BytesMut::new();
        codec
            .encode(
                Frame {
                    payload: vec![9; 32],
                },
                &mut buf,
            )
            .expect("encode");
        let mut partial = buf.split_to(10);
        assert!(codec.decode(&mut partial).expect("no error").is_none());
    }

    #[test]
    fn bad_magic_rejected() {
        let mut codec = FrameCodec;
        let mut buf = BytesMut::from(&[0xff; 16][..]);
        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn oversized_length_rejected() {
        let mut codec = FrameCodec;
        let mut buf = BytesMut::new();
        buf.put_slice(&MAGIC_BYTES);
        buf.put_u8(PROTOCOL_VERSION);
        buf.put_u32(u32::MAX);
        assert!(codec.decode(&mut buf).is_err());
    }
}
