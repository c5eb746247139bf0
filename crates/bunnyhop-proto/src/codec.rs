//! Frame demultiplexing as a [`tokio_util::codec`] pair.
//!
//! [`FrameCodec`] turns a byte stream into a [`Frame`] stream (and back) by
//! peeking the envelope's payload-size field before committing to read a
//! whole frame, the same incremental-length-prefix shape as any other
//! `tokio_util` codec.
//!
//! The one-shot 8-octet protocol header exchanged before either side
//! installs a `Framed` transport (`AMQP\0\0\x09\x01`, or the server's
//! `connection.start` in its place) is deliberately out of scope here; that
//! handshake happens over the raw socket in `bunnyhop-core` before a
//! [`FrameCodec`] is ever constructed.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::error::ProtocolError;
use crate::frame::{Frame, HEADER_LEN};

/// Decodes/encodes [`Frame`]s, rejecting any frame whose declared payload
/// size exceeds a negotiated `frame_max`.
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_size: Option<usize>,
}

impl FrameCodec {
    /// A codec with no frame-size ceiling (used before `connection.tune`
    /// negotiates one).
    #[must_use]
    pub fn new() -> Self {
        Self { max_frame_size: None }
    }

    /// A codec that rejects any frame declaring more than `max_frame_size`
    /// bytes of payload.
    #[must_use]
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size: Some(max_frame_size) }
    }

    /// Tighten (or loosen) the frame-size ceiling in place, e.g. once
    /// `connection.tune-ok` settles on a value.
    pub fn set_max_frame_size(&mut self, max_frame_size: usize) {
        self.max_frame_size = Some(max_frame_size);
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for FrameCodec {
    type Item = Frame;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, ProtocolError> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }
        let payload_size = Frame::peek_payload_size(src)? as usize;
        if let Some(max) = self.max_frame_size {
            if payload_size > max {
                return Err(ProtocolError::FrameTooLarge { size: payload_size, max });
            }
        }
        let total = HEADER_LEN + payload_size + 1;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }
        let frame_bytes = src.split_to(total);
        let frame = Frame::decode(&frame_bytes)?;
        Ok(Some(frame))
    }
}

impl Encoder<Frame> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        if let Some(max) = self.max_frame_size {
            if item.payload.len() > max {
                return Err(ProtocolError::FrameTooLarge { size: item.payload.len(), max });
            }
        }
        let encoded = item.encode();
        dst.reserve(encoded.len());
        dst.extend_from_slice(&encoded);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn decodes_a_frame_split_across_two_chunks() {
        let mut codec = FrameCodec::new();
        let frame = Frame::method(1, Bytes::from_static(b"split-me"));
        let encoded = frame.encode();
        let mut buf = BytesMut::new();

        buf.extend_from_slice(&encoded[..5]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);

        buf.extend_from_slice(&encoded[5..]);
        let decoded = codec.decode(&mut buf).unwrap().expect("complete frame");
        assert_eq!(decoded, frame);
        assert!(buf.is_empty());
    }

    #[test]
    fn rejects_a_frame_over_the_negotiated_max() {
        let mut codec = FrameCodec::with_max_frame_size(4);
        let frame = Frame::body(1, Bytes::from_static(b"too long"));
        let mut buf = BytesMut::from(&frame.encode()[..]);
        let err = codec.decode(&mut buf).unwrap_err();
        assert_eq!(err, ProtocolError::FrameTooLarge { size: 8, max: 4 });
    }

    #[test]
    fn encode_then_decode_round_trips() {
        let mut codec = FrameCodec::new();
        let frame = Frame::heartbeat();
        let mut buf = BytesMut::new();
        codec.encode(frame.clone(), &mut buf).unwrap();
        let decoded = codec.decode(&mut buf).unwrap().expect("frame");
        assert_eq!(decoded, frame);
    }
}
