//! The frame envelope shared by all four frame kinds.
//!
//! On the wire: `1 octet kind | 2 octets channel | 4 octets payload_size |
//! payload | 1 octet frame_end (0xCE)`. This module only knows about the
//! envelope; interpreting `payload` as a method, header, or body is the
//! concern of [`crate::tables`] and [`crate::properties`].

use bytes::{Bytes, BytesMut};

use crate::error::{ProtocolError, Result};
use crate::reader::Reader;
use crate::writer::Writer;

/// Marks the end of every frame's payload.
pub const FRAME_END: u8 = 0xCE;

/// Length of the envelope preceding `payload`: kind + channel + size.
pub const HEADER_LEN: usize = 7;

/// The channel frames are still multiplexed on before a channel number is
/// meaningful, and the one `connection.*` methods always use.
pub const CHANNEL_ZERO: u16 = 0;

/// Which of the four frame types a frame's `kind` octet names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Carries a method's arguments.
    Method,
    /// Carries `basic-properties` plus the declared body size.
    Header,
    /// Carries a raw slice of a message body.
    Body,
    /// Empty keepalive, sent on channel 0.
    Heartbeat,
}

impl FrameKind {
    const METHOD: u8 = 1;
    const HEADER: u8 = 2;
    const BODY: u8 = 3;
    const HEARTBEAT: u8 = 8;

    fn to_u8(self) -> u8 {
        match self {
            FrameKind::Method => Self::METHOD,
            FrameKind::Header => Self::HEADER,
            FrameKind::Body => Self::BODY,
            FrameKind::Heartbeat => Self::HEARTBEAT,
        }
    }

    fn from_u8(kind: u8) -> Result<Self> {
        match kind {
            Self::METHOD => Ok(FrameKind::Method),
            Self::HEADER => Ok(FrameKind::Header),
            Self::BODY => Ok(FrameKind::Body),
            Self::HEARTBEAT => Ok(FrameKind::Heartbeat),
            other => Err(ProtocolError::UnknownFrameKind { kind: other }),
        }
    }
}

/// A fully framed envelope: kind, channel, and opaque payload bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Which of the four frame kinds this is.
    pub kind: FrameKind,
    /// Channel this frame belongs to, or 0 for connection-level frames and
    /// heartbeats.
    pub channel: u16,
    /// Raw payload, not yet interpreted as a method/header/body.
    pub payload: Bytes,
}

impl Frame {
    /// Build a method frame.
    #[must_use]
    pub fn method(channel: u16, payload: Bytes) -> Self {
        Self { kind: FrameKind::Method, channel, payload }
    }

    /// Build a content-header frame.
    #[must_use]
    pub fn header(channel: u16, payload: Bytes) -> Self {
        Self { kind: FrameKind::Header, channel, payload }
    }

    /// Build a content-body frame.
    #[must_use]
    pub fn body(channel: u16, payload: Bytes) -> Self {
        Self { kind: FrameKind::Body, channel, payload }
    }

    /// Build the empty heartbeat frame, always on channel 0.
    #[must_use]
    pub fn heartbeat() -> Self {
        Self { kind: FrameKind::Heartbeat, channel: CHANNEL_ZERO, payload: Bytes::new() }
    }

    /// Number of bytes this frame occupies on the wire once encoded.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN + self.payload.len() + 1
    }

    /// Peek the envelope's declared payload size from the first
    /// [`HEADER_LEN`] bytes of a buffer, without consuming anything.
    ///
    /// # Errors
    ///
    /// Propagates `ProtocolError::UnexpectedEof` if fewer than
    /// [`HEADER_LEN`] bytes are available.
    pub fn peek_payload_size(buf: &[u8]) -> Result<u32> {
        let mut reader = Reader::new(buf);
        reader.skip(1, "frame.kind")?;
        reader.skip(2, "frame.channel")?;
        reader.u32("frame.payload_size")
    }

    /// Decode a frame from a buffer that holds exactly one complete,
    /// envelope-to-`frame_end` frame (as established by the caller checking
    /// [`Self::peek_payload_size`] against the remaining buffer length).
    ///
    /// # Errors
    ///
    /// `ProtocolError::UnknownFrameKind` for an unrecognized `kind` octet,
    /// `ProtocolError::InvalidFrameEnd` if the trailing octet is not
    /// [`FRAME_END`].
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut reader = Reader::new(buf);
        let kind = FrameKind::from_u8(reader.u8("frame.kind")?)?;
        let channel = reader.u16("frame.channel")?;
        let size = reader.u32("frame.payload_size")? as usize;
        let payload = Bytes::copy_from_slice(reader.bytes(size, "frame.payload")?);
        let end = reader.u8("frame.frame_end")?;
        if end != FRAME_END {
            return Err(ProtocolError::InvalidFrameEnd { found: end });
        }
        Ok(Self { kind, channel, payload })
    }

    /// Encode this frame's envelope, payload, and trailing `frame_end`.
    #[must_use]
    pub fn encode(&self) -> BytesMut {
        let mut writer = Writer::fixed(self.encoded_len());
        writer.u8(self.kind.to_u8());
        writer.u16(self.channel);
        writer.u32(self.payload.len() as u32);
        writer.raw(&self.payload);
        writer.u8(FRAME_END);
        writer.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_method_frame() {
        let frame = Frame::method(7, Bytes::from_static(b"hello"));
        let encoded = frame.encode();
        let decoded = Frame::decode(&encoded).expect("decode");
        assert_eq!(decoded, frame);
    }

    #[test]
    fn heartbeat_has_empty_payload_on_channel_zero() {
        let frame = Frame::heartbeat();
        assert_eq!(frame.channel, CHANNEL_ZERO);
        assert!(frame.payload.is_empty());
        assert_eq!(frame.encoded_len(), HEADER_LEN + 1);
    }

    #[test]
    fn rejects_a_bad_frame_end() {
        let mut encoded = Frame::method(0, Bytes::from_static(b"x")).encode();
        let last = encoded.len() - 1;
        encoded[last] = 0x00;
        let err = Frame::decode(&encoded).unwrap_err();
        assert_eq!(err, ProtocolError::InvalidFrameEnd { found: 0x00 });
    }

    #[test]
    fn rejects_an_unknown_kind() {
        let mut encoded = Frame::method(0, Bytes::from_static(b"x")).encode();
        encoded[0] = 99;
        let err = Frame::decode(&encoded).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownFrameKind { kind: 99 });
    }

    #[test]
    fn peek_payload_size_matches_encoded_payload_len() {
        let frame = Frame::body(3, Bytes::from_static(b"payload bytes"));
        let encoded = frame.encode();
        let size = Frame::peek_payload_size(&encoded).expect("peek");
        assert_eq!(size as usize, frame.payload.len());
    }
}
