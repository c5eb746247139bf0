//! Wire-level error type.
//!
//! Every fallible codec operation returns [`ProtocolError`]. Variants carry
//! structured fields (not just a formatted string) so callers — in
//! particular `bunnyhop-core`, which must tell a local protocol error apart
//! from a hard/soft broker error — can match on them instead of parsing
//! `Display` output.

use thiserror::Error;

/// Result alias used throughout the wire codec.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding AMQP 0-9-1 wire data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A read ran past the end of the buffer.
    #[error("{path}: unexpected end of input (needed {needed} more byte(s))")]
    UnexpectedEof {
        /// Dotted path to the field being read when the buffer ran out.
        path: String,
        /// Number of additional bytes that would have been required.
        needed: usize,
    },

    /// A field table's declared length prefix did not match the offset at
    /// which iteration actually stopped.
    #[error("{path}: table length mismatch (declared {declared}, consumed {consumed})")]
    TableLengthMismatch {
        /// Dotted path to the table field.
        path: String,
        /// Length declared in the table's 4-octet length prefix.
        declared: usize,
        /// Number of bytes actually consumed while decoding entries.
        consumed: usize,
    },

    /// A field-table value tag byte did not match any known type.
    #[error("{path}: unknown field-table value tag {tag:#04x}")]
    UnknownFieldType {
        /// Dotted path to the offending value.
        path: String,
        /// The tag byte that was read.
        tag: u8,
    },

    /// A field-table key failed the `^[A-z$#][A-z0-9$#_.]{0,127}$` charset
    /// check.
    #[error("{path}: invalid table key {key:?}")]
    InvalidTableKey {
        /// Dotted path to the table.
        path: String,
        /// The offending key.
        key: String,
    },

    /// A `shortstr` exceeded 255 bytes, or an exchange/queue name exceeded
    /// 127 bytes.
    #[error("{path}: string too long ({len} bytes, max {max})")]
    StringTooLong {
        /// Dotted path to the field.
        path: String,
        /// Actual length in bytes.
        len: usize,
        /// Maximum allowed length.
        max: usize,
    },

    /// An exchange/queue name contained a character outside
    /// `[a-zA-Z0-9-_.:]`.
    #[error("{path}: {value:?} does not match the allowed name charset")]
    InvalidName {
        /// Dotted path to the field.
        path: String,
        /// The offending value.
        value: String,
    },

    /// A value asserted `notnull` was empty or zero.
    #[error("{path}: value must not be null/empty")]
    NullAssertion {
        /// Dotted path to the field.
        path: String,
    },

    /// A decimal's unscaled value was negative (unsupported) or did not fit
    /// `u32` after scaling.
    #[error("{path}: decimal value out of range")]
    DecimalOutOfRange {
        /// Dotted path to the field.
        path: String,
    },

    /// A timestamp exceeded the supported range (> 8,640,000,000,000
    /// seconds since epoch).
    #[error("{path}: timestamp {seconds} out of range")]
    TimestampOutOfRange {
        /// Dotted path to the field.
        path: String,
        /// The offending value, in seconds since epoch.
        seconds: u64,
    },

    /// The trailing octet of a frame was not `0xCE`.
    #[error("invalid frame end marker {found:#04x}, expected 0xCE")]
    InvalidFrameEnd {
        /// The byte actually found.
        found: u8,
    },

    /// A method frame named a `(class_id, method_id)` pair with no known
    /// decoder.
    #[error("no decoder registered for method id {class_id}:{method_id}")]
    UnknownMethod {
        /// Class index.
        class_id: u16,
        /// Method index within the class.
        method_id: u16,
    },

    /// A frame's `kind` octet did not match any of method/header/body/heartbeat.
    #[error("unknown frame kind {kind:#04x}")]
    UnknownFrameKind {
        /// The byte actually found.
        kind: u8,
    },

    /// A frame's declared payload size exceeded the negotiated `frame_max`.
    #[error("frame payload of {size} bytes exceeds frame_max of {max}")]
    FrameTooLarge {
        /// Declared payload size.
        size: usize,
        /// Negotiated maximum.
        max: usize,
    },
}
