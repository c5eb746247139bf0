//! Wire-level AMQP 0-9-1: frame envelopes, the field-table grammar, and the
//! method/property tables for the classes this client speaks. Nothing in
//! this crate touches a socket — see `bunnyhop-core` for the connection and
//! channel state machines built on top of it.

pub mod codec;
pub mod error;
pub mod frame;
pub mod methods;
pub mod properties;
pub mod reader;
pub mod tables;
pub mod value;
pub mod writer;

pub use codec::FrameCodec;
pub use error::{ProtocolError, Result};
pub use frame::{Frame, FrameKind};
pub use methods::Method;
pub use properties::BasicProperties;
pub use reader::Reader;
pub use value::{Decimal, FieldTable, Value};
pub use writer::Writer;

/// The 8-octet preamble a client sends before any framed traffic:
/// `"AMQP" 0 0 9 1`. A server speaking a different protocol version replies
/// with its own preamble instead of a `connection.start`; `bunnyhop-core`
/// detects that case before installing a [`FrameCodec`].
pub const PROTOCOL_HEADER: [u8; 8] = *b"AMQP\x00\x00\x09\x01";
