//! `basic-properties` (class id 60): the header-frame payload for the
//! `basic` class.
//!
//! Encoded as a 16-bit MSB-first presence bitmap followed by whichever of
//! the 13 declared fields are present, in declaration order. Bit `i` (0
//! being the first declared field) is `1 << (15 - i)`.

use crate::error::Result;
use crate::reader::Reader;
use crate::value::FieldTable;
use crate::writer::Writer;

/// The 13 properties carried by `basic.publish`/`basic.deliver` content,
/// any subset of which may be present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasicProperties {
    /// MIME content type, e.g. `"application/json"`.
    pub content_type: Option<String>,
    /// MIME content encoding, e.g. `"gzip"`.
    pub content_encoding: Option<String>,
    /// Application-specific headers.
    pub headers: Option<FieldTable>,
    /// `1` (non-persistent) or `2` (persistent). The only persistence
    /// signal this client passes through; it does not interpret it.
    pub delivery_mode: Option<u8>,
    /// Message priority, `0..=9`.
    pub priority: Option<u8>,
    /// Application correlation identifier.
    pub correlation_id: Option<String>,
    /// Address to reply to.
    pub reply_to: Option<String>,
    /// Message expiration spec, as a decimal-string of milliseconds.
    pub expiration: Option<String>,
    /// Application message identifier.
    pub message_id: Option<String>,
    /// Application-supplied timestamp (seconds since epoch).
    pub timestamp: Option<u64>,
    /// Application-specific message type name.
    pub type_: Option<String>,
    /// Creating user id, usually validated by the broker against the login.
    pub user_id: Option<String>,
    /// Application id.
    pub app_id: Option<String>,
}

/// Bit position (from the MSB) of each property, in declaration order.
const FLAG_BITS: [u16; 13] =
    [15, 14, 13, 12, 11, 10, 9, 8, 7, 6, 5, 4, 3].map(|i| 1u16 << i);

impl BasicProperties {
    /// Validate `priority` is in `0..=9` per spec.md §4.6. Other fields have
    /// no local validity constraint beyond their wire encoding.
    ///
    /// # Errors
    ///
    /// `ProtocolError::DecimalOutOfRange`-shaped local error is not used
    /// here; callers needing this check use
    /// [`crate::error::ProtocolError::NullAssertion`]-style reporting
    /// through `bunnyhop-core`'s `ChannelError::InvalidPriority`, which
    /// wraps this helper's `bool` result.
    #[must_use]
    pub fn priority_is_valid(&self) -> bool {
        self.priority.is_none_or(|p| p <= 9)
    }

    /// Decode a presence bitmap followed by whichever fields it marks
    /// present, in declaration order.
    ///
    /// # Errors
    ///
    /// Whatever the underlying field reads fail with.
    pub fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        let flags = reader.u16(&format!("{path}.flags"))?;
        let mut props = Self::default();
        if flags & FLAG_BITS[0] != 0 {
            props.content_type = Some(reader.shortstr(&format!("{path}.content_type"))?);
        }
        if flags & FLAG_BITS[1] != 0 {
            props.content_encoding = Some(reader.shortstr(&format!("{path}.content_encoding"))?);
        }
        if flags & FLAG_BITS[2] != 0 {
            props.headers = Some(reader.table(&format!("{path}.headers"))?);
        }
        if flags & FLAG_BITS[3] != 0 {
            props.delivery_mode = Some(reader.u8(&format!("{path}.delivery_mode"))?);
        }
        if flags & FLAG_BITS[4] != 0 {
            props.priority = Some(reader.u8(&format!("{path}.priority"))?);
        }
        if flags & FLAG_BITS[5] != 0 {
            props.correlation_id = Some(reader.shortstr(&format!("{path}.correlation_id"))?);
        }
        if flags & FLAG_BITS[6] != 0 {
            props.reply_to = Some(reader.shortstr(&format!("{path}.reply_to"))?);
        }
        if flags & FLAG_BITS[7] != 0 {
            props.expiration = Some(reader.shortstr(&format!("{path}.expiration"))?);
        }
        if flags & FLAG_BITS[8] != 0 {
            props.message_id = Some(reader.shortstr(&format!("{path}.message_id"))?);
        }
        if flags & FLAG_BITS[9] != 0 {
            props.timestamp = Some(reader.timestamp(&format!("{path}.timestamp"))?);
        }
        if flags & FLAG_BITS[10] != 0 {
            props.type_ = Some(reader.shortstr(&format!("{path}.type"))?);
        }
        if flags & FLAG_BITS[11] != 0 {
            props.user_id = Some(reader.shortstr(&format!("{path}.user_id"))?);
        }
        if flags & FLAG_BITS[12] != 0 {
            props.app_id = Some(reader.shortstr(&format!("{path}.app_id"))?);
        }
        Ok(props)
    }

    /// Encode the presence bitmap followed by whichever fields are set.
    ///
    /// # Errors
    ///
    /// `ProtocolError::StringTooLong` if a `shortstr` field exceeds 255
    /// bytes.
    pub fn encode(&self, writer: &mut Writer) -> Result<()> {
        let mut flags = 0u16;
        if self.content_type.is_some() {
            flags |= FLAG_BITS[0];
        }
        if self.content_encoding.is_some() {
            flags |= FLAG_BITS[1];
        }
        if self.headers.is_some() {
            flags |= FLAG_BITS[2];
        }
        if self.delivery_mode.is_some() {
            flags |= FLAG_BITS[3];
        }
        if self.priority.is_some() {
            flags |= FLAG_BITS[4];
        }
        if self.correlation_id.is_some() {
            flags |= FLAG_BITS[5];
        }
        if self.reply_to.is_some() {
            flags |= FLAG_BITS[6];
        }
        if self.expiration.is_some() {
            flags |= FLAG_BITS[7];
        }
        if self.message_id.is_some() {
            flags |= FLAG_BITS[8];
        }
        if self.timestamp.is_some() {
            flags |= FLAG_BITS[9];
        }
        if self.type_.is_some() {
            flags |= FLAG_BITS[10];
        }
        if self.user_id.is_some() {
            flags |= FLAG_BITS[11];
        }
        if self.app_id.is_some() {
            flags |= FLAG_BITS[12];
        }
        writer.u16(flags);

        if let Some(v) = &self.content_type {
            writer.shortstr(v, "content_type")?;
        }
        if let Some(v) = &self.content_encoding {
            writer.shortstr(v, "content_encoding")?;
        }
        if let Some(v) = &self.headers {
            writer.table(v);
        }
        if let Some(v) = self.delivery_mode {
            writer.u8(v);
        }
        if let Some(v) = self.priority {
            writer.u8(v);
        }
        if let Some(v) = &self.correlation_id {
            writer.shortstr(v, "correlation_id")?;
        }
        if let Some(v) = &self.reply_to {
            writer.shortstr(v, "reply_to")?;
        }
        if let Some(v) = &self.expiration {
            writer.shortstr(v, "expiration")?;
        }
        if let Some(v) = &self.message_id {
            writer.shortstr(v, "message_id")?;
        }
        if let Some(v) = self.timestamp {
            writer.timestamp(v);
        }
        if let Some(v) = &self.type_ {
            writer.shortstr(v, "type")?;
        }
        if let Some(v) = &self.user_id {
            writer.shortstr(v, "user_id")?;
        }
        if let Some(v) = &self.app_id {
            writer.shortstr(v, "app_id")?;
        }
        Ok(())
    }
}
