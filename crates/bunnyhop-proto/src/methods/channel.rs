//! `channel` class (id 20): multiplexing a connection into independent
//! logical streams.

use crate::error::Result;
use crate::reader::Reader;
use crate::writer::Writer;

/// `channel.open` (class 20, method 10).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Open;

impl Open {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        reader.shortstr(&format!("{path}.reserved_out_of_band"))?;
        Ok(Self)
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.shortstr("", "reserved_out_of_band")?;
        Ok(())
    }
}

/// `channel.open-ok` (class 20, method 11).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OpenOk;

impl OpenOk {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        reader.longstr(&format!("{path}.reserved_channel_id"))?;
        Ok(Self)
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.longstr("");
        Ok(())
    }
}

/// `channel.flow` (class 20, method 20): the broker asking the client to
/// pause or resume publishing on this channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flow {
    /// `false` asks the peer to stop sending content methods until a
    /// subsequent `channel.flow` with `active: true`.
    pub active: bool,
}

impl Flow {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self { active: reader.boolean(&format!("{path}.active"))? })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.boolean(self.active);
        Ok(())
    }
}

/// `channel.flow-ok` (class 20, method 21): echoes the requested state back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlowOk {
    /// The state now in effect.
    pub active: bool,
}

impl FlowOk {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self { active: reader.boolean(&format!("{path}.active"))? })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.boolean(self.active);
        Ok(())
    }
}

/// `channel.close` (class 20, method 40): either side may send this to tear
/// down just this channel, leaving the connection and other channels alone.
#[derive(Debug, Clone, PartialEq)]
pub struct Close {
    /// Reply code; see spec.md §6.
    pub reply_code: u16,
    /// Human-readable reason.
    pub reply_text: String,
    /// Class of the method that caused the close, or 0.
    pub class_id: u16,
    /// Id of the method that caused the close, or 0.
    pub method_id: u16,
}

impl Close {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self {
            reply_code: reader.u16(&format!("{path}.reply_code"))?,
            reply_text: reader.shortstr(&format!("{path}.reply_text"))?,
            class_id: reader.u16(&format!("{path}.class_id"))?,
            method_id: reader.u16(&format!("{path}.method_id"))?,
        })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.u16(self.reply_code);
        writer.shortstr(&self.reply_text, "reply_text")?;
        writer.u16(self.class_id);
        writer.u16(self.method_id);
        Ok(())
    }
}
