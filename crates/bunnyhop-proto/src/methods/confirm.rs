//! `confirm` class (id 85): the publisher-confirms extension.

use crate::error::Result;
use crate::reader::Reader;
use crate::writer::Writer;

/// `confirm.select` (class 85, method 10): puts the channel into confirm
/// mode; every subsequent publish gets a `basic.ack`/`basic.nack` back
/// (see spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Select {
    /// Don't wait for `select-ok`.
    pub no_wait: bool,
}

impl Select {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self { no_wait: reader.boolean(&format!("{path}.no_wait"))? })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.boolean(self.no_wait);
        Ok(())
    }
}
