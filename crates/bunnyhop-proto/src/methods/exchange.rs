//! `exchange` class (id 40): declaring and deleting exchanges.

use crate::error::Result;
use crate::reader::Reader;
use crate::value::FieldTable;
use crate::writer::{assert, Writer};

/// `exchange.declare` (class 40, method 10).
#[derive(Debug, Clone, PartialEq)]
pub struct Declare {
    /// Exchange name.
    pub exchange: String,
    /// Exchange type (`direct`, `fanout`, `topic`, `headers`, ...).
    pub kind: String,
    /// Check the exchange exists instead of creating it.
    pub passive: bool,
    /// Survive a broker restart.
    pub durable: bool,
    /// Delete the exchange once its last queue is unbound.
    pub auto_delete: bool,
    /// Restrict publishing to broker-internal producers only.
    pub internal: bool,
    /// Don't wait for `declare-ok`.
    pub no_wait: bool,
    /// Exchange-type-specific arguments.
    pub arguments: FieldTable,
}

impl Declare {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        reader.u16(&format!("{path}.reserved_ticket"))?;
        let exchange = reader.shortstr(&format!("{path}.exchange"))?;
        let kind = reader.shortstr(&format!("{path}.type"))?;
        let [passive, durable, auto_delete, internal, no_wait] = reader.bitmap(&format!("{path}.flags"))?;
        let arguments = reader.table(&format!("{path}.arguments"))?;
        Ok(Self { exchange, kind, passive, durable, auto_delete, internal, no_wait, arguments })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        assert::notnull_str(&self.exchange, "exchange")?;
        assert::regexp(&self.exchange, "exchange")?;
        assert::length(&self.exchange, "exchange")?;
        writer.u16(0);
        writer.shortstr(&self.exchange, "exchange")?;
        writer.shortstr(&self.kind, "type")?;
        writer.bitmap([self.passive, self.durable, self.auto_delete, self.internal, self.no_wait]);
        writer.table(&self.arguments);
        Ok(())
    }
}

/// `exchange.delete` (class 40, method 20).
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    /// Exchange name.
    pub exchange: String,
    /// Only delete if the exchange has no bindings.
    pub if_unused: bool,
    /// Don't wait for `delete-ok`.
    pub no_wait: bool,
}

impl Delete {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        reader.u16(&format!("{path}.reserved_ticket"))?;
        let exchange = reader.shortstr(&format!("{path}.exchange"))?;
        let [if_unused, no_wait] = reader.bitmap(&format!("{path}.flags"))?;
        Ok(Self { exchange, if_unused, no_wait })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        assert::notnull_str(&self.exchange, "exchange")?;
        writer.u16(0);
        writer.shortstr(&self.exchange, "exchange")?;
        writer.bitmap([self.if_unused, self.no_wait]);
        Ok(())
    }
}
