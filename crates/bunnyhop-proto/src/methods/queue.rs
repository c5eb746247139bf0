//! `queue` class (id 50): declaring, binding, purging, and deleting queues.

use crate::error::Result;
use crate::reader::Reader;
use crate::value::FieldTable;
use crate::writer::{assert, Writer};

/// `queue.declare` (class 50, method 10).
#[derive(Debug, Clone, PartialEq)]
pub struct Declare {
    /// Queue name; empty asks the broker to generate one.
    pub queue: String,
    /// Check the queue exists instead of creating it.
    pub passive: bool,
    /// Survive a broker restart.
    pub durable: bool,
    /// Restrict use to the declaring connection.
    pub exclusive: bool,
    /// Delete the queue once its last consumer cancels.
    pub auto_delete: bool,
    /// Don't wait for `declare-ok`.
    pub no_wait: bool,
    /// Queue-type-specific arguments.
    pub arguments: FieldTable,
}

impl Declare {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        reader.u16(&format!("{path}.reserved_ticket"))?;
        let queue = reader.shortstr(&format!("{path}.queue"))?;
        let [passive, durable, exclusive, auto_delete, no_wait] = reader.bitmap(&format!("{path}.flags"))?;
        let arguments = reader.table(&format!("{path}.arguments"))?;
        Ok(Self { queue, passive, durable, exclusive, auto_delete, no_wait, arguments })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        assert::length(&self.queue, "queue")?;
        writer.u16(0);
        writer.shortstr(&self.queue, "queue")?;
        writer.bitmap([self.passive, self.durable, self.exclusive, self.auto_delete, self.no_wait]);
        writer.table(&self.arguments);
        Ok(())
    }
}

/// `queue.declare-ok` (class 50, method 11).
#[derive(Debug, Clone, PartialEq)]
pub struct DeclareOk {
    /// Queue name (the broker-generated one if the request left it empty).
    pub queue: String,
    /// Number of messages currently in the queue.
    pub message_count: u32,
    /// Number of active consumers.
    pub consumer_count: u32,
}

impl DeclareOk {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self {
            queue: reader.shortstr(&format!("{path}.queue"))?,
            message_count: reader.u32(&format!("{path}.message_count"))?,
            consumer_count: reader.u32(&format!("{path}.consumer_count"))?,
        })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.shortstr(&self.queue, "queue")?;
        writer.u32(self.message_count);
        writer.u32(self.consumer_count);
        Ok(())
    }
}

/// `queue.bind` (class 50, method 20).
#[derive(Debug, Clone, PartialEq)]
pub struct Bind {
    /// Queue to bind.
    pub queue: String,
    /// Exchange to bind to.
    pub exchange: String,
    /// Routing key for the binding.
    pub routing_key: String,
    /// Don't wait for `bind-ok`.
    pub no_wait: bool,
    /// Binding arguments (used by the `headers` exchange type).
    pub arguments: FieldTable,
}

impl Bind {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        reader.u16(&format!("{path}.reserved_ticket"))?;
        Ok(Self {
            queue: reader.shortstr(&format!("{path}.queue"))?,
            exchange: reader.shortstr(&format!("{path}.exchange"))?,
            routing_key: reader.shortstr(&format!("{path}.routing_key"))?,
            no_wait: reader.boolean(&format!("{path}.no_wait"))?,
            arguments: reader.table(&format!("{path}.arguments"))?,
        })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.u16(0);
        writer.shortstr(&self.queue, "queue")?;
        assert::notnull_str(&self.exchange, "exchange")?;
        writer.shortstr(&self.exchange, "exchange")?;
        writer.shortstr(&self.routing_key, "routing_key")?;
        writer.boolean(self.no_wait);
        writer.table(&self.arguments);
        Ok(())
    }
}

/// `queue.unbind` (class 50, method 50).
#[derive(Debug, Clone, PartialEq)]
pub struct Unbind {
    /// Queue to unbind.
    pub queue: String,
    /// Exchange to unbind from.
    pub exchange: String,
    /// Routing key of the binding to remove.
    pub routing_key: String,
    /// Binding arguments that must match the original binding.
    pub arguments: FieldTable,
}

impl Unbind {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        reader.u16(&format!("{path}.reserved_ticket"))?;
        Ok(Self {
            queue: reader.shortstr(&format!("{path}.queue"))?,
            exchange: reader.shortstr(&format!("{path}.exchange"))?,
            routing_key: reader.shortstr(&format!("{path}.routing_key"))?,
            arguments: reader.table(&format!("{path}.arguments"))?,
        })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.u16(0);
        writer.shortstr(&self.queue, "queue")?;
        assert::notnull_str(&self.exchange, "exchange")?;
        writer.shortstr(&self.exchange, "exchange")?;
        writer.shortstr(&self.routing_key, "routing_key")?;
        writer.table(&self.arguments);
        Ok(())
    }
}

/// `queue.purge` (class 50, method 30).
#[derive(Debug, Clone, PartialEq)]
pub struct Purge {
    /// Queue to purge.
    pub queue: String,
    /// Don't wait for `purge-ok`.
    pub no_wait: bool,
}

impl Purge {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        reader.u16(&format!("{path}.reserved_ticket"))?;
        Ok(Self {
            queue: reader.shortstr(&format!("{path}.queue"))?,
            no_wait: reader.boolean(&format!("{path}.no_wait"))?,
        })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.u16(0);
        writer.shortstr(&self.queue, "queue")?;
        writer.boolean(self.no_wait);
        Ok(())
    }
}

/// `queue.purge-ok` (class 50, method 31).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PurgeOk {
    /// Number of messages purged.
    pub message_count: u32,
}

impl PurgeOk {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self { message_count: reader.u32(&format!("{path}.message_count"))? })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.u32(self.message_count);
        Ok(())
    }
}

/// `queue.delete` (class 50, method 40).
#[derive(Debug, Clone, PartialEq)]
pub struct Delete {
    /// Queue to delete.
    pub queue: String,
    /// Only delete if the queue has no consumers.
    pub if_unused: bool,
    /// Only delete if the queue is empty.
    pub if_empty: bool,
    /// Don't wait for `delete-ok`.
    pub no_wait: bool,
}

impl Delete {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        reader.u16(&format!("{path}.reserved_ticket"))?;
        let queue = reader.shortstr(&format!("{path}.queue"))?;
        let [if_unused, if_empty, no_wait] = reader.bitmap(&format!("{path}.flags"))?;
        Ok(Self { queue, if_unused, if_empty, no_wait })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.u16(0);
        writer.shortstr(&self.queue, "queue")?;
        writer.bitmap([self.if_unused, self.if_empty, self.no_wait]);
        Ok(())
    }
}

/// `queue.delete-ok` (class 50, method 41).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeleteOk {
    /// Number of messages that were in the queue when it was deleted.
    pub message_count: u32,
}

impl DeleteOk {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self { message_count: reader.u32(&format!("{path}.message_count"))? })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.u32(self.message_count);
        Ok(())
    }
}
