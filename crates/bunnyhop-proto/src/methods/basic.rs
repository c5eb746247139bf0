//! `basic` class (id 60): publishing, consuming, and acknowledging content.

use crate::error::Result;
use crate::reader::Reader;
use crate::value::FieldTable;
use crate::writer::Writer;

/// `basic.qos` (class 60, method 10).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Qos {
    /// Prefetch window in bytes; `0` for no octet limit.
    pub prefetch_size: u32,
    /// Prefetch window in message count; `0` for no count limit.
    pub prefetch_count: u16,
    /// Apply the limit to the whole connection rather than just this
    /// channel.
    pub global: bool,
}

impl Qos {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self {
            prefetch_size: reader.u32(&format!("{path}.prefetch_size"))?,
            prefetch_count: reader.u16(&format!("{path}.prefetch_count"))?,
            global: reader.boolean(&format!("{path}.global"))?,
        })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.u32(self.prefetch_size);
        writer.u16(self.prefetch_count);
        writer.boolean(self.global);
        Ok(())
    }
}

/// `basic.consume` (class 60, method 20).
#[derive(Debug, Clone, PartialEq)]
pub struct Consume {
    /// Queue to consume from.
    pub queue: String,
    /// Consumer tag; empty asks the broker to generate one.
    pub consumer_tag: String,
    /// Don't deliver messages published by this same connection.
    pub no_local: bool,
    /// Deliver without waiting for acknowledgement.
    pub no_ack: bool,
    /// Request exclusive consumption of the queue.
    pub exclusive: bool,
    /// Don't wait for `consume-ok`.
    pub no_wait: bool,
    /// Consumer arguments.
    pub arguments: FieldTable,
}

impl Consume {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        reader.u16(&format!("{path}.reserved_ticket"))?;
        let queue = reader.shortstr(&format!("{path}.queue"))?;
        let consumer_tag = reader.shortstr(&format!("{path}.consumer_tag"))?;
        let [no_local, no_ack, exclusive, no_wait] = reader.bitmap(&format!("{path}.flags"))?;
        let arguments = reader.table(&format!("{path}.arguments"))?;
        Ok(Self { queue, consumer_tag, no_local, no_ack, exclusive, no_wait, arguments })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.u16(0);
        writer.shortstr(&self.queue, "queue")?;
        writer.shortstr(&self.consumer_tag, "consumer_tag")?;
        writer.bitmap([self.no_local, self.no_ack, self.exclusive, self.no_wait]);
        writer.table(&self.arguments);
        Ok(())
    }
}

/// `basic.consume-ok` (class 60, method 21).
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumeOk {
    /// The consumer tag now in effect.
    pub consumer_tag: String,
}

impl ConsumeOk {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self { consumer_tag: reader.shortstr(&format!("{path}.consumer_tag"))? })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.shortstr(&self.consumer_tag, "consumer_tag")?;
        Ok(())
    }
}

/// `basic.cancel` (class 60, method 30).
#[derive(Debug, Clone, PartialEq)]
pub struct Cancel {
    /// Consumer to cancel.
    pub consumer_tag: String,
    /// Don't wait for `cancel-ok`.
    pub no_wait: bool,
}

impl Cancel {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self {
            consumer_tag: reader.shortstr(&format!("{path}.consumer_tag"))?,
            no_wait: reader.boolean(&format!("{path}.no_wait"))?,
        })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.shortstr(&self.consumer_tag, "consumer_tag")?;
        writer.boolean(self.no_wait);
        Ok(())
    }
}

/// `basic.cancel-ok` (class 60, method 31).
#[derive(Debug, Clone, PartialEq)]
pub struct CancelOk {
    /// The consumer tag that was cancelled.
    pub consumer_tag: String,
}

impl CancelOk {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self { consumer_tag: reader.shortstr(&format!("{path}.consumer_tag"))? })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.shortstr(&self.consumer_tag, "consumer_tag")?;
        Ok(())
    }
}

/// `basic.publish` (class 60, method 40): always followed by a header frame
/// and zero or more body frames on the same channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Publish {
    /// Destination exchange; empty routes via the default exchange.
    pub exchange: String,
    /// Routing key.
    pub routing_key: String,
    /// Return the message if it cannot be routed to any queue.
    pub mandatory: bool,
    /// Return the message if it cannot be delivered to a consumer
    /// immediately. Rarely implemented by brokers; carried through as-is.
    pub immediate: bool,
}

impl Publish {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        reader.u16(&format!("{path}.reserved_ticket"))?;
        let exchange = reader.shortstr(&format!("{path}.exchange"))?;
        let routing_key = reader.shortstr(&format!("{path}.routing_key"))?;
        let [mandatory, immediate] = reader.bitmap(&format!("{path}.flags"))?;
        Ok(Self { exchange, routing_key, mandatory, immediate })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.u16(0);
        writer.shortstr(&self.exchange, "exchange")?;
        writer.shortstr(&self.routing_key, "routing_key")?;
        writer.bitmap([self.mandatory, self.immediate]);
        Ok(())
    }
}

/// `basic.return` (class 60, method 50): a `mandatory`/`immediate` publish
/// the broker could not route, echoed back followed by header/body frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Return {
    /// Reply code explaining why the message was returned.
    pub reply_code: u16,
    /// Human-readable reason.
    pub reply_text: String,
    /// Exchange the message was published to.
    pub exchange: String,
    /// Routing key the message was published with.
    pub routing_key: String,
}

impl Return {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self {
            reply_code: reader.u16(&format!("{path}.reply_code"))?,
            reply_text: reader.shortstr(&format!("{path}.reply_text"))?,
            exchange: reader.shortstr(&format!("{path}.exchange"))?,
            routing_key: reader.shortstr(&format!("{path}.routing_key"))?,
        })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.u16(self.reply_code);
        writer.shortstr(&self.reply_text, "reply_text")?;
        writer.shortstr(&self.exchange, "exchange")?;
        writer.shortstr(&self.routing_key, "routing_key")?;
        Ok(())
    }
}

/// `basic.deliver` (class 60, method 60): content pushed to a consumer,
/// followed by header/body frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Deliver {
    /// Consumer this delivery is for.
    pub consumer_tag: String,
    /// Channel-scoped monotonically increasing delivery tag.
    pub delivery_tag: u64,
    /// Whether this is a redelivery of a message not yet acked.
    pub redelivered: bool,
    /// Exchange the message was originally published to.
    pub exchange: String,
    /// Routing key the message was originally published with.
    pub routing_key: String,
}

impl Deliver {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self {
            consumer_tag: reader.shortstr(&format!("{path}.consumer_tag"))?,
            delivery_tag: reader.u64(&format!("{path}.delivery_tag"))?,
            redelivered: reader.boolean(&format!("{path}.redelivered"))?,
            exchange: reader.shortstr(&format!("{path}.exchange"))?,
            routing_key: reader.shortstr(&format!("{path}.routing_key"))?,
        })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.shortstr(&self.consumer_tag, "consumer_tag")?;
        writer.u64(self.delivery_tag);
        writer.boolean(self.redelivered);
        writer.shortstr(&self.exchange, "exchange")?;
        writer.shortstr(&self.routing_key, "routing_key")?;
        Ok(())
    }
}

/// `basic.ack` (class 60, method 80): sent by a consumer to acknowledge
/// delivery, or by the broker to confirm a publish (see spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ack {
    /// Delivery or publish-sequence tag being acknowledged.
    pub delivery_tag: u64,
    /// Acknowledge every tag up to and including this one.
    pub multiple: bool,
}

impl Ack {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self {
            delivery_tag: reader.u64(&format!("{path}.delivery_tag"))?,
            multiple: reader.boolean(&format!("{path}.multiple"))?,
        })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.u64(self.delivery_tag);
        writer.boolean(self.multiple);
        Ok(())
    }
}

/// `basic.nack` (class 60, method 120): the RabbitMQ extension negative
/// acknowledgement, carrying a requeue hint `basic.reject` lacks for the
/// `multiple` case.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nack {
    /// Delivery tag being negatively acknowledged.
    pub delivery_tag: u64,
    /// Negatively acknowledge every tag up to and including this one.
    pub multiple: bool,
    /// Ask the broker to requeue the message(s) rather than discard them.
    pub requeue: bool,
}

impl Nack {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        let delivery_tag = reader.u64(&format!("{path}.delivery_tag"))?;
        let [multiple, requeue] = reader.bitmap(&format!("{path}.flags"))?;
        Ok(Self { delivery_tag, multiple, requeue })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.u64(self.delivery_tag);
        writer.bitmap([self.multiple, self.requeue]);
        Ok(())
    }
}

/// `basic.reject` (class 60, method 90).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reject {
    /// Delivery tag being rejected.
    pub delivery_tag: u64,
    /// Ask the broker to requeue the message rather than discard it.
    pub requeue: bool,
}

impl Reject {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self {
            delivery_tag: reader.u64(&format!("{path}.delivery_tag"))?,
            requeue: reader.boolean(&format!("{path}.requeue"))?,
        })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.u64(self.delivery_tag);
        writer.boolean(self.requeue);
        Ok(())
    }
}

/// `basic.recover-async` (class 60, method 100): deprecated fire-and-forget
/// form of `basic.recover`, decoded for completeness but never emitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecoverAsync {
    /// Ask the broker to redeliver to a possibly different consumer.
    pub requeue: bool,
}

impl RecoverAsync {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self { requeue: reader.boolean(&format!("{path}.requeue"))? })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.boolean(self.requeue);
        Ok(())
    }
}

/// `basic.recover` (class 60, method 110).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recover {
    /// Ask the broker to redeliver to a possibly different consumer.
    pub requeue: bool,
}

impl Recover {
    pub(crate) fn decode(reader: &mut Reader<'_>, path: &str) -> Result<Self> {
        Ok(Self { requeue: reader.boolean(&format!("{path}.requeue"))? })
    }

    pub(crate) fn encode(&self, writer: &mut Writer) -> Result<()> {
        writer.boolean(self.requeue);
        Ok(())
    }
}
