//! Method argument structs and the `(class_id, method_id) -> Method`
//! dispatch that stands in for a code-generated protocol table.
//!
//! Each submodule covers one AMQP 0-9-1 class. [`Method`] is the sum type a
//! decoded method frame's payload becomes; [`Method::decode`] and
//! [`Method::encode`] are the single place that knows how a `(class_id,
//! method_id)` pair maps to a concrete struct. [`crate::tables`] builds the
//! human-readable name lookup on top of the same ids.

pub mod basic;
pub mod channel;
pub mod confirm;
pub mod connection;
pub mod exchange;
pub mod queue;
pub mod tx;

use crate::error::{ProtocolError, Result};
use crate::reader::Reader;
use crate::writer::Writer;

/// Class ids as assigned by the protocol.
pub mod class {
    /// `connection` class.
    pub const CONNECTION: u16 = 10;
    /// `channel` class.
    pub const CHANNEL: u16 = 20;
    /// `exchange` class.
    pub const EXCHANGE: u16 = 40;
    /// `queue` class.
    pub const QUEUE: u16 = 50;
    /// `basic` class.
    pub const BASIC: u16 = 60;
    /// `confirm` class.
    pub const CONFIRM: u16 = 85;
    /// `tx` class.
    pub const TX: u16 = 90;
}

/// A decoded method, tagged by which class/method it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Method {
    /// `connection.start`
    ConnectionStart(connection::Start),
    /// `connection.start-ok`
    ConnectionStartOk(connection::StartOk),
    /// `connection.secure`
    ConnectionSecure(connection::Secure),
    /// `connection.secure-ok`
    ConnectionSecureOk(connection::SecureOk),
    /// `connection.tune`
    ConnectionTune(connection::Tune),
    /// `connection.tune-ok`
    ConnectionTuneOk(connection::TuneOk),
    /// `connection.open`
    ConnectionOpen(connection::Open),
    /// `connection.open-ok`
    ConnectionOpenOk(connection::OpenOk),
    /// `connection.close`
    ConnectionClose(connection::Close),
    /// `connection.close-ok`
    ConnectionCloseOk,
    /// `connection.blocked`
    ConnectionBlocked(connection::Blocked),
    /// `connection.unblocked`
    ConnectionUnblocked,
    /// `connection.update-secret`
    ConnectionUpdateSecret(connection::UpdateSecret),
    /// `connection.update-secret-ok`
    ConnectionUpdateSecretOk,
    /// `channel.open`
    ChannelOpen(channel::Open),
    /// `channel.open-ok`
    ChannelOpenOk(channel::OpenOk),
    /// `channel.flow`
    ChannelFlow(channel::Flow),
    /// `channel.flow-ok`
    ChannelFlowOk(channel::FlowOk),
    /// `channel.close`
    ChannelClose(channel::Close),
    /// `channel.close-ok`
    ChannelCloseOk,
    /// `exchange.declare`
    ExchangeDeclare(exchange::Declare),
    /// `exchange.declare-ok`
    ExchangeDeclareOk,
    /// `exchange.delete`
    ExchangeDelete(exchange::Delete),
    /// `exchange.delete-ok`
    ExchangeDeleteOk,
    /// `queue.declare`
    QueueDeclare(queue::Declare),
    /// `queue.declare-ok`
    QueueDeclareOk(queue::DeclareOk),
    /// `queue.bind`
    QueueBind(queue::Bind),
    /// `queue.bind-ok`
    QueueBindOk,
    /// `queue.unbind`
    QueueUnbind(queue::Unbind),
    /// `queue.unbind-ok`
    QueueUnbindOk,
    /// `queue.purge`
    QueuePurge(queue::Purge),
    /// `queue.purge-ok`
    QueuePurgeOk(queue::PurgeOk),
    /// `queue.delete`
    QueueDelete(queue::Delete),
    /// `queue.delete-ok`
    QueueDeleteOk(queue::DeleteOk),
    /// `basic.qos`
    BasicQos(basic::Qos),
    /// `basic.qos-ok`
    BasicQosOk,
    /// `basic.consume`
    BasicConsume(basic::Consume),
    /// `basic.consume-ok`
    BasicConsumeOk(basic::ConsumeOk),
    /// `basic.cancel`
    BasicCancel(basic::Cancel),
    /// `basic.cancel-ok`
    BasicCancelOk(basic::CancelOk),
    /// `basic.publish`
    BasicPublish(basic::Publish),
    /// `basic.return`
    BasicReturn(basic::Return),
    /// `basic.deliver`
    BasicDeliver(basic::Deliver),
    /// `basic.ack`
    BasicAck(basic::Ack),
    /// `basic.reject`
    BasicReject(basic::Reject),
    /// `basic.recover-async`
    BasicRecoverAsync(basic::RecoverAsync),
    /// `basic.recover`
    BasicRecover(basic::Recover),
    /// `basic.recover-ok`
    BasicRecoverOk,
    /// `basic.nack`
    BasicNack(basic::Nack),
    /// `confirm.select`
    ConfirmSelect(confirm::Select),
    /// `confirm.select-ok`
    ConfirmSelectOk,
    /// `tx.select`
    TxSelect,
    /// `tx.select-ok`
    TxSelectOk,
    /// `tx.commit`
    TxCommit,
    /// `tx.commit-ok`
    TxCommitOk,
    /// `tx.rollback`
    TxRollback,
    /// `tx.rollback-ok`
    TxRollbackOk,
}

impl Method {
    /// The `(class_id, method_id)` pair this method encodes as.
    #[must_use]
    pub fn id(&self) -> (u16, u16) {
        use class::{BASIC, CHANNEL, CONFIRM, CONNECTION, EXCHANGE, QUEUE, TX};
        match self {
            Method::ConnectionStart(_) => (CONNECTION, 10),
            Method::ConnectionStartOk(_) => (CONNECTION, 11),
            Method::ConnectionSecure(_) => (CONNECTION, 20),
            Method::ConnectionSecureOk(_) => (CONNECTION, 21),
            Method::ConnectionTune(_) => (CONNECTION, 30),
            Method::ConnectionTuneOk(_) => (CONNECTION, 31),
            Method::ConnectionOpen(_) => (CONNECTION, 40),
            Method::ConnectionOpenOk(_) => (CONNECTION, 41),
            Method::ConnectionClose(_) => (CONNECTION, 50),
            Method::ConnectionCloseOk => (CONNECTION, 51),
            Method::ConnectionBlocked(_) => (CONNECTION, 60),
            Method::ConnectionUnblocked => (CONNECTION, 61),
            Method::ConnectionUpdateSecret(_) => (CONNECTION, 70),
            Method::ConnectionUpdateSecretOk => (CONNECTION, 71),
            Method::ChannelOpen(_) => (CHANNEL, 10),
            Method::ChannelOpenOk(_) => (CHANNEL, 11),
            Method::ChannelFlow(_) => (CHANNEL, 20),
            Method::ChannelFlowOk(_) => (CHANNEL, 21),
            Method::ChannelClose(_) => (CHANNEL, 40),
            Method::ChannelCloseOk => (CHANNEL, 41),
            Method::ExchangeDeclare(_) => (EXCHANGE, 10),
            Method::ExchangeDeclareOk => (EXCHANGE, 11),
            Method::ExchangeDelete(_) => (EXCHANGE, 20),
            Method::ExchangeDeleteOk => (EXCHANGE, 21),
            Method::QueueDeclare(_) => (QUEUE, 10),
            Method::QueueDeclareOk(_) => (QUEUE, 11),
            Method::QueueBind(_) => (QUEUE, 20),
            Method::QueueBindOk => (QUEUE, 21),
            Method::QueuePurge(_) => (QUEUE, 30),
            Method::QueuePurgeOk(_) => (QUEUE, 31),
            Method::QueueDelete(_) => (QUEUE, 40),
            Method::QueueDeleteOk(_) => (QUEUE, 41),
            Method::QueueUnbind(_) => (QUEUE, 50),
            Method::QueueUnbindOk => (QUEUE, 51),
            Method::BasicQos(_) => (BASIC, 10),
            Method::BasicQosOk => (BASIC, 11),
            Method::BasicConsume(_) => (BASIC, 20),
            Method::BasicConsumeOk(_) => (BASIC, 21),
            Method::BasicCancel(_) => (BASIC, 30),
            Method::BasicCancelOk(_) => (BASIC, 31),
            Method::BasicPublish(_) => (BASIC, 40),
            Method::BasicReturn(_) => (BASIC, 50),
            Method::BasicDeliver(_) => (BASIC, 60),
            Method::BasicAck(_) => (BASIC, 80),
            Method::BasicReject(_) => (BASIC, 90),
            Method::BasicRecoverAsync(_) => (BASIC, 100),
            Method::BasicRecover(_) => (BASIC, 110),
            Method::BasicRecoverOk => (BASIC, 111),
            Method::BasicNack(_) => (BASIC, 120),
            Method::ConfirmSelect(_) => (CONFIRM, 10),
            Method::ConfirmSelectOk => (CONFIRM, 11),
            Method::TxSelect => (TX, 10),
            Method::TxSelectOk => (TX, 11),
            Method::TxCommit => (TX, 20),
            Method::TxCommitOk => (TX, 21),
            Method::TxRollback => (TX, 30),
            Method::TxRollbackOk => (TX, 31),
        }
    }

    /// Whether this method's class/method pair starts a content sequence
    /// (a header frame and zero or more body frames immediately follow on
    /// the same channel).
    #[must_use]
    pub fn starts_content(&self) -> bool {
        matches!(self, Method::BasicPublish(_) | Method::BasicReturn(_) | Method::BasicDeliver(_))
    }

    /// Decode a method's arguments given its `(class_id, method_id)`,
    /// already read from the method-frame payload's first four octets.
    ///
    /// # Errors
    ///
    /// `ProtocolError::UnknownMethod` if the pair names no known method;
    /// otherwise whatever the argument decode fails with.
    pub fn decode(class_id: u16, method_id: u16, reader: &mut Reader<'_>) -> Result<Self> {
        use class::{BASIC, CHANNEL, CONFIRM, CONNECTION, EXCHANGE, QUEUE, TX};
        let path = "method";
        Ok(match (class_id, method_id) {
            (CONNECTION, 10) => Method::ConnectionStart(connection::Start::decode(reader, path)?),
            (CONNECTION, 11) => {
                Method::ConnectionStartOk(connection::StartOk::decode(reader, path)?)
            },
            (CONNECTION, 20) => {
                Method::ConnectionSecure(connection::Secure::decode(reader, path)?)
            },
            (CONNECTION, 21) => {
                Method::ConnectionSecureOk(connection::SecureOk::decode(reader, path)?)
            },
            (CONNECTION, 30) => Method::ConnectionTune(connection::Tune::decode(reader, path)?),
            (CONNECTION, 31) => {
                Method::ConnectionTuneOk(connection::TuneOk::decode(reader, path)?)
            },
            (CONNECTION, 40) => Method::ConnectionOpen(connection::Open::decode(reader, path)?),
            (CONNECTION, 41) => {
                Method::ConnectionOpenOk(connection::OpenOk::decode(reader, path)?)
            },
            (CONNECTION, 50) => Method::ConnectionClose(connection::Close::decode(reader, path)?),
            (CONNECTION, 51) => Method::ConnectionCloseOk,
            (CONNECTION, 60) => Method::ConnectionBlocked(connection::Blocked::decode(reader, path)?),
            (CONNECTION, 61) => Method::ConnectionUnblocked,
            (CONNECTION, 70) => {
                Method::ConnectionUpdateSecret(connection::UpdateSecret::decode(reader, path)?)
            },
            (CONNECTION, 71) => Method::ConnectionUpdateSecretOk,
            (CHANNEL, 10) => Method::ChannelOpen(channel::Open::decode(reader, path)?),
            (CHANNEL, 11) => Method::ChannelOpenOk(channel::OpenOk::decode(reader, path)?),
            (CHANNEL, 20) => Method::ChannelFlow(channel::Flow::decode(reader, path)?),
            (CHANNEL, 21) => Method::ChannelFlowOk(channel::FlowOk::decode(reader, path)?),
            (CHANNEL, 40) => Method::ChannelClose(channel::Close::decode(reader, path)?),
            (CHANNEL, 41) => Method::ChannelCloseOk,
            (EXCHANGE, 10) => Method::ExchangeDeclare(exchange::Declare::decode(reader, path)?),
            (EXCHANGE, 11) => Method::ExchangeDeclareOk,
            (EXCHANGE, 20) => Method::ExchangeDelete(exchange::Delete::decode(reader, path)?),
            (EXCHANGE, 21) => Method::ExchangeDeleteOk,
            (QUEUE, 10) => Method::QueueDeclare(queue::Declare::decode(reader, path)?),
            (QUEUE, 11) => Method::QueueDeclareOk(queue::DeclareOk::decode(reader, path)?),
            (QUEUE, 20) => Method::QueueBind(queue::Bind::decode(reader, path)?),
            (QUEUE, 21) => Method::QueueBindOk,
            (QUEUE, 30) => Method::QueuePurge(queue::Purge::decode(reader, path)?),
            (QUEUE, 31) => Method::QueuePurgeOk(queue::PurgeOk::decode(reader, path)?),
            (QUEUE, 40) => Method::QueueDelete(queue::Delete::decode(reader, path)?),
            (QUEUE, 41) => Method::QueueDeleteOk(queue::DeleteOk::decode(reader, path)?),
            (QUEUE, 50) => Method::QueueUnbind(queue::Unbind::decode(reader, path)?),
            (QUEUE, 51) => Method::QueueUnbindOk,
            (BASIC, 10) => Method::BasicQos(basic::Qos::decode(reader, path)?),
            (BASIC, 11) => Method::BasicQosOk,
            (BASIC, 20) => Method::BasicConsume(basic::Consume::decode(reader, path)?),
            (BASIC, 21) => Method::BasicConsumeOk(basic::ConsumeOk::decode(reader, path)?),
            (BASIC, 30) => Method::BasicCancel(basic::Cancel::decode(reader, path)?),
            (BASIC, 31) => Method::BasicCancelOk(basic::CancelOk::decode(reader, path)?),
            (BASIC, 40) => Method::BasicPublish(basic::Publish::decode(reader, path)?),
            (BASIC, 50) => Method::BasicReturn(basic::Return::decode(reader, path)?),
            (BASIC, 60) => Method::BasicDeliver(basic::Deliver::decode(reader, path)?),
            (BASIC, 80) => Method::BasicAck(basic::Ack::decode(reader, path)?),
            (BASIC, 90) => Method::BasicReject(basic::Reject::decode(reader, path)?),
            (BASIC, 100) => Method::BasicRecoverAsync(basic::RecoverAsync::decode(reader, path)?),
            (BASIC, 110) => Method::BasicRecover(basic::Recover::decode(reader, path)?),
            (BASIC, 111) => Method::BasicRecoverOk,
            (BASIC, 120) => Method::BasicNack(basic::Nack::decode(reader, path)?),
            (CONFIRM, 10) => Method::ConfirmSelect(confirm::Select::decode(reader, path)?),
            (CONFIRM, 11) => Method::ConfirmSelectOk,
            (TX, 10) => Method::TxSelect,
            (TX, 11) => Method::TxSelectOk,
            (TX, 20) => Method::TxCommit,
            (TX, 21) => Method::TxCommitOk,
            (TX, 30) => Method::TxRollback,
            (TX, 31) => Method::TxRollbackOk,
            _ => return Err(ProtocolError::UnknownMethod { class_id, method_id }),
        })
    }

    /// Encode this method's `(class_id, method_id)` header and arguments.
    ///
    /// # Errors
    ///
    /// Whatever the argument encode fails with (name/length assertions).
    pub fn encode(&self, writer: &mut Writer) -> Result<()> {
        let (class_id, method_id) = self.id();
        writer.u16(class_id);
        writer.u16(method_id);
        match self {
            Method::ConnectionStart(m) => m.encode(writer),
            Method::ConnectionStartOk(m) => m.encode(writer),
            Method::ConnectionSecure(m) => m.encode(writer),
            Method::ConnectionSecureOk(m) => m.encode(writer),
            Method::ConnectionTune(m) => m.encode(writer),
            Method::ConnectionTuneOk(m) => m.encode(writer),
            Method::ConnectionOpen(m) => m.encode(writer),
            Method::ConnectionOpenOk(m) => m.encode(writer),
            Method::ConnectionClose(m) => m.encode(writer),
            Method::ConnectionCloseOk => Ok(()),
            Method::ConnectionBlocked(m) => m.encode(writer),
            Method::ConnectionUnblocked => Ok(()),
            Method::ConnectionUpdateSecret(m) => m.encode(writer),
            Method::ConnectionUpdateSecretOk => Ok(()),
            Method::ChannelOpen(m) => m.encode(writer),
            Method::ChannelOpenOk(m) => m.encode(writer),
            Method::ChannelFlow(m) => m.encode(writer),
            Method::ChannelFlowOk(m) => m.encode(writer),
            Method::ChannelClose(m) => m.encode(writer),
            Method::ChannelCloseOk => Ok(()),
            Method::ExchangeDeclare(m) => m.encode(writer),
            Method::ExchangeDeclareOk => Ok(()),
            Method::ExchangeDelete(m) => m.encode(writer),
            Method::ExchangeDeleteOk => Ok(()),
            Method::QueueDeclare(m) => m.encode(writer),
            Method::QueueDeclareOk(m) => m.encode(writer),
            Method::QueueBind(m) => m.encode(writer),
            Method::QueueBindOk => Ok(()),
            Method::QueuePurge(m) => m.encode(writer),
            Method::QueuePurgeOk(m) => m.encode(writer),
            Method::QueueDelete(m) => m.encode(writer),
            Method::QueueDeleteOk(m) => m.encode(writer),
            Method::QueueUnbind(m) => m.encode(writer),
            Method::QueueUnbindOk => Ok(()),
            Method::BasicQos(m) => m.encode(writer),
            Method::BasicQosOk => Ok(()),
            Method::BasicConsume(m) => m.encode(writer),
            Method::BasicConsumeOk(m) => m.encode(writer),
            Method::BasicCancel(m) => m.encode(writer),
            Method::BasicCancelOk(m) => m.encode(writer),
            Method::BasicPublish(m) => m.encode(writer),
            Method::BasicReturn(m) => m.encode(writer),
            Method::BasicDeliver(m) => m.encode(writer),
            Method::BasicAck(m) => m.encode(writer),
            Method::BasicReject(m) => m.encode(writer),
            Method::BasicRecoverAsync(m) => m.encode(writer),
            Method::BasicRecover(m) => m.encode(writer),
            Method::BasicRecoverOk => Ok(()),
            Method::BasicNack(m) => m.encode(writer),
            Method::ConfirmSelect(m) => m.encode(writer),
            Method::ConfirmSelectOk => Ok(()),
            Method::TxSelect
            | Method::TxSelectOk
            | Method::TxCommit
            | Method::TxCommitOk
            | Method::TxRollback
            | Method::TxRollbackOk => Ok(()),
        }
    }
}
