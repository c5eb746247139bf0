//! A channel used only for request/response methods that never start a
//! content sequence: `exchange.*`/`queue.*`. Thin compared to
//! [`crate::publish::PublishChannel`]/[`crate::consume::ConsumeChannel`] —
//! no [`crate::channel::ContentHandler`] is registered, since nothing on
//! this channel ever sends a header or body frame.

use std::sync::Arc;

use bunnyhop_proto::methods::{class, exchange, queue};
use bunnyhop_proto::Method;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::channel::Channel;
use crate::connection::Connection;
use crate::error::ChannelError;

/// A channel for `exchange.*`/`queue.*` declare/bind/purge/delete calls —
/// the broker-topology half of spec.md's explicitly out-of-scope "command
/// helper façades", kept here as the thin request/response primitive
/// `bunnyhop-client` builds its ergonomic wrappers on top of.
pub struct CommandChannel<S> {
    channel: Arc<Channel<S>>,
}

impl<S> CommandChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Open a new channel for topology commands.
    ///
    /// # Errors
    ///
    /// [`ChannelError::ConnectionClosed`] if the connection cannot open a
    /// new channel.
    pub async fn open(connection: &Connection<S>) -> Result<Self, ChannelError> {
        let channel = connection.open_channel().await.map_err(|_| ChannelError::ConnectionClosed)?;
        Ok(Self { channel })
    }

    /// `exchange.declare` / `exchange.declare-ok`.
    pub async fn exchange_declare(&self, declare: exchange::Declare) -> Result<(), ChannelError> {
        let c = Arc::clone(&self.channel);
        self.channel
            .call_api(&[(class::EXCHANGE, 11)], async move { c.send_method(Method::ExchangeDeclare(declare)).await })
            .await?;
        Ok(())
    }

    /// `exchange.delete` / `exchange.delete-ok`.
    pub async fn exchange_delete(&self, delete: exchange::Delete) -> Result<(), ChannelError> {
        let c = Arc::clone(&self.channel);
        self.channel
            .call_api(&[(class::EXCHANGE, 21)], async move { c.send_method(Method::ExchangeDelete(delete)).await })
            .await?;
        Ok(())
    }

    /// `queue.declare` / `queue.declare-ok`.
    pub async fn queue_declare(&self, declare: queue::Declare) -> Result<queue::DeclareOk, ChannelError> {
        let c = Arc::clone(&self.channel);
        let reply =
            self.channel.call_api(&[(class::QUEUE, 11)], async move { c.send_method(Method::QueueDeclare(declare)).await }).await?;
        match reply {
            Some(Method::QueueDeclareOk(ok)) => Ok(ok),
            _ => Err(ChannelError::ConnectionClosed),
        }
    }

    /// `queue.bind` / `queue.bind-ok`.
    pub async fn queue_bind(&self, bind: queue::Bind) -> Result<(), ChannelError> {
        let c = Arc::clone(&self.channel);
        self.channel.call_api(&[(class::QUEUE, 21)], async move { c.send_method(Method::QueueBind(bind)).await }).await?;
        Ok(())
    }

    /// `queue.unbind` / `queue.unbind-ok`.
    pub async fn queue_unbind(&self, unbind: queue::Unbind) -> Result<(), ChannelError> {
        let c = Arc::clone(&self.channel);
        self.channel.call_api(&[(class::QUEUE, 51)], async move { c.send_method(Method::QueueUnbind(unbind)).await }).await?;
        Ok(())
    }

    /// `queue.purge` / `queue.purge-ok`.
    pub async fn queue_purge(&self, purge: queue::Purge) -> Result<queue::PurgeOk, ChannelError> {
        let c = Arc::clone(&self.channel);
        let reply = self.channel.call_api(&[(class::QUEUE, 31)], async move { c.send_method(Method::QueuePurge(purge)).await }).await?;
        match reply {
            Some(Method::QueuePurgeOk(ok)) => Ok(ok),
            _ => Err(ChannelError::ConnectionClosed),
        }
    }

    /// `queue.delete` / `queue.delete-ok`.
    pub async fn queue_delete(&self, delete: queue::Delete) -> Result<queue::DeleteOk, ChannelError> {
        let c = Arc::clone(&self.channel);
        let reply =
            self.channel.call_api(&[(class::QUEUE, 41)], async move { c.send_method(Method::QueueDelete(delete)).await }).await?;
        match reply {
            Some(Method::QueueDeleteOk(ok)) => Ok(ok),
            _ => Err(ChannelError::ConnectionClosed),
        }
    }

    /// Close the underlying channel.
    pub async fn close(&self) -> Result<(), ChannelError> {
        self.channel.close().await
    }
}
