//! Ergonomic exchange/queue command helpers, built on top of
//! [`bunnyhop_core::CommandChannel`]. Each call opens (and closes) its own
//! channel — these are one-shot conveniences, not something to call in a
//! hot loop; a caller who wants to reuse a channel across several commands
//! should drop down to `CommandChannel` directly.

use bunnyhop_core::{ChannelError, CommandChannel, Connection};
use bunnyhop_proto::methods::{exchange, queue};
use bunnyhop_proto::FieldTable;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::ClientError;

/// `exchange.declare` with `passive: false`.
pub async fn declare_exchange<S>(
    connection: &Connection<S>,
    name: impl Into<String>,
    kind: impl Into<String>,
    durable: bool,
    auto_delete: bool,
) -> Result<(), ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let channel = CommandChannel::open(connection).await?;
    let declare = exchange::Declare {
        exchange: name.into(),
        kind: kind.into(),
        passive: false,
        durable,
        auto_delete,
        internal: false,
        no_wait: false,
        arguments: FieldTable::new(),
    };
    channel.exchange_declare(declare).await?;
    channel.close().await?;
    Ok(())
}

/// `exchange.declare` with `passive: true` — `Ok(true)` if it exists,
/// `Ok(false)` if the broker closed the channel with `not_found` (404).
pub async fn exchange_exists<S>(connection: &Connection<S>, name: impl Into<String>) -> Result<bool, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let channel = CommandChannel::open(connection).await?;
    let declare = exchange::Declare {
        exchange: name.into(),
        kind: String::new(),
        passive: true,
        durable: false,
        auto_delete: false,
        internal: false,
        no_wait: false,
        arguments: FieldTable::new(),
    };
    match channel.exchange_declare(declare).await {
        Ok(()) => {
            channel.close().await?;
            Ok(true)
        }
        Err(ChannelError::ClosedByPeer { reply_code: 404, .. }) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

/// `exchange.delete` with `if_unused: false`.
pub async fn delete_exchange<S>(connection: &Connection<S>, name: impl Into<String>) -> Result<(), ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let channel = CommandChannel::open(connection).await?;
    channel.exchange_delete(exchange::Delete { exchange: name.into(), if_unused: false, no_wait: false }).await?;
    channel.close().await?;
    Ok(())
}

/// `queue.declare` with `passive: false`. Returns the broker's
/// `queue.declare-ok` (useful for reading a broker-generated queue name).
pub async fn declare_queue<S>(
    connection: &Connection<S>,
    name: impl Into<String>,
    durable: bool,
    exclusive: bool,
    auto_delete: bool,
) -> Result<queue::DeclareOk, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let channel = CommandChannel::open(connection).await?;
    let declare = queue::Declare {
        queue: name.into(),
        passive: false,
        durable,
        exclusive,
        auto_delete,
        no_wait: false,
        arguments: FieldTable::new(),
    };
    let ok = channel.queue_declare(declare).await?;
    channel.close().await?;
    Ok(ok)
}

/// `queue.declare` with `passive: true` — `Ok(true)` if it exists, `Ok(false)`
/// if the broker closed the channel with `not_found` (404).
pub async fn queue_exists<S>(connection: &Connection<S>, name: impl Into<String>) -> Result<bool, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    match queue_stat(connection, name).await {
        Ok(_) => Ok(true),
        Err(ClientError::Channel(ChannelError::ClosedByPeer { reply_code: 404, .. })) => Ok(false),
        Err(err) => Err(err),
    }
}

/// `queue.declare` with `passive: true`, returning the broker's current
/// `{queue, message_count, consumer_count}` without creating or modifying
/// anything.
pub async fn queue_stat<S>(connection: &Connection<S>, name: impl Into<String>) -> Result<queue::DeclareOk, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let channel = CommandChannel::open(connection).await?;
    let declare = queue::Declare {
        queue: name.into(),
        passive: true,
        durable: false,
        exclusive: false,
        auto_delete: false,
        no_wait: false,
        arguments: FieldTable::new(),
    };
    let ok = channel.queue_declare(declare).await?;
    channel.close().await?;
    Ok(ok)
}

/// `queue.bind`.
pub async fn bind_queue<S>(
    connection: &Connection<S>,
    queue: impl Into<String>,
    exchange: impl Into<String>,
    routing_key: impl Into<String>,
) -> Result<(), ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let channel = CommandChannel::open(connection).await?;
    channel
        .queue_bind(queue::Bind {
            queue: queue.into(),
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            no_wait: false,
            arguments: FieldTable::new(),
        })
        .await?;
    channel.close().await?;
    Ok(())
}

/// `queue.unbind`.
pub async fn unbind_queue<S>(
    connection: &Connection<S>,
    queue: impl Into<String>,
    exchange: impl Into<String>,
    routing_key: impl Into<String>,
) -> Result<(), ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let channel = CommandChannel::open(connection).await?;
    channel
        .queue_unbind(queue::Unbind {
            queue: queue.into(),
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            arguments: FieldTable::new(),
        })
        .await?;
    channel.close().await?;
    Ok(())
}

/// `queue.purge`, returning the number of messages purged.
pub async fn purge_queue<S>(connection: &Connection<S>, name: impl Into<String>) -> Result<u32, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let channel = CommandChannel::open(connection).await?;
    let ok = channel.queue_purge(queue::Purge { queue: name.into(), no_wait: false }).await?;
    channel.close().await?;
    Ok(ok.message_count)
}

/// `queue.delete` with `if_unused: false, if_empty: false`, returning the
/// number of messages dropped.
pub async fn delete_queue<S>(connection: &Connection<S>, name: impl Into<String>) -> Result<u32, ClientError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let channel = CommandChannel::open(connection).await?;
    let ok = channel.queue_delete(queue::Delete { queue: name.into(), if_unused: false, if_empty: false, no_wait: false }).await?;
    channel.close().await?;
    Ok(ok.message_count)
}
