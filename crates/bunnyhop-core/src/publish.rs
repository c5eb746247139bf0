//! The publisher side of a channel: `confirm.select` plus emitting
//! `basic.publish` + header + chunked body frames and matching the
//! resulting `basic.ack`/`basic.nack`/`basic.return` (spec.md §4.6, §4.7).

use std::sync::Arc;

use bunnyhop_proto::methods::{basic, class, confirm};
use bunnyhop_proto::{BasicProperties, Method};
use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::channel::{Channel, ContentHandler};
use crate::connection::Connection;
use crate::error::ChannelError;
use crate::stream::{chunk_for_frame, BodySource};

/// A message to publish: destination, optional properties, and an optional
/// body. A body-less message (`body: None`) still emits an empty content
/// sequence — a header frame declaring `body_size: 0` and no body frames —
/// matching what a broker expects for a zero-length payload.
pub struct PublishMessage {
    /// `basic-properties` to attach to the header frame, if any.
    pub properties: Option<BasicProperties>,
    /// Destination exchange; empty routes via the default exchange.
    pub exchange: String,
    /// Routing key.
    pub routing_key: String,
    body: Option<BodySource>,
}

impl PublishMessage {
    /// Start building a message bound for `exchange`/`routing_key`, with no
    /// properties and an empty body.
    #[must_use]
    pub fn new(exchange: impl Into<String>, routing_key: impl Into<String>) -> Self {
        Self { properties: None, exchange: exchange.into(), routing_key: routing_key.into(), body: None }
    }

    /// Attach `basic-properties`.
    #[must_use]
    pub fn with_properties(mut self, properties: BasicProperties) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Attach a body, buffered or streamed (spec.md §4.8).
    #[must_use]
    pub fn with_body(mut self, body: BodySource) -> Self {
        self.body = Some(body);
        self
    }
}

/// What came back for a published message once `confirm.select` is in
/// effect: either the broker acknowledged it, or routing failed and the
/// message was handed back via `basic.return`.
#[derive(Debug)]
pub enum PublishOutcome {
    /// `basic.ack`.
    Ack(basic::Ack),
    /// `basic.return`, with its header/body content sequence already
    /// drained and discarded (see DESIGN.md Open Question (a)).
    Returned(basic::Return),
}

/// Swallows whatever content sequence trails a `basic.return` this channel
/// doesn't keep — `call_api` already resolved the waiter on the method
/// frame, so the header/body frames that follow have nowhere useful to go.
/// A stray `basic.ack`/`basic.nack` that arrives after its waiter already
/// resolved (broker re-acking, or `multiple` covering an earlier tag twice)
/// is similarly a no-op, per DESIGN.md Open Question (a).
struct PublishContentHandler;

impl ContentHandler for PublishContentHandler {
    fn on_header(&self, _class_id: u16, _body_size: u64, _properties: BasicProperties) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }

    fn on_body(&self, _chunk: bytes::Bytes) -> BoxFuture<'_, ()> {
        Box::pin(async {})
    }

    fn on_unsolicited(&self, method: Method) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let (class_id, method_id) = method.id();
            let name = bunnyhop_proto::tables::method_name(class_id, method_id).unwrap_or("unknown");
            tracing::debug!(method = name, "publish channel ignoring unsolicited method");
        })
    }
}

/// A channel set up to publish with `confirm.select` in effect, so every
/// `publish` call awaits the broker's `basic.ack`/`basic.return` before
/// returning (spec.md §4.7).
pub struct PublishChannel<S> {
    channel: Arc<Channel<S>>,
}

impl<S> PublishChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Open a new channel and put it into confirm mode.
    ///
    /// # Errors
    ///
    /// [`ChannelError`] if the channel could not be opened or the broker
    /// rejected `confirm.select`.
    pub async fn open(connection: &Connection<S>) -> Result<Self, ChannelError> {
        let channel = connection.open_channel().await.map_err(|_| ChannelError::ConnectionClosed)?;
        channel.set_content_handler(Arc::new(PublishContentHandler));

        let select = confirm::Select { no_wait: false };
        let c = Arc::clone(&channel);
        channel.call_api(&[(class::CONFIRM, 11)], async move { c.send_method(Method::ConfirmSelect(select)).await }).await?;

        Ok(Self { channel })
    }

    /// Publish `message`, streaming its body in `frame_max`-sized chunks,
    /// and await the broker's confirm.
    ///
    /// # Errors
    ///
    /// [`ChannelError::InvalidPriority`] if `message.properties` carries a
    /// priority outside `0..=9`; [`ChannelError::Protocol`] if the exchange
    /// name fails the wire-level name assertions; otherwise whatever
    /// `call_api` fails with.
    pub async fn publish(&self, mut message: PublishMessage) -> Result<PublishOutcome, ChannelError> {
        if let Some(properties) = &message.properties {
            if !properties.priority_is_valid() {
                return Err(ChannelError::InvalidPriority { priority: properties.priority.unwrap_or(0) });
            }
        }
        bunnyhop_proto::writer::assert::regexp(&message.exchange, "exchange")?;
        bunnyhop_proto::writer::assert::length(&message.exchange, "exchange")?;

        let body = message.body.take();
        let body_size = body.as_ref().map_or(0, BodySource::body_size);
        let properties = message.properties.take().unwrap_or_default();
        let frame_max = self.channel.frame_max();
        let max_chunk = if frame_max == 0 { usize::MAX } else { (frame_max as usize).saturating_sub(bunnyhop_proto::frame::HEADER_LEN + 1) };

        // spec.md §4.6: mandatory is always true (so unroutable messages come
        // back as basic.return instead of vanishing); immediate is always
        // false (deprecated by modern brokers).
        let publish = basic::Publish {
            exchange: message.exchange.clone(),
            routing_key: message.routing_key.clone(),
            mandatory: true,
            immediate: false,
        };

        let channel = Arc::clone(&self.channel);
        let reply = channel
            .call_api(&[(class::BASIC, 80), (class::BASIC, 50)], async move {
                channel.send_method(Method::BasicPublish(publish)).await?;
                channel.send_header(class::BASIC, body_size, &properties).await?;
                if let Some(mut body) = body {
                    use futures::StreamExt;
                    while let Some(chunk) = body.chunks.next().await {
                        let chunk = chunk.map_err(|_| ChannelError::ConnectionClosed)?;
                        for piece in chunk_for_frame(chunk, max_chunk) {
                            channel.send_body(piece).await?;
                        }
                    }
                }
                Ok(())
            })
            .await?;

        match reply {
            Some(Method::BasicAck(ack)) => Ok(PublishOutcome::Ack(ack)),
            Some(Method::BasicReturn(ret)) => Ok(PublishOutcome::Returned(ret)),
            _ => Err(ChannelError::ConnectionClosed),
        }
    }

    /// Close the underlying channel.
    pub async fn close(&self) -> Result<(), ChannelError> {
        self.channel.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_has_no_body_or_properties() {
        let message = PublishMessage::new("amq.topic", "orders.created");
        assert!(message.properties.is_none());
        assert!(message.body.is_none());
        assert_eq!(message.exchange, "amq.topic");
    }

    #[test]
    fn with_body_attaches_a_source() {
        let message = PublishMessage::new("", "orders.created").with_body(BodySource::from_bytes(bytes::Bytes::from_static(b"hi")));
        assert_eq!(message.body.as_ref().map(BodySource::body_size), Some(2));
    }
}
