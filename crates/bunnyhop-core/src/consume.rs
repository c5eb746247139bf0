//! The consumer side of a channel: `basic.qos`/`basic.consume` plus
//! assembling `basic.deliver` + header + body frames into [`Delivery`]
//! values with a streamed, backpressured body (spec.md §4.8).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};

use bunnyhop_proto::methods::{basic, class};
use bunnyhop_proto::{BasicProperties, FieldTable, Method, Value};
use bytes::Bytes;
use futures::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;

use crate::channel::{Channel, ContentHandler};
use crate::connection::Connection;
use crate::error::ChannelError;
use crate::stream::DeliveryBody;

/// Where a RabbitMQ stream queue consumer should start reading from
/// (`x-stream-offset`). Non-goal beyond passing the value through: this
/// client does not interpret it.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamOffset {
    /// The first available message.
    First,
    /// The most recent message.
    Last,
    /// The next message published after the consumer attaches.
    Next,
    /// The first message at or after this timestamp (seconds since epoch).
    Timestamp(u64),
    /// An absolute stream offset.
    Offset(i64),
}

impl StreamOffset {
    fn into_value(self) -> Value {
        match self {
            StreamOffset::First => Value::LongString("first".to_string()),
            StreamOffset::Last => Value::LongString("last".to_string()),
            StreamOffset::Next => Value::LongString("next".to_string()),
            StreamOffset::Timestamp(ts) => Value::Timestamp(ts),
            StreamOffset::Offset(offset) => Value::LongLongInt(offset),
        }
    }
}

/// Parameters for [`ConsumeChannel::start`].
#[derive(Debug, Clone, Default)]
pub struct ConsumeOptions {
    /// Queue to consume from.
    pub queue: String,
    /// Consumer tag; empty asks the broker to generate one.
    pub consumer_tag: String,
    /// Deliver without waiting for acknowledgement.
    pub no_ack: bool,
    /// Request exclusive consumption of the queue.
    pub exclusive: bool,
    /// `basic.qos` prefetch count; also used as the streamed body and
    /// delivery channels' `high_water_mark` (spec.md §9). `0` disables
    /// prefetch and falls back to a `high_water_mark` of 1.
    pub prefetch_count: u16,
    /// `x-priority` consumer argument.
    pub priority: Option<i16>,
    /// `x-cancel-on-ha-failover` consumer argument.
    pub cancel_on_ha_failover: bool,
    /// `x-stream-offset` consumer argument, for RabbitMQ stream queues.
    pub stream_offset: Option<StreamOffset>,
}

/// One assembled delivery: `basic.deliver`'s metadata, the header frame's
/// properties, and a streamed body.
pub struct Delivery<S> {
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
    /// `basic-properties` from the header frame.
    pub properties: BasicProperties,
    /// The message body, readable as a bounded stream of chunks as they
    /// arrive in body frames.
    pub body: DeliveryBody,
    channel: Arc<Channel<S>>,
    acked: AtomicBool,
}

impl<S> Delivery<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Acknowledge this delivery. Idempotent — a second call is a no-op.
    pub async fn ack(&self) -> Result<(), ChannelError> {
        if self.acked.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let ack = basic::Ack { delivery_tag: self.delivery_tag, multiple: false };
        let channel = Arc::clone(&self.channel);
        self.channel.call_api(&[], async move { channel.send_method(Method::BasicAck(ack)).await }).await?;
        Ok(())
    }

    /// Negatively acknowledge this delivery, optionally asking the broker to
    /// requeue it. Idempotent.
    pub async fn nack(&self, requeue: bool) -> Result<(), ChannelError> {
        if self.acked.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let nack = basic::Nack { delivery_tag: self.delivery_tag, multiple: false, requeue };
        let channel = Arc::clone(&self.channel);
        self.channel.call_api(&[], async move { channel.send_method(Method::BasicNack(nack)).await }).await?;
        Ok(())
    }
}

struct ActiveBody {
    tx: mpsc::Sender<std::io::Result<Bytes>>,
    remaining: u64,
}

struct ConsumeContentHandler<S> {
    pending_deliver: StdMutex<Option<basic::Deliver>>,
    active_body: StdMutex<Option<ActiveBody>>,
    deliveries: mpsc::Sender<Delivery<S>>,
    channel: Weak<Channel<S>>,
    high_water_mark: usize,
    consumer_tag: StdMutex<String>,
}

impl<S> ConsumeContentHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Destroy the channel with `unexpected_frame` (505): the content
    /// sequence broke spec.md §4.7's deliver/header/body ordering invariant.
    async fn fatal(&self, reason: &str) {
        if let Some(channel) = self.channel.upgrade() {
            tracing::warn!(reason, "unexpected frame in content sequence, destroying channel");
            channel
                .destroy(ChannelError::ClosedByPeer { reply_code: 505, reply_text: format!("UNEXPECTED_FRAME: {reason}") })
                .await;
        }
    }
}

impl<S> ContentHandler for ConsumeContentHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn on_header(&self, _class_id: u16, body_size: u64, properties: BasicProperties) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let Some(deliver) = self.pending_deliver.lock().unwrap_or_else(PoisonError::into_inner).take() else {
                self.fatal("header frame arrived with no pending basic.deliver").await;
                return;
            };
            let Some(channel) = self.channel.upgrade() else { return };

            if body_size == 0 {
                let (_tx, body) = DeliveryBody::channel(self.high_water_mark);
                let delivery = Delivery {
                    consumer_tag: deliver.consumer_tag,
                    delivery_tag: deliver.delivery_tag,
                    redelivered: deliver.redelivered,
                    exchange: deliver.exchange,
                    routing_key: deliver.routing_key,
                    properties,
                    body,
                    channel,
                    acked: AtomicBool::new(false),
                };
                // _tx drops here, closing the body stream immediately: no body
                // frame is coming, so there is nothing left to drive on_body.
                if self.deliveries.send(delivery).await.is_err() {
                    tracing::debug!("consumer dropped its ConsumeChannel, discarding delivery");
                }
                return;
            }

            let (tx, body) = DeliveryBody::channel(self.high_water_mark);
            *self.active_body.lock().unwrap_or_else(PoisonError::into_inner) = Some(ActiveBody { tx, remaining: body_size });

            let delivery = Delivery {
                consumer_tag: deliver.consumer_tag,
                delivery_tag: deliver.delivery_tag,
                redelivered: deliver.redelivered,
                exchange: deliver.exchange,
                routing_key: deliver.routing_key,
                properties,
                body,
                channel,
                acked: AtomicBool::new(false),
            };
            if self.deliveries.send(delivery).await.is_err() {
                tracing::debug!("consumer dropped its ConsumeChannel, discarding delivery");
            }
        })
    }

    fn on_body(&self, chunk: Bytes) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let tx = {
                let mut guard = self.active_body.lock().unwrap_or_else(PoisonError::into_inner);
                let Some(active) = guard.as_mut() else {
                    drop(guard);
                    self.fatal("body frame arrived with no active content sequence").await;
                    return;
                };
                let len = chunk.len() as u64;
                if len > active.remaining {
                    let remaining = active.remaining;
                    *guard = None;
                    drop(guard);
                    self.fatal(&format!("body frame of {len} byte(s) overshoots {remaining} byte(s) remaining")).await;
                    return;
                }
                active.remaining -= len;
                let tx = active.tx.clone();
                if active.remaining == 0 {
                    *guard = None;
                }
                tx
            };
            let _ = tx.send(Ok(chunk)).await;
        })
    }

    fn on_unsolicited(&self, method: Method) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            match method {
                Method::BasicDeliver(deliver) => {
                    let expected = self.consumer_tag.lock().unwrap_or_else(PoisonError::into_inner).clone();
                    if !expected.is_empty() && deliver.consumer_tag != expected {
                        if let Some(channel) = self.channel.upgrade() {
                            channel
                                .destroy(ChannelError::ClosedByPeer {
                                    reply_code: 313,
                                    reply_text: format!(
                                        "NO_CONSUMERS: basic.deliver for unknown consumer tag {:?}",
                                        deliver.consumer_tag
                                    ),
                                })
                                .await;
                        }
                        return;
                    }
                    let mut pending = self.pending_deliver.lock().unwrap_or_else(PoisonError::into_inner);
                    if pending.is_some() {
                        drop(pending);
                        self.fatal("basic.deliver arrived while a previous one is still awaiting its header").await;
                        return;
                    }
                    *pending = Some(deliver);
                }
                Method::BasicCancel(cancel) => {
                    if let Some(channel) = self.channel.upgrade() {
                        let reply = Method::BasicCancelOk(basic::CancelOk { consumer_tag: cancel.consumer_tag });
                        let _ = channel.send_method(reply).await;
                        channel
                            .destroy(ChannelError::ClosedByPeer { reply_code: 320, reply_text: "Consumer cancelled".to_string() })
                            .await;
                    }
                }
                other => {
                    let (class_id, method_id) = other.id();
                    let name = bunnyhop_proto::tables::method_name(class_id, method_id).unwrap_or("unknown");
                    tracing::debug!(method = name, "consume channel ignoring unsolicited method");
                }
            }
        })
    }
}

/// A channel set up to consume from a queue.
pub struct ConsumeChannel<S> {
    channel: Arc<Channel<S>>,
    consumer_tag: String,
    deliveries: mpsc::Receiver<Delivery<S>>,
}

impl<S> ConsumeChannel<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Open a new channel and start consuming per `options`: `basic.qos`
    /// followed by `basic.consume`.
    ///
    /// # Errors
    ///
    /// [`ChannelError`] if the channel could not be opened or the broker
    /// rejected `basic.qos`/`basic.consume`.
    pub async fn start(connection: &Connection<S>, options: ConsumeOptions) -> Result<Self, ChannelError> {
        let channel = connection.open_channel().await.map_err(|_| ChannelError::ConnectionClosed)?;

        let qos = basic::Qos { prefetch_size: 0, prefetch_count: options.prefetch_count, global: true };
        let c = Arc::clone(&channel);
        channel.call_api(&[(class::BASIC, 11)], async move { c.send_method(Method::BasicQos(qos)).await }).await?;

        let mut arguments = FieldTable::new();
        if let Some(priority) = options.priority {
            let _ = arguments.insert("x-priority", Value::ShortInt(priority));
        }
        if options.cancel_on_ha_failover {
            let _ = arguments.insert("x-cancel-on-ha-failover", Value::Boolean(true));
        }
        if let Some(offset) = options.stream_offset.clone() {
            let _ = arguments.insert("x-stream-offset", offset.into_value());
        }

        let high_water_mark = usize::from(options.prefetch_count.max(1));
        let (deliveries_tx, deliveries_rx) = mpsc::channel(high_water_mark);
        let handler = Arc::new(ConsumeContentHandler {
            pending_deliver: StdMutex::new(None),
            active_body: StdMutex::new(None),
            deliveries: deliveries_tx,
            channel: Arc::downgrade(&channel),
            high_water_mark,
            consumer_tag: StdMutex::new(options.consumer_tag.clone()),
        });
        channel.set_content_handler(Arc::clone(&handler) as Arc<dyn ContentHandler>);

        let consume = basic::Consume {
            queue: options.queue.clone(),
            consumer_tag: options.consumer_tag.clone(),
            no_local: false,
            no_ack: options.no_ack,
            exclusive: options.exclusive,
            no_wait: false,
            arguments,
        };
        let c = Arc::clone(&channel);
        let reply =
            channel.call_api(&[(class::BASIC, 21)], async move { c.send_method(Method::BasicConsume(consume)).await }).await?;

        let consumer_tag = match reply {
            Some(Method::BasicConsumeOk(ok)) => ok.consumer_tag,
            _ => return Err(ChannelError::ConnectionClosed),
        };
        *handler.consumer_tag.lock().unwrap_or_else(PoisonError::into_inner) = consumer_tag.clone();

        Ok(Self { channel, consumer_tag, deliveries: deliveries_rx })
    }

    /// The consumer tag now in effect (the one requested, or the broker's
    /// generated one if it was left empty).
    #[must_use]
    pub fn consumer_tag(&self) -> &str {
        &self.consumer_tag
    }

    /// Await the next delivery. Returns `None` once the channel is
    /// cancelled or destroyed.
    pub async fn next(&mut self) -> Option<Delivery<S>> {
        self.deliveries.recv().await
    }

    /// `basic.cancel` / `basic.cancel-ok`.
    pub async fn cancel(&self) -> Result<(), ChannelError> {
        let cancel = basic::Cancel { consumer_tag: self.consumer_tag.clone(), no_wait: false };
        let c = Arc::clone(&self.channel);
        self.channel.call_api(&[(class::BASIC, 31)], async move { c.send_method(Method::BasicCancel(cancel)).await }).await?;
        Ok(())
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
    fn stream_offset_named_variants_encode_as_keywords() {
        assert_eq!(StreamOffset::First.into_value(), Value::LongString("first".to_string()));
        assert_eq!(StreamOffset::Last.into_value(), Value::LongString("last".to_string()));
        assert_eq!(StreamOffset::Next.into_value(), Value::LongString("next".to_string()));
    }

    #[test]
    fn stream_offset_numeric_variants_encode_as_numbers() {
        assert_eq!(StreamOffset::Timestamp(42).into_value(), Value::Timestamp(42));
        assert_eq!(StreamOffset::Offset(-7).into_value(), Value::LongLongInt(-7));
    }
}
