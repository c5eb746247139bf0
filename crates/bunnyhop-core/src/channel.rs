//! The abstract per-channel state machine (spec.md §4.5, §9).
//!
//! [`Channel`] is the shared core that [`crate::publish::PublishChannel`] and
//! [`crate::consume::ConsumeChannel`] both wrap: request/response matching
//! via [`Channel::call_api`], dispatch of unsolicited methods and content
//! frames to a registered [`ContentHandler`], and the universal
//! `channel.flow`/`channel.close` handling every channel must answer
//! regardless of its role.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, OnceLock, PoisonError};

use bunnyhop_proto::methods::{channel as channel_method, class};
use bunnyhop_proto::{BasicProperties, Frame, FrameKind, Method, Reader};
use futures::future::BoxFuture;
use tokio::sync::{oneshot, Mutex};

use crate::connection::Shared;
use crate::error::ChannelError;
use crate::unique_id::{UniqueId, UniqueIdGenerator};

/// Per-role callback the abstract [`Channel`] dispatches content frames and
/// unsolicited methods to. `PublishChannel` and `ConsumeChannel` each supply
/// one; this is the concrete stand-in for spec.md §9's "Channel value with
/// three injected callbacks" description — see DESIGN.md for why this
/// crate expresses it as a trait object rather than three stored closures.
pub(crate) trait ContentHandler: Send + Sync {
    /// A header frame started a content sequence.
    fn on_header(&self, class_id: u16, body_size: u64, properties: BasicProperties) -> BoxFuture<'_, ()>;

    /// A body chunk arrived for the content sequence a header frame opened.
    fn on_body(&self, chunk: bytes::Bytes) -> BoxFuture<'_, ()>;

    /// A method arrived that `Channel` found no waiter for (`basic.deliver`,
    /// `basic.return`, a straggling `basic.ack`/`basic.nack`, ...).
    fn on_unsolicited(&self, method: Method) -> BoxFuture<'_, ()>;
}

struct WaiterEntry<S> {
    slot: Arc<StdMutex<Option<oneshot::Sender<Result<Method, ChannelError>>>>>,
    siblings: Arc<[(u16, u16)]>,
    _marker: std::marker::PhantomData<fn() -> S>,
}

impl<S> Clone for WaiterEntry<S> {
    fn clone(&self) -> Self {
        Self { slot: Arc::clone(&self.slot), siblings: Arc::clone(&self.siblings), _marker: std::marker::PhantomData }
    }
}

type WaiterMap<S> = HashMap<(u16, u16), BTreeMap<UniqueId, WaiterEntry<S>>>;

/// The per-channel state machine (spec.md §4.5). Generic over the same
/// socket type as [`crate::connection::Connection`].
pub struct Channel<S> {
    pub(crate) id: u16,
    pub(crate) shared: Arc<Shared<S>>,
    waiters: Mutex<WaiterMap<S>>,
    content: OnceLock<Arc<dyn ContentHandler>>,
    closed: AtomicBool,
    destroyed: AtomicBool,
    ids: UniqueIdGenerator,
}

impl<S> Channel<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    pub(crate) fn new(id: u16, shared: Arc<Shared<S>>) -> Arc<Self> {
        Arc::new(Self {
            id,
            shared,
            waiters: Mutex::new(HashMap::new()),
            content: OnceLock::new(),
            closed: AtomicBool::new(false),
            destroyed: AtomicBool::new(false),
            ids: UniqueIdGenerator::default(),
        })
    }

    /// Registers the role-specific handler. Must be called once, before the
    /// channel is reachable from the connection's dispatch table, since
    /// there is no way to replace it afterwards.
    pub(crate) fn set_content_handler(&self, handler: Arc<dyn ContentHandler>) {
        let _ = self.content.set(handler);
    }

    /// Whether the channel has been torn down, locally or by the peer.
    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    /// Encode and send a bare method frame on this channel.
    pub(crate) async fn send_method(&self, method: Method) -> Result<(), ChannelError> {
        let frame = Self::encode_method_frame(self.id, method)?;
        self.shared.send_frame(frame).await.map_err(|_| ChannelError::ConnectionClosed)
    }

    fn encode_method_frame(channel_id: u16, method: Method) -> Result<Frame, ChannelError> {
        let mut writer = bunnyhop_proto::Writer::growable();
        method.encode(&mut writer).map_err(|_| ChannelError::ConnectionClosed)?;
        Ok(Frame::method(channel_id, writer.into_bytes().freeze()))
    }

    /// Encode and send a content header frame opening a `basic.publish`
    /// (spec.md §4.6).
    pub(crate) async fn send_header(&self, class_id: u16, body_size: u64, properties: &BasicProperties) -> Result<(), ChannelError> {
        let mut writer = bunnyhop_proto::Writer::growable();
        writer.u16(class_id);
        writer.u16(0); // weight, always zero
        writer.u64(body_size);
        properties.encode(&mut writer).map_err(ChannelError::Protocol)?;
        self.shared
            .send_frame(Frame::header(self.id, writer.into_bytes().freeze()))
            .await
            .map_err(|_| ChannelError::ConnectionClosed)
    }

    /// Encode and send one body frame. Callers split the payload into
    /// `frame_max`-sized chunks themselves (see `stream::chunk_for_frame`).
    pub(crate) async fn send_body(&self, chunk: bytes::Bytes) -> Result<(), ChannelError> {
        self.shared.send_frame(Frame::body(self.id, chunk)).await.map_err(|_| ChannelError::ConnectionClosed)
    }

    /// The negotiated `frame_max`, or `0` if unlimited.
    pub(crate) fn frame_max(&self) -> u32 {
        self.shared.frame_max()
    }

    /// Register waiters for every id in `expected`, run `send_fn`, and await
    /// whichever resolves first.
    ///
    /// `expected` empty means "fire and forget" (e.g. `basic.ack` from the
    /// consumer side never gets a reply): `send_fn` still runs, but no reply
    /// is awaited and `Ok(None)` returns as soon as it completes.
    ///
    /// Registration happens before `send_fn` runs, so a reply that arrives
    /// before the send future resolves (possible once it's handed to the
    /// writer lock) is never missed — Rust's sequential execution already
    /// gives us the ordering spec.md §4.5 asks for, no explicit yield needed.
    pub(crate) async fn call_api<F>(&self, expected: &[(u16, u16)], send_fn: F) -> Result<Option<Method>, ChannelError>
    where
        F: Future<Output = Result<(), ChannelError>>,
    {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(ChannelError::AlreadyClosed);
        }

        if expected.is_empty() {
            send_fn.await?;
            return Ok(None);
        }

        let id = self.ids.next();
        let (tx, rx) = oneshot::channel();
        let slot = Arc::new(StdMutex::new(Some(tx)));
        let siblings: Arc<[(u16, u16)]> = expected.to_vec().into();

        {
            let mut waiters = self.waiters.lock().await;
            for key in expected {
                waiters.entry(*key).or_default().insert(
                    id,
                    WaiterEntry { slot: Arc::clone(&slot), siblings: Arc::clone(&siblings), _marker: std::marker::PhantomData },
                );
            }
        }

        if let Err(err) = send_fn.await {
            let mut waiters = self.waiters.lock().await;
            for key in expected {
                if let Some(map) = waiters.get_mut(key) {
                    map.remove(&id);
                }
            }
            return Err(err);
        }

        match rx.await {
            Ok(result) => result.map(Some),
            Err(_) => Err(ChannelError::ConnectionClosed),
        }
    }

    /// Pop the oldest waiter registered under `key`, if any, resolve it with
    /// `method`, and deregister the sibling ids the same call registered.
    /// Returns whether a waiter was found.
    async fn resolve(&self, key: (u16, u16), method: Method) -> bool {
        let mut waiters = self.waiters.lock().await;
        let Some(map) = waiters.get_mut(&key) else { return false };
        let Some((uid, entry)) = map.pop_first() else { return false };
        for sibling in entry.siblings.iter() {
            if *sibling == key {
                continue;
            }
            if let Some(map) = waiters.get_mut(sibling) {
                map.remove(&uid);
            }
        }
        drop(waiters);
        if let Some(tx) = entry.slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
            let _ = tx.send(Ok(method));
        }
        true
    }

    /// Entry point for every frame the connection's reader task routes to
    /// this channel.
    pub(crate) async fn on_frame(&self, frame: Frame) {
        match frame.kind {
            FrameKind::Method => self.on_method_frame(&frame).await,
            FrameKind::Header => self.on_header_frame(&frame).await,
            FrameKind::Body => {
                if let Some(handler) = self.content.get() {
                    handler.on_body(frame.payload).await;
                }
            }
            FrameKind::Heartbeat => {
                tracing::debug!(channel = self.id, "dropping stray heartbeat frame on non-zero channel");
            }
        }
    }

    async fn on_method_frame(&self, frame: &Frame) {
        let mut reader = Reader::new(&frame.payload);
        let (class_id, method_id) = match (reader.u16("method.class_id"), reader.u16("method.method_id")) {
            (Ok(c), Ok(m)) => (c, m),
            _ => {
                self.destroy(ChannelError::ConnectionClosed).await;
                return;
            }
        };
        let method = match Method::decode(class_id, method_id, &mut reader) {
            Ok(method) => method,
            Err(_) => {
                self.destroy(ChannelError::ConnectionClosed).await;
                return;
            }
        };
        self.handle_method(method).await;
    }

    async fn on_header_frame(&self, frame: &Frame) {
        let mut reader = Reader::new(&frame.payload);
        let class_id = match reader.u16("header.class_id") {
            Ok(v) => v,
            Err(_) => return,
        };
        let _weight = reader.u16("header.weight").unwrap_or(0);
        let body_size = match reader.u64("header.body_size") {
            Ok(v) => v,
            Err(_) => return,
        };
        let properties = match BasicProperties::decode(&mut reader, "header.properties") {
            Ok(p) => p,
            Err(_) => return,
        };
        if let Some(handler) = self.content.get() {
            handler.on_header(class_id, body_size, properties).await;
        }
    }

    async fn handle_method(&self, method: Method) {
        match &method {
            Method::ChannelFlow(channel_method::Flow { active }) => {
                let reply = Method::ChannelFlowOk(channel_method::FlowOk { active: *active });
                let _ = self.send_method(reply).await;
                return;
            }
            Method::ChannelClose(close) => {
                let reason = ChannelError::ClosedByPeer { reply_code: close.reply_code, reply_text: close.reply_text.clone() };
                let _ = self.send_method(Method::ChannelCloseOk).await;
                self.destroy(reason).await;
                return;
            }
            _ => {}
        }

        let key = method.id();
        if self.resolve(key, method.clone()).await {
            return;
        }

        if let Some(handler) = self.content.get() {
            handler.on_unsolicited(method).await;
            return;
        }

        let name = bunnyhop_proto::tables::method_name(key.0, key.1).unwrap_or("unknown");
        tracing::warn!(channel = self.id, method = name, "unsolicited method with no registered handler");
        self.destroy(ChannelError::ConnectionClosed).await;
    }

    /// Gracefully close the channel: `channel.close` / `channel.close-ok`.
    /// Idempotent — closing twice is a no-op.
    pub async fn close(self: &Arc<Self>) -> Result<(), ChannelError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if self.destroyed.load(Ordering::SeqCst) {
            return Ok(());
        }

        let close = channel_method::Close { reply_code: 200, reply_text: "goodbye".to_string(), class_id: 0, method_id: 0 };
        let this = Arc::clone(self);
        let result =
            self.call_api(&[(class::CHANNEL, 41)], async move { this.send_method(Method::ChannelClose(close)).await }).await;

        self.destroy(ChannelError::AlreadyClosed).await;
        result.map(|_| ())
    }

    /// Tear the channel down locally: reject every outstanding waiter with
    /// `error` and remove it from the connection's channel map.
    pub(crate) async fn destroy(&self, error: ChannelError) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        let mut waiters = self.waiters.lock().await;
        for (_, map) in waiters.drain() {
            for (_, entry) in map {
                if let Some(tx) = entry.slot.lock().unwrap_or_else(PoisonError::into_inner).take() {
                    let _ = tx.send(Err(error.clone()));
                }
            }
        }
        drop(waiters);
        self.shared.forget_channel(self.id).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waiter_map_default_is_empty() {
        let map: WaiterMap<()> = HashMap::new();
        assert!(map.is_empty());
    }
}
