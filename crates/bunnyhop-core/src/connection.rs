//! The connection state machine: handshake, tuning, heartbeats, and channel
//! multiplexing (spec.md §4.4, §5).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::{Duration, Instant};

use bunnyhop_proto::methods::{channel as channel_method, class, connection as connection_method};
use bunnyhop_proto::{Frame, FrameCodec, FrameKind, Method, Reader, Writer, PROTOCOL_HEADER};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::codec::Framed;

use crate::channel::Channel;
use crate::error::{ChannelError, ConnectionError};
use crate::{heartbeat_margin, AuthMechanism, ConnectionOptions};

/// Why a [`Connection`] tore itself down: the broker's reply code and text
/// if one was available, or this client's own best description of a local
/// failure (handshake/heartbeat timeout, transport error).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    /// `connection.close`'s reply code, or this client's nearest mapping
    /// for a locally detected failure (spec.md §6's reply code subset).
    pub reply_code: u16,
    /// Human-readable reason.
    pub reply_text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Open,
    Closed,
}

struct Tuned {
    channel_max: u16,
    frame_max: u32,
    heartbeat: u16,
}

/// State shared between the `Connection` handle, the spawned reader task,
/// the heartbeat tasks, and every open `Channel` (spec.md §5: one writer,
/// many readers of the same socket).
pub(crate) struct Shared<S> {
    writer: Mutex<SplitSink<Framed<S, FrameCodec>, Frame>>,
    pub(crate) channels: Mutex<HashMap<u16, Arc<Channel<S>>>>,
    options: ConnectionOptions,
    tuned: Tuned,
    last_recv: StdMutex<Instant>,
    state: StdMutex<ConnectionState>,
    blocked: AtomicBool,
    close_waiter: Mutex<Option<oneshot::Sender<()>>>,
    closed_tx: watch::Sender<Option<CloseReason>>,
}

impl<S> Shared<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub(crate) async fn send_frame(&self, frame: Frame) -> Result<(), ConnectionError> {
        self.writer.lock().await.send(frame).await.map_err(ConnectionError::Protocol)
    }

    fn touch_last_recv(&self) {
        *self.last_recv.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    fn is_closed(&self) -> bool {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) == ConnectionState::Closed
    }

    fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::SeqCst)
    }

    pub(crate) async fn forget_channel(&self, id: u16) {
        self.channels.lock().await.remove(&id);
    }

    /// The negotiated `frame_max`, or `0` if neither side asked for a limit.
    pub(crate) fn frame_max(&self) -> u32 {
        self.tuned.frame_max
    }

    /// Forced or graceful teardown: mark the connection closed, best-effort
    /// notify the peer with `connection.close`, and reject every channel's
    /// outstanding waiters. Idempotent.
    pub(crate) async fn destroy(self: &Arc<Self>, reply_code: u16, reply_text: impl Into<String>) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if *state == ConnectionState::Closed {
                return;
            }
            *state = ConnectionState::Closed;
        }
        let reply_text = reply_text.into();
        tracing::warn!(reply_code, reply_text = %reply_text, "destroying connection");
        self.closed_tx.send_replace(Some(CloseReason { reply_code, reply_text: reply_text.clone() }));

        let close = Method::ConnectionClose(connection_method::Close {
            reply_code,
            reply_text: reply_text.clone(),
            class_id: 0,
            method_id: 0,
        });
        if let Ok(frame) = encode_method_frame(0, close) {
            let _ = self.send_frame(frame).await;
        }

        if let Some(tx) = self.close_waiter.lock().await.take() {
            let _ = tx.send(());
        }

        let channels: Vec<_> = self.channels.lock().await.drain().map(|(_, c)| c).collect();
        for channel in channels {
            channel.destroy(ChannelError::ConnectionClosed).await;
        }
    }

    pub(crate) async fn open_channel(self: &Arc<Self>) -> Result<Arc<Channel<S>>, ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::ConnectionInactive { reason: "connection is closed".to_string() });
        }
        if self.is_blocked() {
            return Err(ConnectionError::ConnectionInactive { reason: "connection is blocked".to_string() });
        }

        let effective_max = if self.tuned.channel_max == 0 { u16::MAX } else { self.tuned.channel_max };
        let id = {
            let channels = self.channels.lock().await;
            allocate_channel_id(&channels, effective_max)
                .ok_or(ConnectionError::ChannelsExhausted { channel_max: self.tuned.channel_max })?
        };

        let channel = Channel::new(id, Arc::clone(self));
        self.channels.lock().await.insert(id, Arc::clone(&channel));

        let open_channel = Arc::clone(&channel);
        let reply = channel
            .call_api(&[(class::CHANNEL, 11)], async move { open_channel.send_method(Method::ChannelOpen(channel_method::Open)).await })
            .await;

        match reply {
            Ok(_) => Ok(channel),
            Err(err) => {
                self.channels.lock().await.remove(&id);
                Err(ConnectionError::UnexpectedMethod { method: "channel.open-ok".to_string(), state: err.to_string() })
            }
        }
    }
}

/// A negotiated, running AMQP connection. Dropping this without calling
/// [`Connection::close`] leaves the reader and heartbeat tasks running
/// until the socket errors out from under them; callers that need a clean
/// shutdown should call `close` explicitly.
pub struct Connection<S> {
    shared: Arc<Shared<S>>,
    reader: JoinHandle<()>,
    heartbeat_send: Option<JoinHandle<()>>,
    heartbeat_check: Option<JoinHandle<()>>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Run the full handshake (protocol header through `connection.open-ok`)
    /// over an already-connected socket, then spawn the background reader
    /// and heartbeat tasks. Dialing the socket itself is `bunnyhop-client`'s
    /// job; this only needs something that reads and writes bytes.
    ///
    /// # Errors
    ///
    /// [`ConnectionError`] for any failure during the handshake, or if it
    /// does not complete within `options.connection_timeout`.
    pub async fn negotiate(socket: S, options: ConnectionOptions) -> Result<Self, ConnectionError> {
        let connection_timeout = options.connection_timeout;
        match tokio::time::timeout(connection_timeout, Self::handshake(socket, options)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectionError::HandshakeTimeout { elapsed: connection_timeout }),
        }
    }

    async fn handshake(mut socket: S, options: ConnectionOptions) -> Result<Self, ConnectionError> {
        socket.write_all(&PROTOCOL_HEADER).await?;

        let mut probe = [0u8; 8];
        let n = read_up_to(&mut socket, &mut probe).await?;
        if n == 8 && &probe[0..4] == b"AMQP" {
            return Err(ConnectionError::UnsupportedProtocol { found: probe.to_vec(), expected: PROTOCOL_HEADER });
        }

        let mut framed = Framed::new(socket, FrameCodec::new());
        if n > 0 {
            let mut parts = framed.into_parts();
            parts.read_buf.extend_from_slice(&probe[..n]);
            framed = Framed::from_parts(parts);
        }

        let start = match next_method(&mut framed).await? {
            Method::ConnectionStart(start) => start,
            other => return Err(unexpected(&other, "awaiting connection.start")),
        };

        let mechanism = options
            .auth_mechanism
            .iter()
            .copied()
            .find(|m| start.mechanisms.split_whitespace().any(|s| s == m.as_str()))
            .ok_or_else(|| ConnectionError::AuthenticationFailed {
                reason: format!("no mutually supported SASL mechanism among {:?}", start.mechanisms),
            })?;

        let response = sasl_response(mechanism, &options.username, &options.password);
        let start_ok = Method::ConnectionStartOk(connection_method::StartOk {
            client_properties: client_properties(),
            mechanism: mechanism.as_str().to_string(),
            response,
            locale: options.locale.clone(),
        });
        framed.send(encode_method_frame(0, start_ok)?).await.map_err(ConnectionError::Protocol)?;

        let tune = match next_method(&mut framed).await? {
            Method::ConnectionTune(tune) => tune,
            Method::ConnectionSecure(_) => {
                return Err(ConnectionError::AuthenticationFailed {
                    reason: "connection.secure challenge-response is not implemented".to_string(),
                });
            }
            other => return Err(unexpected(&other, "awaiting connection.tune")),
        };

        let channel_max = negotiate_limit(options.channel_max, tune.channel_max);
        let frame_max = negotiate_limit(options.frame_max, tune.frame_max);
        let heartbeat = options.heartbeat;

        let tune_ok = Method::ConnectionTuneOk(connection_method::TuneOk { channel_max, frame_max, heartbeat });
        framed.send(encode_method_frame(0, tune_ok)?).await.map_err(ConnectionError::Protocol)?;

        if frame_max > 0 {
            framed.codec_mut().set_max_frame_size(frame_max as usize);
        }

        let open = Method::ConnectionOpen(connection_method::Open { virtual_host: options.vhost.clone() });
        framed.send(encode_method_frame(0, open)?).await.map_err(ConnectionError::Protocol)?;

        match next_method(&mut framed).await? {
            Method::ConnectionOpenOk(_) => {}
            other => return Err(unexpected(&other, "awaiting connection.open-ok")),
        }

        let (sink, stream) = framed.split();
        let shared = Arc::new(Shared {
            writer: Mutex::new(sink),
            channels: Mutex::new(HashMap::new()),
            options,
            tuned: Tuned { channel_max, frame_max, heartbeat },
            last_recv: StdMutex::new(Instant::now()),
            state: StdMutex::new(ConnectionState::Open),
            blocked: AtomicBool::new(false),
            close_waiter: Mutex::new(None),
            closed_tx: watch::channel(None).0,
        });

        let reader = tokio::spawn(run_reader(Arc::clone(&shared), stream));

        let heartbeat_send =
            (heartbeat > 0).then(|| tokio::spawn(run_heartbeat_send(Arc::clone(&shared), heartbeat)));
        let heartbeat_check =
            (heartbeat > 0).then(|| tokio::spawn(run_heartbeat_check(Arc::clone(&shared), heartbeat)));

        Ok(Self { shared, reader, heartbeat_send, heartbeat_check })
    }

    /// Open a new channel, allocating the lowest unused id in
    /// `1..=channel_max` (spec.md §4.4, invariant 8).
    ///
    /// # Errors
    ///
    /// [`ConnectionError::ChannelsExhausted`] if every id is in use,
    /// [`ConnectionError::ConnectionInactive`] if the connection is closed
    /// or flow-blocked.
    pub(crate) async fn open_channel(&self) -> Result<Arc<Channel<S>>, ConnectionError> {
        self.shared.open_channel().await
    }

    /// Wait for the connection to tear down and report why: a peer-initiated
    /// `connection.close`, a locally detected heartbeat/handshake timeout,
    /// or a graceful `close()`. Resolves immediately if it already closed.
    pub async fn closed(&self) -> CloseReason {
        let mut rx = self.shared.closed_tx.subscribe();
        loop {
            if let Some(reason) = rx.borrow().clone() {
                return reason;
            }
            if rx.changed().await.is_err() {
                return CloseReason { reply_code: 0, reply_text: "connection dropped".to_string() };
            }
        }
    }

    /// Gracefully close the connection: `connection.close` /
    /// `connection.close-ok`, then tear down every channel. Idempotent.
    pub async fn close(&self) -> Result<(), ConnectionError> {
        if self.shared.is_closed() {
            return Ok(());
        }

        let (tx, rx) = oneshot::channel();
        *self.shared.close_waiter.lock().await = Some(tx);

        let close = Method::ConnectionClose(connection_method::Close {
            reply_code: 200,
            reply_text: "goodbye".to_string(),
            class_id: 0,
            method_id: 0,
        });
        let frame = encode_method_frame(0, close)?;
        self.shared.send_frame(frame).await?;

        let _ = tokio::time::timeout(Duration::from_secs(5), rx).await;
        self.shared.destroy(200, "goodbye").await;

        self.reader.abort();
        if let Some(h) = &self.heartbeat_send {
            h.abort();
        }
        if let Some(h) = &self.heartbeat_check {
            h.abort();
        }
        Ok(())
    }
}

impl<S> Drop for Connection<S> {
    fn drop(&mut self) {
        self.reader.abort();
        if let Some(h) = &self.heartbeat_send {
            h.abort();
        }
        if let Some(h) = &self.heartbeat_check {
            h.abort();
        }
    }
}

async fn read_up_to<S: AsyncRead + Unpin>(socket: &mut S, buf: &mut [u8; 8]) -> Result<usize, ConnectionError> {
    let mut total = 0;
    loop {
        let n = socket.read(&mut buf[total..]).await?;
        if n == 0 {
            return Ok(total);
        }
        total += n;
        if total == buf.len() {
            return Ok(total);
        }
    }
}

async fn next_method<S>(framed: &mut Framed<S, FrameCodec>) -> Result<Method, ConnectionError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let frame = framed
        .next()
        .await
        .ok_or_else(|| ConnectionError::Io(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "connection closed during handshake")))?
        .map_err(ConnectionError::Protocol)?;
    if frame.kind != FrameKind::Method {
        return Err(ConnectionError::Protocol(bunnyhop_proto::ProtocolError::UnknownFrameKind { kind: 0 }));
    }
    decode_method_frame(&frame)
}

fn decode_method_frame(frame: &Frame) -> Result<Method, ConnectionError> {
    let mut reader = Reader::new(&frame.payload);
    let class_id = reader.u16("method.class_id").map_err(ConnectionError::Protocol)?;
    let method_id = reader.u16("method.method_id").map_err(ConnectionError::Protocol)?;
    Method::decode(class_id, method_id, &mut reader).map_err(ConnectionError::Protocol)
}

fn encode_method_frame(channel: u16, method: Method) -> Result<Frame, ConnectionError> {
    let mut writer = Writer::growable();
    method.encode(&mut writer).map_err(ConnectionError::Protocol)?;
    Ok(Frame::method(channel, writer.into_bytes().freeze()))
}

fn unexpected(method: &Method, state: &str) -> ConnectionError {
    let (class_id, method_id) = method.id();
    let name = bunnyhop_proto::tables::method_name(class_id, method_id).unwrap_or("unknown").to_string();
    ConnectionError::UnexpectedMethod { method: name, state: state.to_string() }
}

/// `min(client, server)` when `client != 0`, else `server` — the literal
/// tuning rule from spec.md §4.4. `heartbeat` does not go through this;
/// the client's configured value is sent as-is in `tune-ok`.
fn negotiate_limit<T: PartialOrd + Copy + Default>(client: T, server: T) -> T {
    if client != T::default() {
        if client < server {
            client
        } else {
            server
        }
    } else {
        server
    }
}

fn allocate_channel_id<V>(channels: &HashMap<u16, V>, max: u16) -> Option<u16> {
    if max == 0 {
        return None;
    }
    let mut candidate: u16 = 1;
    loop {
        if !channels.contains_key(&candidate) {
            return Some(candidate);
        }
        if candidate == max {
            return None;
        }
        candidate += 1;
    }
}

/// Build the `response` field for the client's chosen SASL mechanism
/// (spec.md §4.4). `AMQPLAIN`'s response is, per the protocol, raw
/// (non-length-prefixed) field-table entries rather than text; this client
/// models every AMQP string as UTF-8 `String`, so non-ASCII credentials or
/// fields that happen to contain invalid UTF-8 byte sequences (possible
/// only once a `LOGIN`/`PASSWORD` value exceeds ~128 bytes, per the u32
/// length prefix's leading zero bytes) would round-trip lossily — see
/// DESIGN.md.
fn sasl_response(mechanism: AuthMechanism, username: &str, password: &str) -> String {
    match mechanism {
        AuthMechanism::Plain => format!("\0{username}\0{password}"),
        AuthMechanism::AmqPlain => {
            let mut writer = Writer::growable();
            let _ = writer.shortstr("LOGIN", "login");
            writer.u8(b'S');
            writer.longstr(username);
            let _ = writer.shortstr("PASSWORD", "password");
            writer.u8(b'S');
            writer.longstr(password);
            String::from_utf8_lossy(&writer.into_bytes()).into_owned()
        }
    }
}

fn client_properties() -> bunnyhop_proto::FieldTable {
    let mut table = bunnyhop_proto::FieldTable::new();
    let _ = table.insert("product", bunnyhop_proto::Value::LongString("bunnyhop".to_string()));
    let _ = table.insert("version", bunnyhop_proto::Value::LongString(env!("CARGO_PKG_VERSION").to_string()));
    let _ = table.insert("platform", bunnyhop_proto::Value::LongString("rust".to_string()));
    table
}

async fn run_reader<S>(shared: Arc<Shared<S>>, mut stream: SplitStream<Framed<S, FrameCodec>>)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    loop {
        match stream.next().await {
            Some(Ok(frame)) => {
                shared.touch_last_recv();
                dispatch(&shared, frame).await;
                if shared.is_closed() {
                    break;
                }
            }
            Some(Err(err)) => {
                shared.destroy(501, format!("frame error: {err}")).await;
                break;
            }
            None => {
                shared.destroy(320, "connection closed by peer").await;
                break;
            }
        }
    }
}

async fn dispatch<S>(shared: &Arc<Shared<S>>, frame: Frame)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    if frame.channel == 0 {
        handle_channel_zero(shared, frame).await;
        return;
    }

    let channel = shared.channels.lock().await.get(&frame.channel).cloned();
    match channel {
        Some(channel) => channel.on_frame(frame).await,
        None => {
            tracing::debug!(channel = frame.channel, "dropping frame for unknown/closed channel");
        }
    }
}

async fn handle_channel_zero<S>(shared: &Arc<Shared<S>>, frame: Frame)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    match frame.kind {
        FrameKind::Heartbeat => {}
        FrameKind::Method => match decode_method_frame(&frame) {
            Ok(method) => handle_connection_method(shared, method).await,
            Err(err) => shared.destroy(501, format!("frame error: {err}")).await,
        },
        FrameKind::Header | FrameKind::Body => {
            shared.destroy(501, "unexpected content frame on channel 0").await;
        }
    }
}

async fn handle_connection_method<S>(shared: &Arc<Shared<S>>, method: Method)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    match method {
        Method::ConnectionClose(close) => {
            let _ = shared.send_frame(encode_method_frame(0, Method::ConnectionCloseOk).unwrap_or(Frame::heartbeat())).await;
            shared.destroy(close.reply_code, close.reply_text).await;
        }
        Method::ConnectionCloseOk => {
            if let Some(tx) = shared.close_waiter.lock().await.take() {
                let _ = tx.send(());
            }
        }
        Method::ConnectionBlocked(blocked) => {
            shared.blocked.store(true, Ordering::SeqCst);
            tracing::warn!(reason = %blocked.reason, "broker blocked this connection");
        }
        Method::ConnectionUnblocked => {
            shared.blocked.store(false, Ordering::SeqCst);
            tracing::info!("broker unblocked this connection");
        }
        Method::ConnectionUpdateSecret(_) => {
            shared.destroy(540, "connection.update-secret is not implemented").await;
        }
        other => {
            shared.destroy(503, format!("unexpected method on channel 0: {}", unexpected(&other, "open"))).await;
        }
    }
}

async fn run_heartbeat_send<S>(shared: Arc<Shared<S>>, heartbeat_secs: u16)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let period = Duration::from_secs(u64::from(heartbeat_secs));
    let mut ticker = tokio::time::interval(period.saturating_sub(heartbeat_margin(heartbeat_secs)).max(Duration::from_millis(1)));
    loop {
        ticker.tick().await;
        if shared.is_closed() {
            break;
        }
        if shared.send_frame(Frame::heartbeat()).await.is_err() {
            break;
        }
    }
}

async fn run_heartbeat_check<S>(shared: Arc<Shared<S>>, heartbeat_secs: u16)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let timeout_after = Duration::from_secs(u64::from(heartbeat_secs)) + heartbeat_margin(heartbeat_secs);
    let poll_every = Duration::from_secs(1);
    loop {
        tokio::time::sleep(poll_every).await;
        if shared.is_closed() {
            break;
        }
        let elapsed = shared.last_recv.lock().unwrap_or_else(PoisonError::into_inner).elapsed();
        if elapsed > timeout_after {
            tracing::warn!(?elapsed, "missed heartbeat, destroying connection");
            shared.destroy(320, "Heartbeat timeout expired").await;
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiate_limit_uses_server_value_when_client_is_zero() {
        assert_eq!(negotiate_limit::<u16>(0, 2047), 2047);
    }

    #[test]
    fn negotiate_limit_takes_the_smaller_when_client_is_nonzero() {
        assert_eq!(negotiate_limit::<u32>(131_072, 4096), 4096);
        assert_eq!(negotiate_limit::<u32>(2048, 4096), 2048);
    }

    #[test]
    fn allocate_channel_id_picks_the_lowest_free_id() {
        let mut channels: HashMap<u16, ()> = HashMap::new();
        channels.insert(1, ());
        channels.insert(3, ());
        assert_eq!(allocate_channel_id(&channels, 10), Some(2));
    }

    #[test]
    fn allocate_channel_id_is_none_once_the_limit_is_full() {
        let channels: HashMap<u16, ()> = (1..=3).map(|id| (id, ())).collect();
        assert_eq!(allocate_channel_id(&channels, 3), None);
    }
}
