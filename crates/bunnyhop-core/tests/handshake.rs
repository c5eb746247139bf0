//! End-to-end scenarios against a scripted stub broker speaking the wire
//! protocol directly over an in-memory `tokio::io::duplex` pipe: handshake,
//! opening a channel, a topology command, and a confirmed publish.

use std::time::Duration;

use bunnyhop_core::{ChannelError, CommandChannel, Connection, ConnectionOptions, PublishChannel, PublishMessage, PublishOutcome};
use bunnyhop_proto::methods::{basic, channel as channel_method, connection as connection_method, queue};
use bunnyhop_proto::{FieldTable, Frame, FrameCodec, Method, Reader, Writer, PROTOCOL_HEADER};
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, DuplexStream};
use tokio_util::codec::Framed;

fn encode(channel: u16, method: Method) -> Frame {
    let mut writer = Writer::growable();
    method.encode(&mut writer).expect("encode");
    Frame::method(channel, writer.into_bytes().freeze())
}

fn decode(frame: &Frame) -> Method {
    let mut reader = Reader::new(&frame.payload);
    let class_id = reader.u16("class_id").expect("class_id");
    let method_id = reader.u16("method_id").expect("method_id");
    Method::decode(class_id, method_id, &mut reader).expect("decode")
}

/// Consume the client's 8-byte protocol header and hand back a `Framed`
/// wrapper over the rest of the duplex half, the way a real broker's
/// listener socket would after accepting the connection.
async fn broker_framed(mut socket: DuplexStream) -> Framed<DuplexStream, FrameCodec> {
    let mut header = [0u8; 8];
    socket.read_exact(&mut header).await.expect("protocol header");
    assert_eq!(header, PROTOCOL_HEADER);
    Framed::new(socket, FrameCodec::new())
}

async fn run_handshake(framed: &mut Framed<DuplexStream, FrameCodec>) {
    let start = Method::ConnectionStart(connection_method::Start {
        version_major: 0,
        version_minor: 9,
        server_properties: FieldTable::new(),
        mechanisms: "PLAIN AMQPLAIN".to_string(),
        locale: "en_US".to_string(),
    });
    framed.send(encode(0, start)).await.expect("send start");

    let frame = framed.next().await.expect("stream open").expect("frame");
    assert!(matches!(decode(&frame), Method::ConnectionStartOk(_)));

    let tune = Method::ConnectionTune(connection_method::Tune { channel_max: 64, frame_max: 131_072, heartbeat: 0 });
    framed.send(encode(0, tune)).await.expect("send tune");

    let frame = framed.next().await.expect("stream open").expect("frame");
    match decode(&frame) {
        Method::ConnectionTuneOk(ok) => {
            assert_eq!(ok.channel_max, 64);
            assert_eq!(ok.frame_max, 131_072);
        }
        other => panic!("expected connection.tune-ok, got {other:?}"),
    }

    let frame = framed.next().await.expect("stream open").expect("frame");
    match decode(&frame) {
        Method::ConnectionOpen(open) => assert_eq!(open.virtual_host, "/"),
        other => panic!("expected connection.open, got {other:?}"),
    }
    framed.send(encode(0, Method::ConnectionOpenOk(connection_method::OpenOk))).await.expect("send open-ok");
}

fn options() -> ConnectionOptions {
    ConnectionOptions { connection_timeout: Duration::from_secs(5), ..ConnectionOptions::default() }
}

#[tokio::test]
async fn handshake_completes_and_declares_a_queue() {
    let (client_socket, broker_socket) = tokio::io::duplex(64 * 1024);

    let broker = tokio::spawn(async move {
        let mut framed = broker_framed(broker_socket).await;
        run_handshake(&mut framed).await;

        let frame = framed.next().await.expect("stream open").expect("frame");
        assert!(matches!(decode(&frame), Method::ChannelOpen(_)));
        send_to_channel(&mut framed, 1, Method::ChannelOpenOk(channel_method::OpenOk)).await;

        let frame = framed.next().await.expect("stream open").expect("frame");
        match decode(&frame) {
            Method::QueueDeclare(declare) => assert_eq!(declare.queue, "orders"),
            other => panic!("expected queue.declare, got {other:?}"),
        }
        let ok = queue::DeclareOk { queue: "orders".to_string(), message_count: 0, consumer_count: 0 };
        send_to_channel(&mut framed, 1, Method::QueueDeclareOk(ok)).await;
        framed
    });

    let connection = Connection::negotiate(client_socket, options()).await.expect("handshake");
    let channel = CommandChannel::open(&connection).await.expect("open channel");
    let declare = queue::Declare {
        queue: "orders".to_string(),
        passive: false,
        durable: true,
        exclusive: false,
        auto_delete: false,
        no_wait: false,
        arguments: FieldTable::new(),
    };
    let ok = channel.queue_declare(declare).await.expect("queue.declare");
    assert_eq!(ok.queue, "orders");

    broker.await.expect("broker task");
}

#[tokio::test]
async fn publish_is_confirmed_with_an_ack() {
    let (client_socket, broker_socket) = tokio::io::duplex(64 * 1024);

    let broker = tokio::spawn(async move {
        let mut framed = broker_framed(broker_socket).await;
        run_handshake(&mut framed).await;

        let frame = framed.next().await.expect("stream open").expect("frame");
        assert!(matches!(decode(&frame), Method::ChannelOpen(_)));
        send_to_channel(&mut framed, 1, Method::ChannelOpenOk(channel_method::OpenOk)).await;

        let frame = framed.next().await.expect("stream open").expect("frame");
        assert!(matches!(decode(&frame), Method::ConfirmSelect(_)));
        send_to_channel(&mut framed, 1, Method::ConfirmSelectOk).await;

        let frame = framed.next().await.expect("stream open").expect("frame");
        match decode(&frame) {
            Method::BasicPublish(publish) => assert_eq!(publish.routing_key, "orders.created"),
            other => panic!("expected basic.publish, got {other:?}"),
        }
        let header = framed.next().await.expect("stream open").expect("frame");
        assert_eq!(header.kind, bunnyhop_proto::FrameKind::Header);
        let body = framed.next().await.expect("stream open").expect("frame");
        assert_eq!(body.kind, bunnyhop_proto::FrameKind::Body);
        assert_eq!(&body.payload[..], b"hello");

        let ack = basic::Ack { delivery_tag: 1, multiple: false };
        send_to_channel(&mut framed, 1, Method::BasicAck(ack)).await;
        framed
    });

    let connection = Connection::negotiate(client_socket, options()).await.expect("handshake");
    let publisher = PublishChannel::open(&connection).await.expect("open publish channel");
    let message = PublishMessage::new("", "orders.created")
        .with_body(bunnyhop_core::BodySource::from_bytes(bytes::Bytes::from_static(b"hello")));
    let outcome = publisher.publish(message).await.expect("publish");
    assert!(matches!(outcome, PublishOutcome::Ack(ack) if ack.delivery_tag == 1));

    broker.await.expect("broker task");
}

#[tokio::test]
async fn declaring_a_missing_exchange_passively_surfaces_the_broker_close() {
    let (client_socket, broker_socket) = tokio::io::duplex(64 * 1024);

    let broker = tokio::spawn(async move {
        let mut framed = broker_framed(broker_socket).await;
        run_handshake(&mut framed).await;

        let frame = framed.next().await.expect("stream open").expect("frame");
        assert!(matches!(decode(&frame), Method::ChannelOpen(_)));
        send_to_channel(&mut framed, 1, Method::ChannelOpenOk(channel_method::OpenOk)).await;

        let frame = framed.next().await.expect("stream open").expect("frame");
        assert!(matches!(decode(&frame), Method::ExchangeDeclare(_)));
        let close = channel_method::Close { reply_code: 404, reply_text: "NOT_FOUND".to_string(), class_id: 40, method_id: 10 };
        send_to_channel(&mut framed, 1, Method::ChannelClose(close)).await;
        framed
    });

    let connection = Connection::negotiate(client_socket, options()).await.expect("handshake");
    let channel = CommandChannel::open(&connection).await.expect("open channel");
    let declare = bunnyhop_proto::methods::exchange::Declare {
        exchange: "missing".to_string(),
        kind: String::new(),
        passive: true,
        durable: false,
        auto_delete: false,
        internal: false,
        no_wait: false,
        arguments: FieldTable::new(),
    };
    let err = channel.exchange_declare(declare).await.expect_err("should fail");
    assert!(matches!(err, ChannelError::ClosedByPeer { reply_code: 404, .. }));

    broker.await.expect("broker task");
}

async fn send_to_channel(framed: &mut Framed<DuplexStream, FrameCodec>, channel: u16, method: Method) {
    framed.send(encode(channel, method)).await.expect("send frame");
}
