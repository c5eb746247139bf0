//! Public façade over `bunnyhop-core`: a plain-TCP dial helper, exchange/queue
//! command helpers, and publisher/consumer convenience wrappers. Everything
//! here is thin — the protocol state machines live in `bunnyhop-core`, which
//! stays generic over any `AsyncRead + AsyncWrite` socket; this crate just
//! adds the parts that need a concrete transport and a friendlier surface.

pub mod command;
pub mod dial;
pub mod error;

pub use bunnyhop_core::{
    AuthMechanism, ChannelError, CloseReason, CommandChannel, ConnectionError, ConnectionOptions, ConsumeChannel, ConsumeOptions,
    Delivery, PublishChannel, PublishMessage, PublishOutcome,
};
pub use command::{
    bind_queue, declare_exchange, declare_queue, delete_exchange, delete_queue, exchange_exists, purge_queue, queue_exists,
    queue_stat, unbind_queue,
};
pub use dial::connect;
pub use error::ClientError;

/// A `bunnyhop_core::Connection` dialed over plain TCP — the type `connect`
/// returns.
pub type TcpConnection = bunnyhop_core::Connection<tokio::net::TcpStream>;
