//! Connection and channel state machines for a streaming AMQP 0-9-1 client.
//!
//! This is the "hard part" of the wire core: protocol-header exchange, SASL
//! negotiation, tuning, heartbeats, channel multiplexing, request/response
//! matching, and content-assembly/content-emission on top of
//! [`bunnyhop_proto`]'s pure codec. No TLS/TCP dialing and no command
//! helpers live here — see `bunnyhop-client` for those; this crate only
//! requires its socket to implement [`tokio::io::AsyncRead`] +
//! [`tokio::io::AsyncWrite`].

pub mod channel;
pub mod command;
pub mod connection;
pub mod consume;
pub mod error;
pub mod publish;
pub mod stream;
mod unique_id;

pub use channel::Channel;
pub use command::CommandChannel;
pub use connection::{CloseReason, Connection};
pub use consume::{ConsumeChannel, ConsumeOptions, Delivery};
pub use error::{ChannelError, ConnectionError};
pub use publish::{PublishChannel, PublishMessage, PublishOutcome};
pub use stream::BodySource;

use std::time::Duration;

/// The SASL mechanisms this client can negotiate (spec.md §4.4). Anything
/// beyond these two is explicitly a Non-goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMechanism {
    /// `response = "\0" + user + "\0" + pass`.
    Plain,
    /// `response` = `LOGIN`/`PASSWORD` long-string entries, back to back,
    /// without the field-table's own length prefix.
    AmqPlain,
}

impl AuthMechanism {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            AuthMechanism::Plain => "PLAIN",
            AuthMechanism::AmqPlain => "AMQPLAIN",
        }
    }
}

/// Tuning and credential options for [`Connection::negotiate`], one field
/// per row of spec.md §6's configuration table.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionOptions {
    /// TCP host. Dialing itself is a `bunnyhop-client` concern; this field
    /// only ends up in logging here.
    pub host: String,
    /// TCP port.
    pub port: u16,
    /// Virtual host sent in `connection.open`.
    pub vhost: String,
    /// SASL username.
    pub username: String,
    /// SASL password.
    pub password: String,
    /// Priority order of mechanisms to try against the server's
    /// space-separated `connection.start.mechanisms`.
    pub auth_mechanism: Vec<AuthMechanism>,
    /// Requested channel-max; `0` accepts whatever the server proposes.
    pub channel_max: u16,
    /// Requested frame-max; `0` accepts whatever the server proposes.
    pub frame_max: u32,
    /// Requested heartbeat interval in seconds; `0` disables it.
    pub heartbeat: u16,
    /// Locale sent in `connection.start-ok`.
    pub locale: String,
    /// Overall deadline for the handshake (protocol header through
    /// `connection.open-ok`).
    pub connection_timeout: Duration,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5672,
            vhost: "/".to_string(),
            username: "guest".to_string(),
            password: "guest".to_string(),
            auth_mechanism: vec![AuthMechanism::AmqPlain, AuthMechanism::Plain],
            channel_max: 0,
            frame_max: 0,
            heartbeat: 0,
            locale: "en_US".to_string(),
            connection_timeout: Duration::from_millis(60_000),
        }
    }
}

/// `clamp(heartbeat_secs / 100, 50ms, 1000ms)` — the slack both the send and
/// check loops allow around the nominal heartbeat interval (spec.md §3).
pub(crate) fn heartbeat_margin(heartbeat_secs: u16) -> Duration {
    let millis = u64::from(heartbeat_secs) * 10; // heartbeat_secs * 1000 / 100
    Duration::from_millis(millis.clamp(50, 1000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_options_match_the_configuration_table() {
        let opts = ConnectionOptions::default();
        assert_eq!(opts.host, "127.0.0.1");
        assert_eq!(opts.port, 5672);
        assert_eq!(opts.vhost, "/");
        assert_eq!(opts.auth_mechanism, vec![AuthMechanism::AmqPlain, AuthMechanism::Plain]);
        assert_eq!(opts.connection_timeout, Duration::from_millis(60_000));
    }

    #[test]
    fn heartbeat_margin_is_clamped() {
        assert_eq!(heartbeat_margin(1), Duration::from_millis(50));
        assert_eq!(heartbeat_margin(200), Duration::from_millis(1000));
        assert_eq!(heartbeat_margin(60), Duration::from_millis(600));
    }
}
