//! Error types for the connection and channel state machines.
//!
//! [`ConnectionError`] covers everything that tears down the whole
//! connection: transport failures, handshake/heartbeat timeouts, and
//! protocol violations from the peer. [`ChannelError`] covers the narrower,
//! per-channel "soft error" class the server can close a single channel
//! over (spec.md §7) without touching the rest of the connection.

use std::io;
use std::time::Duration;

use thiserror::Error;

use bunnyhop_proto::ProtocolError;

/// Errors that tear down an entire [`crate::connection::Connection`].
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// The underlying socket returned an I/O error.
    #[error("transport error: {0}")]
    Io(#[from] io::Error),

    /// A frame failed to decode, or a method's arguments violated the wire
    /// grammar.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The peer's 8-octet preamble named a protocol revision this client
    /// does not speak.
    #[error("unsupported protocol revision: peer sent {found:?}, expected {expected:?}")]
    UnsupportedProtocol {
        /// The preamble bytes the peer sent back.
        found: Vec<u8>,
        /// The preamble this client requested.
        expected: [u8; 8],
    },

    /// The handshake (protocol header through `connection.open-ok`) did not
    /// complete within `connection_timeout`.
    #[error("handshake did not complete within {elapsed:?}")]
    HandshakeTimeout {
        /// The configured timeout that elapsed.
        elapsed: Duration,
    },

    /// No heartbeat-eligible frame was read from the peer within twice the
    /// negotiated heartbeat interval (spec.md §4.4).
    #[error("missed heartbeat: no frame received for {elapsed:?}")]
    HeartbeatTimeout {
        /// How long the connection went without hearing from the peer.
        elapsed: Duration,
    },

    /// The broker's SASL challenge could not be satisfied by the configured
    /// `auth_mechanism`/credentials.
    #[error("authentication failed: {reason}")]
    AuthenticationFailed {
        /// Server-supplied or locally detected reason.
        reason: String,
    },

    /// A method arrived whose class/method the current connection state
    /// does not expect (e.g. `basic.deliver` before `connection.open-ok`).
    #[error("unexpected method {method} while {state}")]
    UnexpectedMethod {
        /// Dotted name of the method that arrived.
        method: String,
        /// Human-readable description of the state it arrived in.
        state: String,
    },

    /// The server closed the connection with `connection.close`.
    #[error("connection closed by peer: {reply_code} {reply_text}")]
    ClosedByPeer {
        /// Reply code from `connection.close`.
        reply_code: u16,
        /// Human-readable reason from `connection.close`.
        reply_text: String,
    },

    /// A caller tried to use a connection that is already closed.
    #[error("connection is closed")]
    AlreadyClosed,

    /// The requested channel number exceeds the negotiated `channel_max`,
    /// or no channel numbers remain.
    #[error("no channel numbers available (channel_max {channel_max})")]
    ChannelsExhausted {
        /// The negotiated channel limit.
        channel_max: u16,
    },

    /// A channel was requested while the connection is not ready to open
    /// one: the handshake hasn't completed, the broker has flow-blocked the
    /// connection, or it is already being torn down (spec.md §4.4).
    #[error("connection inactive: {reason}")]
    ConnectionInactive {
        /// Which of the three conditions applied.
        reason: String,
    },

    /// A frame arrived that violated a channel-local invariant the peer is
    /// responsible for upholding (a second `basic.deliver` before the first
    /// finished, a body frame overshooting the declared `body_size`, ...).
    #[error("unexpected frame: {reason}")]
    UnexpectedFrame {
        /// What invariant the frame violated.
        reason: String,
    },
}

/// Errors scoped to a single [`crate::channel::Channel`]; the server signals
/// these with a soft `channel.close` that does not affect sibling channels.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    /// The server closed this channel.
    #[error("channel closed by peer: {reply_code} {reply_text}")]
    ClosedByPeer {
        /// Reply code from `channel.close`.
        reply_code: u16,
        /// Human-readable reason from `channel.close`.
        reply_text: String,
    },

    /// A caller tried to use a channel that is already closed.
    #[error("channel is closed")]
    AlreadyClosed,

    /// `basic.publish` supplied a `priority` outside `0..=9`.
    #[error("invalid priority {priority}, must be 0..=9")]
    InvalidPriority {
        /// The offending value.
        priority: u8,
    },

    /// The owning connection is gone.
    #[error("connection is closed")]
    ConnectionClosed,

    /// A `call_api` request timed out waiting for the server's reply.
    #[error("timed out waiting for a reply to {method}")]
    ReplyTimeout {
        /// Dotted name of the method whose reply never arrived.
        method: String,
    },

    /// A caller-supplied argument failed a local wire-level assertion
    /// (exchange name charset/length, a `shortstr` too long, ...) before
    /// anything was written to the socket.
    #[error("invalid argument: {0}")]
    Protocol(#[from] ProtocolError),
}
