//! The façade's own error type: a thin sum of the two `bunnyhop-core` error
//! scopes plus the TCP-dial failures `bunnyhop-core` never sees.

use std::io;

use bunnyhop_core::{ChannelError, ConnectionError};
use thiserror::Error;

/// Errors surfaced by this crate's dialing and command helpers.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Dialing the broker's TCP socket failed.
    #[error("failed to connect to {host}:{port}: {source}")]
    Dial {
        /// Host that was dialed.
        host: String,
        /// Port that was dialed.
        port: u16,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The connection-level handshake or runtime failed.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A channel-level command failed.
    #[error(transparent)]
    Channel(#[from] ChannelError),
}
