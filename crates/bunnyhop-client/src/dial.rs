//! Dialing the broker's plain TCP socket and handing it to
//! [`bunnyhop_core::Connection::negotiate`]. TLS is explicitly out of scope
//! (spec.md's Non-goals) — a caller who needs it dials their own stream and
//! calls `Connection::negotiate` directly, since that is generic over any
//! `AsyncRead + AsyncWrite` socket.

use bunnyhop_core::{Connection, ConnectionOptions};
use tokio::net::TcpStream;

use crate::error::ClientError;

/// Dial `options.host:options.port` and run the AMQP handshake over it.
///
/// # Errors
///
/// [`ClientError::Dial`] if the TCP connect fails; [`ClientError::Connection`]
/// if the handshake fails.
pub async fn connect(options: ConnectionOptions) -> Result<Connection<TcpStream>, ClientError> {
    let socket = TcpStream::connect((options.host.as_str(), options.port)).await.map_err(|source| ClientError::Dial {
        host: options.host.clone(),
        port: options.port,
        source,
    })?;
    socket.set_nodelay(true).map_err(|source| ClientError::Dial { host: options.host.clone(), port: options.port, source })?;
    Connection::negotiate(socket, options).await.map_err(ClientError::from)
}
