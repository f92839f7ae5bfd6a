//! Error types for the presence layer.

use medconsole_protocol::ProtocolError;
use medconsole_transport::TransportError;

/// Errors raised while setting up or running the presence socket.
///
/// Only [`PresenceError::InvalidEndpoint`] ever reaches a caller; the rest
/// end one socket session and are logged by the channel task.
#[derive(Debug, thiserror::Error)]
pub enum PresenceError {
    /// The API base URL cannot be turned into a socket endpoint.
    #[error("invalid presence endpoint: {0}")]
    InvalidEndpoint(String),

    /// Dialing, sending, or receiving on the socket failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An outbound packet could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
