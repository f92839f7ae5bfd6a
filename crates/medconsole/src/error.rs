//! Unified error type for the medconsole client.

use medconsole_presence::PresenceError;
use medconsole_session::{SessionError, StoreError};
use medconsole_transport::TransportError;

use crate::auth::LoginError;
use crate::config::ConfigError;

/// Top-level error that wraps every layer's error.
///
/// The `#[from]` attributes let `?` lift layer errors into this one.
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// An API call failed (unauthorized, HTTP error, network).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The session could not be read or written.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The presence channel could not be set up.
    #[error(transparent)]
    Presence(#[from] PresenceError),

    /// Sign-in was refused.
    #[error(transparent)]
    Login(#[from] LoginError),

    /// The configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<StoreError> for ConsoleError {
    fn from(err: StoreError) -> Self {
        Self::Session(err.into())
    }
}

impl ConsoleError {
    /// Returns `true` if the API rejected the session's credentials.
    pub fn is_unauthorized(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_unauthorized(),
            Self::Login(LoginError::Transport(e)) => e.is_unauthorized(),
            _ => false,
        }
    }
}
