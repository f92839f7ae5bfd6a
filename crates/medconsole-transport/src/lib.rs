//! Transport layer for the medconsole client.
//!
//! Two ways out of the process, both carrying the session token:
//!
//! - [`AuthorizedTransport`]: every API call. Injects credentials,
//!   classifies responses, and performs the single cross-cutting recovery
//!   (clear session + redirect to login on 401).
//! - [`Connection`]: a text-frame duplex socket, implemented by
//!   [`WebSocketConnection`], used by the presence channel.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket client via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
mod http;
mod navigator;
mod request;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use http::{ACCESS_TOKEN_HEADER, AuthorizedTransport};
pub use navigator::{DASHBOARD_ROUTE, LOGIN_ROUTE, LoggingNavigator, Navigator};
pub use request::{ListQuery, RequestBody, RequestOptions};
#[cfg(feature = "websocket")]
pub use websocket::WebSocketConnection;

pub use reqwest::multipart::{Form, Part};
pub use reqwest::Method;

use std::fmt;

/// Opaque identifier for a socket connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A single duplex connection exchanging text frames.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends one text frame to the remote peer.
    async fn send(&self, frame: &str) -> Result<(), Self::Error>;

    /// Receives the next text frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<String>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
