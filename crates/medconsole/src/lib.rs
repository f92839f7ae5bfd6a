//! # medconsole
//!
//! Client layer for the medical admin console.
//!
//! Four primitives carry every screen of the console:
//!
//! - the session ([`SessionManager`](medconsole_session::SessionManager)):
//!   the stored token and the identity decoded from it
//! - the authorized transport
//!   ([`AuthorizedTransport`](medconsole_transport::AuthorizedTransport)):
//!   every API call, with one uniform recovery on 401
//! - sign-in ([`AuthService`]) and the [`RouteGuard`]
//! - the presence channel
//!   ([`PresenceChannel`](medconsole_presence::PresenceChannel)):
//!   live user and doctor counts over a socket
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medconsole::prelude::*;
//!
//! # async fn run() -> Result<(), ConsoleError> {
//! let client = ConsoleClient::builder()
//!     .api_base_url("http://localhost:4000")
//!     .build()?;
//!
//! client.login("admin@example.com", "secret").await?;
//! let doctors: serde_json::Value = client.transport().get("/doctor/get-all").await?;
//! println!("{doctors}");
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
mod config;
mod error;
mod guard;
mod logging;

pub use auth::{AuthService, LOGIN_PATH, LoginError, LoginResponse};
pub use client::{ConsoleClient, ConsoleClientBuilder};
pub use config::{
    ConfigError, ConsoleConfig, DEFAULT_API_BASE_URL, ENV_API_BASE_URL, ENV_RECONNECT_ATTEMPTS,
    ENV_SOCKET_PATH, ENV_STORAGE_PATH,
};
pub use error::ConsoleError;
pub use guard::{GuardDecision, RouteGuard};
pub use logging::init_tracing;

pub use medconsole_presence as presence;
pub use medconsole_protocol as protocol;
pub use medconsole_session as session;
pub use medconsole_transport as transport;

/// Everything a console front end usually needs.
pub mod prelude {
    pub use crate::{
        AuthService, ConsoleClient, ConsoleClientBuilder, ConsoleConfig, ConsoleError,
        GuardDecision, LoginError, RouteGuard, init_tracing,
    };
    pub use medconsole_presence::{
        ChannelStatus, ConnectOutcome, PresenceChannel, PresenceReader, PresenceState,
        ReconnectPolicy,
    };
    pub use medconsole_session::{
        Claims, FileStore, KeyValueStore, MemoryStore, NullStore, SessionManager,
    };
    pub use medconsole_transport::{
        AuthorizedTransport, DASHBOARD_ROUTE, Form, LOGIN_ROUTE, ListQuery, LoggingNavigator,
        Navigator, RequestOptions, TransportError,
    };
}
