//! `ConsoleClient` builder and facade.
//!
//! This is the entry point for a console front end. It wires the layers
//! together around one shared session: storage → session → transport →
//! auth / guard / presence.

use std::sync::Arc;

use medconsole_presence::{ConnectOutcome, PresenceChannel, PresenceReader};
use medconsole_session::{Claims, KeyValueStore, SessionManager};
use medconsole_transport::{AuthorizedTransport, LoggingNavigator, Navigator};

use crate::auth::AuthService;
use crate::config::ConsoleConfig;
use crate::guard::RouteGuard;
use crate::ConsoleError;

/// Builder for a [`ConsoleClient`].
///
/// # Example
///
/// ```rust,no_run
/// use medconsole::prelude::*;
///
/// # fn run() -> Result<(), ConsoleError> {
/// let client = ConsoleClient::builder()
///     .config(ConsoleConfig::from_env()?)
///     .navigator(|route: &str| println!("navigate to {route}"))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ConsoleClientBuilder {
    config: ConsoleConfig,
    store: Option<Arc<dyn KeyValueStore>>,
    navigator: Option<Arc<dyn Navigator>>,
    http: Option<reqwest::Client>,
}

impl ConsoleClientBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ConsoleConfig::default(),
            store: None,
            navigator: None,
            http: None,
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: ConsoleConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the API base URL, keeping the rest of the configuration.
    pub fn api_base_url(mut self, url: &str) -> Self {
        self.config.api_base_url = url.to_string();
        self
    }

    /// Uses `store` instead of the backend the configuration selects.
    pub fn store(mut self, store: impl KeyValueStore) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Sets where login and logout redirects go. Defaults to
    /// [`LoggingNavigator`].
    pub fn navigator(mut self, navigator: impl Navigator) -> Self {
        self.navigator = Some(Arc::new(navigator));
        self
    }

    /// Uses an existing `reqwest` client for API calls.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Validates the configuration and wires the client.
    pub fn build(self) -> Result<ConsoleClient, ConsoleError> {
        self.config.validate()?;

        let store = self.store.unwrap_or_else(|| self.config.storage());
        let session = SessionManager::with_shared_store(store);
        let navigator = self
            .navigator
            .unwrap_or_else(|| Arc::new(LoggingNavigator));
        let transport = AuthorizedTransport::with_client(
            &self.config.api_base_url,
            self.http.unwrap_or_default(),
            session.clone(),
            navigator,
        )?;
        let presence = PresenceChannel::with_options(
            &self.config.api_base_url,
            &self.config.socket_path,
            session.clone(),
            self.config.reconnect.clone(),
        )?;

        tracing::debug!(api = %self.config.api_base_url, "console client built");

        Ok(ConsoleClient {
            config: Arc::new(self.config),
            auth: AuthService::new(transport.clone()),
            guard: RouteGuard::new(session.clone()),
            presence: Arc::new(presence),
            session,
            transport,
        })
    }
}

impl Default for ConsoleClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The console's client layer: one session shared by every component.
///
/// Cheap to clone; clones share the session, the HTTP pool and the
/// presence channel.
#[derive(Debug, Clone)]
pub struct ConsoleClient {
    config: Arc<ConsoleConfig>,
    session: SessionManager,
    transport: AuthorizedTransport,
    auth: AuthService,
    guard: RouteGuard,
    presence: Arc<PresenceChannel>,
}

impl ConsoleClient {
    /// Creates a new builder.
    pub fn builder() -> ConsoleClientBuilder {
        ConsoleClientBuilder::new()
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// The transport every API call should go through.
    pub fn transport(&self) -> &AuthorizedTransport {
        &self.transport
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn guard(&self) -> &RouteGuard {
        &self.guard
    }

    pub fn presence(&self) -> &PresenceChannel {
        &self.presence
    }

    /// A read-only handle on the live presence state.
    pub fn subscribe_presence(&self) -> PresenceReader {
        self.presence.subscribe()
    }

    /// Signs in and, on success, opens the presence channel.
    pub async fn login(&self, email: &str, password: &str) -> Result<Claims, ConsoleError> {
        let claims = self.auth.login(email, password).await?;
        self.presence.connect();
        Ok(claims)
    }

    /// Closes the presence channel, then ends the session.
    pub async fn logout(&self) -> Result<(), ConsoleError> {
        self.presence.disconnect().await;
        self.auth.logout()?;
        Ok(())
    }

    /// Opens the presence channel for a session restored from storage.
    pub fn resume(&self) -> ConnectOutcome {
        if !self.session.is_authenticated() {
            tracing::debug!("no stored session to resume");
            return ConnectOutcome::NoToken;
        }
        self.presence.connect()
    }
}
