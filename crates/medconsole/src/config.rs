//! Client configuration.

use std::path::PathBuf;
use std::sync::Arc;

use medconsole_presence::{DEFAULT_SOCKET_PATH, ReconnectPolicy};
use medconsole_session::{FileStore, KeyValueStore, MemoryStore};
use url::Url;

/// API host used when nothing else is configured.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:4000";

pub const ENV_API_BASE_URL: &str = "MEDCONSOLE_API_BASE_URL";
pub const ENV_STORAGE_PATH: &str = "MEDCONSOLE_STORAGE_PATH";
pub const ENV_SOCKET_PATH: &str = "MEDCONSOLE_SOCKET_PATH";
pub const ENV_RECONNECT_ATTEMPTS: &str = "MEDCONSOLE_RECONNECT_ATTEMPTS";

/// Errors raised while loading or validating a [`ConsoleConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The API base URL is not an absolute `http`/`https` URL.
    #[error("invalid API base URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The socket path is empty.
    #[error("socket path must not be empty")]
    EmptySocketPath,

    /// An environment variable holds a value that does not parse.
    #[error("invalid value {value:?} for {name}")]
    InvalidVar { name: &'static str, value: String },
}

/// Everything needed to wire a [`ConsoleClient`](crate::ConsoleClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Base URL of the API. Requests append their path to it.
    pub api_base_url: String,

    /// Where the session is persisted. `None` keeps it in memory only.
    pub storage_path: Option<PathBuf>,

    /// Socket.IO mount path on the API host.
    pub socket_path: String,

    /// Presence redial policy. Disabled by default.
    pub reconnect: ReconnectPolicy,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            storage_path: None,
            socket_path: DEFAULT_SOCKET_PATH.to_string(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ConsoleConfig {
    /// Defaults overlaid with the `MEDCONSOLE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = var(ENV_API_BASE_URL) {
            config.api_base_url = url;
        }
        if let Some(path) = var(ENV_STORAGE_PATH) {
            config.storage_path = Some(PathBuf::from(path));
        }
        if let Some(path) = var(ENV_SOCKET_PATH) {
            config.socket_path = path;
        }
        if let Some(raw) = var(ENV_RECONNECT_ATTEMPTS) {
            config.reconnect.max_attempts =
                raw.trim().parse().map_err(|_| ConfigError::InvalidVar {
                    name: ENV_RECONNECT_ATTEMPTS,
                    value: raw.clone(),
                })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the base URL and socket path.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: self.api_base_url.clone(),
            reason,
        };
        let url = Url::parse(&self.api_base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", url.scheme())));
        }
        if url.host_str().is_none() {
            return Err(invalid("missing host".to_string()));
        }
        if self.socket_path.trim().is_empty() {
            return Err(ConfigError::EmptySocketPath);
        }
        Ok(())
    }

    /// The storage backend this configuration selects.
    pub fn storage(&self) -> Arc<dyn KeyValueStore> {
        match &self.storage_path {
            Some(path) => Arc::new(FileStore::new(path.clone())),
            None => Arc::new(MemoryStore::new()),
        }
    }
}
