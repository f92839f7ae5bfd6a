//! The session manager: the one owner of the stored token and identity.
//!
//! A session is never stored as its own entity. It is the pair
//! `(auth_token, user_info)` read back from the storage gateway on demand.
//!
//! ```text
//!   Anonymous ──(save_session)──→ Authenticated
//!       ↑                              │
//!       └──(clear_session / expiry detected / 401 from transport)
//! ```
//!
//! # Concurrency note
//!
//! `SessionManager` is a cheap `Clone` handle around a shared store. The
//! transport and the presence channel only read through it; writes happen
//! through [`save_session`](SessionManager::save_session) and
//! [`clear_session`](SessionManager::clear_session) alone.

use std::fmt;
use std::sync::Arc;

use crate::codec;
use crate::store::{IDENTITY_KEY, TOKEN_KEY};
use crate::{Claims, KeyValueStore, MemoryStore, NullStore, SessionError};

/// Shared handle to the persisted session.
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager").finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a manager over the given storage backend.
    pub fn new(store: impl KeyValueStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Creates a manager over an already shared backend.
    pub fn with_shared_store(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// A manager backed by process memory.
    pub fn in_memory() -> Self {
        Self::new(MemoryStore::new())
    }

    /// A manager with no durable storage. Saving is a no-op and every read
    /// reports an anonymous session.
    pub fn detached() -> Self {
        Self::new(NullStore)
    }

    /// Persists the token together with its decoded identity.
    ///
    /// Both keys are written in one batch so a reader never sees one
    /// without the other.
    pub fn save_session(
        &self,
        token: &str,
        identity: &Claims,
    ) -> Result<(), SessionError> {
        let identity_json =
            serde_json::to_string(identity).map_err(SessionError::Serialize)?;
        self.store
            .set_all(&[(TOKEN_KEY, token), (IDENTITY_KEY, &identity_json)])?;
        tracing::info!(subject = %identity.id, role = %identity.role, "session saved");
        Ok(())
    }

    /// The stored bearer token, if any.
    pub fn current_token(&self) -> Option<String> {
        match self.store.get(TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stored token");
                None
            }
        }
    }

    /// The stored identity. A value that no longer parses is treated as
    /// absent rather than surfaced as an error.
    pub fn current_identity(&self) -> Option<Claims> {
        let raw = match self.store.get(IDENTITY_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stored identity");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::warn!(error = %e, "stored identity is corrupt");
                None
            }
        }
    }

    /// Removes the token and identity. Clearing an empty session is fine.
    pub fn clear_session(&self) -> Result<(), SessionError> {
        self.store.remove_all(&[TOKEN_KEY, IDENTITY_KEY])?;
        tracing::info!("session cleared");
        Ok(())
    }

    /// Whether a usable (present and unexpired) token is stored.
    ///
    /// An expired token is cleared before returning `false`, so a stale
    /// token is never left behind for another reader.
    pub fn is_authenticated(&self) -> bool {
        let Some(token) = self.current_token() else {
            return false;
        };
        if codec::is_expired(&token) {
            tracing::info!("stored token expired");
            if let Err(e) = self.clear_session() {
                tracing::warn!(error = %e, "failed to clear expired session");
            }
            return false;
        }
        true
    }

    /// Whether the stored identity carries the admin role.
    pub fn is_admin(&self) -> bool {
        self.current_identity().is_some_and(|claims| claims.is_admin())
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::in_memory()
    }
}

// =========================================================================
// Tests
// =========================================================================
