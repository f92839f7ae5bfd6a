//! Error types for the session layer.

/// Errors raised by a [`KeyValueStore`](crate::KeyValueStore) backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file exists but does not hold a JSON object of strings.
    #[error("storage is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),

    /// The in-memory store's lock was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Errors that can occur while saving or clearing a session.
///
/// Reads never fail: a missing, unreadable, or corrupt value is reported as
/// "no session" so callers fall into the anonymous branch.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The storage gateway rejected the write.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The identity could not be serialized for storage.
    #[error("identity serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),
}
