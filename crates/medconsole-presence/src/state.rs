//! Channel status and the shared presence state.

use medconsole_protocol::PresenceSnapshot;

// ---------------------------------------------------------------------------
// ChannelStatus
// ---------------------------------------------------------------------------

/// Lifecycle of the presence socket.
///
/// ```text
/// Disconnected → Connecting → Connected → Disconnected
/// ```
///
/// - **Disconnected**: no socket, or the last one ended.
/// - **Connecting**: dialing, or waiting for the server to accept the
///   namespace.
/// - **Connected**: the server accepted the namespace; snapshots flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ChannelStatus {
    /// Returns `true` while a socket is being dialed or is live.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl std::fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected => write!(f, "Connected"),
        }
    }
}

// ---------------------------------------------------------------------------
// PresenceState
// ---------------------------------------------------------------------------

/// The latest known presence picture, shared by every reader.
///
/// Only the channel writes it. Readers get a copy through
/// [`PresenceReader`](crate::PresenceReader).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceState {
    pub status: ChannelStatus,
    pub user_count: u64,
    pub doctor_count: u64,
    pub user_ids: Vec<String>,
    pub doctor_ids: Vec<String>,
}

impl PresenceState {
    pub fn is_connected(&self) -> bool {
        self.status == ChannelStatus::Connected
    }

    /// Overwrites every field the snapshot carries. Fields the server left
    /// out keep their previous value.
    pub(crate) fn apply(&mut self, snapshot: &PresenceSnapshot) {
        if let Some(users) = snapshot.users {
            self.user_count = users;
        }
        if let Some(doctors) = snapshot.doctors {
            self.doctor_count = doctors;
        }
        if let Some(ids) = &snapshot.user_ids {
            self.user_ids.clone_from(ids);
        }
        if let Some(ids) = &snapshot.doctor_ids {
            self.doctor_ids.clone_from(ids);
        }
    }
}
