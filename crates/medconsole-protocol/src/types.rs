//! Frame types for the presence connection.
//!
//! Two layers share one WebSocket text frame:
//!
//! ```text
//! "4" "2" "/admin," "7" ["online_stats",{"users":3}]
//!  │   │     │       │   └─ JSON arguments
//!  │   │     │       └─ ack id (optional)
//!  │   │     └─ namespace (optional, default "/")
//!  │   └─ Socket.IO packet type (event)
//!  └─ Engine.IO packet type (message)
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtocolError;

/// The namespace every presence event travels on.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Name of the server event carrying a presence snapshot.
pub const ONLINE_STATS_EVENT: &str = "online_stats";

// ---------------------------------------------------------------------------
// Engine.IO
// ---------------------------------------------------------------------------

/// Parameters the server announces in its open packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    pub sid: String,
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Milliseconds between server pings.
    pub ping_interval: u64,
    /// Milliseconds the server waits for a pong.
    pub ping_timeout: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_payload: Option<u64>,
}

/// One Engine.IO packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// `0`: session parameters, first frame from the server.
    Open(OpenHandshake),
    /// `1`: transport is closing.
    Close,
    /// `2`: heartbeat; must be answered with a pong carrying the same data.
    Ping(Option<String>),
    /// `3`: heartbeat reply.
    Pong(Option<String>),
    /// `4`: a Socket.IO packet.
    Message(SocketPacket),
    /// `5`: transport upgrade (never sent on a websocket-only connection).
    Upgrade,
    /// `6`: no-op.
    Noop,
}

// ---------------------------------------------------------------------------
// Socket.IO
// ---------------------------------------------------------------------------

/// One Socket.IO packet carried inside an Engine.IO message.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// `0`: namespace connect. From the client: a request (optionally with
    /// auth data). From the server: the acceptance, usually `{"sid": ..}`.
    Connect {
        namespace: String,
        data: Option<Value>,
    },
    /// `1`: namespace disconnect.
    Disconnect { namespace: String },
    /// `2`: a named event with JSON arguments.
    Event {
        namespace: String,
        ack_id: Option<u64>,
        name: String,
        args: Vec<Value>,
    },
    /// `3`: acknowledgement of an event.
    Ack {
        namespace: String,
        ack_id: u64,
        args: Vec<Value>,
    },
    /// `4`: the server refused the namespace connect.
    ConnectError { namespace: String, message: String },
}

impl SocketPacket {
    /// A connect request for the default namespace.
    pub fn connect() -> Self {
        Self::Connect {
            namespace: DEFAULT_NAMESPACE.to_string(),
            data: None,
        }
    }

    pub fn namespace(&self) -> &str {
        match self {
            Self::Connect { namespace, .. }
            | Self::Disconnect { namespace }
            | Self::Event { namespace, .. }
            | Self::Ack { namespace, .. }
            | Self::ConnectError { namespace, .. } => namespace,
        }
    }
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// One aggregate presence push from the server.
///
/// Every field is optional on the wire. A field the server leaves out means
/// "unchanged", not "zero".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctors: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doctor_ids: Option<Vec<String>>,
}

/// What a decoded frame means to the presence channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// Engine.IO session opened; the client should request the namespace.
    Opened(OpenHandshake),
    /// The namespace connect was accepted.
    Connected,
    /// The server ended the namespace or the transport.
    Disconnected,
    /// The server refused the connection.
    ConnectError(String),
    /// Heartbeat that needs a pong.
    Ping(Option<String>),
    /// A presence snapshot.
    Presence(PresenceSnapshot),
    /// Any other event; the channel ignores it.
    Other(String),
    /// Frames with no effect on the channel (pongs, acks, noops).
    Ignored,
}

impl TryFrom<Packet> for ServerEvent {
    type Error = ProtocolError;

    fn try_from(packet: Packet) -> Result<Self, Self::Error> {
        Ok(match packet {
            Packet::Open(open) => Self::Opened(open),
            Packet::Close => Self::Disconnected,
            Packet::Ping(data) => Self::Ping(data),
            Packet::Pong(_) | Packet::Upgrade | Packet::Noop => Self::Ignored,
            Packet::Message(SocketPacket::Connect { .. }) => Self::Connected,
            Packet::Message(SocketPacket::Disconnect { .. }) => Self::Disconnected,
            Packet::Message(SocketPacket::ConnectError { message, .. }) => {
                Self::ConnectError(message)
            }
            Packet::Message(SocketPacket::Ack { .. }) => Self::Ignored,
            Packet::Message(SocketPacket::Event { name, mut args, .. }) => {
                if name != ONLINE_STATS_EVENT {
                    return Ok(Self::Other(name));
                }
                if args.is_empty() {
                    return Err(ProtocolError::InvalidMessage(format!(
                        "{ONLINE_STATS_EVENT} without a payload"
                    )));
                }
                Self::Presence(serde_json::from_value(args.swap_remove(0))?)
            }
        })
    }
}
