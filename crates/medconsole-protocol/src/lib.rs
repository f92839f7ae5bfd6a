//! Wire protocol for the medconsole presence channel.
//!
//! The API pushes presence over Socket.IO v4 on top of Engine.IO v4. This
//! crate is the "language" of that connection:
//!
//! - **Types** ([`Packet`], [`SocketPacket`], [`PresenceSnapshot`],
//!   [`ServerEvent`]): what travels in a text frame and what it means
//! - **Codec** ([`Packet::decode`], [`Packet::encode`]): text frames to
//!   packets and back
//! - **Errors** ([`ProtocolError`]): frames that could not be understood
//!
//! # Architecture
//!
//! ```text
//! Transport (text frames) → Protocol (Packet → ServerEvent) → Presence (state)
//! ```

mod codec;
mod error;
mod types;

pub use error::ProtocolError;
pub use types::{
    DEFAULT_NAMESPACE, ONLINE_STATS_EVENT, OpenHandshake, Packet, PresenceSnapshot,
    ServerEvent, SocketPacket,
};

/// Decodes a text frame straight into the event it represents.
pub fn decode_event(frame: &str) -> Result<ServerEvent, ProtocolError> {
    Packet::decode(frame)?.try_into()
}
