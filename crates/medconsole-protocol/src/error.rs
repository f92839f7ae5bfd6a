//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means a frame could not be understood. Nothing
//! here knows about sockets or sessions.

/// Errors that can occur while decoding or encoding presence frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// An empty text frame.
    #[error("empty frame")]
    Empty,

    /// The leading digit is not a known Engine.IO or Socket.IO packet type.
    #[error("unknown packet type {kind:?} at {layer} layer")]
    UnknownType { layer: &'static str, kind: char },

    /// The JSON part of a frame did not parse or had the wrong shape.
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// The frame parsed but breaks a protocol rule (e.g. an event with no
    /// name, or a namespace with no terminating comma).
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Binary packets are not used by the presence channel.
    #[error("unsupported packet: {0}")]
    Unsupported(&'static str),
}
