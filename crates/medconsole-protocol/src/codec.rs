//! Text-frame codec for Engine.IO v4 and Socket.IO v4 packets.
//!
//! Only the text encoding is supported. The presence channel runs on a
//! websocket-only transport, so there is no long-polling payload
//! concatenation and no binary attachment handling.

use serde_json::Value;

use crate::types::{DEFAULT_NAMESPACE, Packet, SocketPacket};
use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Engine.IO layer
// ---------------------------------------------------------------------------

impl Packet {
    /// Decodes one WebSocket text frame.
    ///
    /// # Errors
    /// [`ProtocolError::Empty`] for an empty frame,
    /// [`ProtocolError::UnknownType`] for an unknown leading digit, and
    /// payload errors from the Socket.IO layer.
    pub fn decode(frame: &str) -> Result<Self, ProtocolError> {
        let kind = frame.chars().next().ok_or(ProtocolError::Empty)?;
        let rest = &frame[kind.len_utf8()..];
        match kind {
            '0' => Ok(Self::Open(serde_json::from_str(rest)?)),
            '1' => Ok(Self::Close),
            '2' => Ok(Self::Ping(non_empty(rest))),
            '3' => Ok(Self::Pong(non_empty(rest))),
            '4' => Ok(Self::Message(SocketPacket::decode(rest)?)),
            '5' => Ok(Self::Upgrade),
            '6' => Ok(Self::Noop),
            other => Err(ProtocolError::UnknownType {
                layer: "engine",
                kind: other,
            }),
        }
    }

    /// Encodes the packet as a WebSocket text frame.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(match self {
            Self::Open(open) => format!("0{}", serde_json::to_string(open)?),
            Self::Close => "1".to_string(),
            Self::Ping(data) => format!("2{}", data.as_deref().unwrap_or_default()),
            Self::Pong(data) => format!("3{}", data.as_deref().unwrap_or_default()),
            Self::Message(socket) => format!("4{}", socket.encode()),
            Self::Upgrade => "5".to_string(),
            Self::Noop => "6".to_string(),
        })
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

// ---------------------------------------------------------------------------
// Socket.IO layer
// ---------------------------------------------------------------------------

impl SocketPacket {
    /// Decodes the part of a frame after the Engine.IO `4`.
    ///
    /// Layout: `<type>[<namespace>,][<ack id>][<json>]`.
    pub fn decode(s: &str) -> Result<Self, ProtocolError> {
        let kind = s.chars().next().ok_or_else(|| {
            ProtocolError::InvalidMessage("empty socket packet".into())
        })?;
        if matches!(kind, '5' | '6') {
            return Err(ProtocolError::Unsupported("binary event or ack"));
        }
        let mut rest = &s[kind.len_utf8()..];

        let namespace = if rest.starts_with('/') {
            let (ns, tail) = match rest.find(',') {
                Some(i) => (&rest[..i], &rest[i + 1..]),
                None => (rest, ""),
            };
            rest = tail;
            ns.to_string()
        } else {
            DEFAULT_NAMESPACE.to_string()
        };

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let ack_id = if digits > 0 {
            Some(rest[..digits].parse::<u64>().map_err(|e| {
                ProtocolError::InvalidMessage(format!("bad ack id: {e}"))
            })?)
        } else {
            None
        };
        rest = &rest[digits..];

        let data: Option<Value> = if rest.is_empty() {
            None
        } else {
            Some(serde_json::from_str(rest)?)
        };

        match kind {
            '0' => Ok(Self::Connect { namespace, data }),
            '1' => Ok(Self::Disconnect { namespace }),
            '2' => {
                let mut items = match data {
                    Some(Value::Array(items)) if !items.is_empty() => items,
                    _ => {
                        return Err(ProtocolError::InvalidMessage(
                            "event payload must be a non-empty array".into(),
                        ));
                    }
                };
                let name = match items.remove(0) {
                    Value::String(name) => name,
                    _ => {
                        return Err(ProtocolError::InvalidMessage(
                            "event name must be a string".into(),
                        ));
                    }
                };
                Ok(Self::Event {
                    namespace,
                    ack_id,
                    name,
                    args: items,
                })
            }
            '3' => {
                let ack_id = ack_id.ok_or_else(|| {
                    ProtocolError::InvalidMessage("ack without an id".into())
                })?;
                let args = match data {
                    Some(Value::Array(items)) => items,
                    None => Vec::new(),
                    Some(_) => {
                        return Err(ProtocolError::InvalidMessage(
                            "ack payload must be an array".into(),
                        ));
                    }
                };
                Ok(Self::Ack {
                    namespace,
                    ack_id,
                    args,
                })
            }
            '4' => {
                let message = match data {
                    Some(Value::Object(map)) => map
                        .get("message")
                        .and_then(Value::as_str)
                        .unwrap_or("connection refused")
                        .to_string(),
                    Some(Value::String(message)) => message,
                    _ => "connection refused".to_string(),
                };
                Ok(Self::ConnectError { namespace, message })
            }
            other => Err(ProtocolError::UnknownType {
                layer: "socket",
                kind: other,
            }),
        }
    }

    /// Encodes the packet without the Engine.IO `4` prefix.
    pub fn encode(&self) -> String {
        let (kind, ack_id, data) = match self {
            Self::Connect { data, .. } => ('0', None, data.clone()),
            Self::Disconnect { .. } => ('1', None, None),
            Self::Event {
                ack_id, name, args, ..
            } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Value::String(name.clone()));
                items.extend(args.iter().cloned());
                ('2', *ack_id, Some(Value::Array(items)))
            }
            Self::Ack { ack_id, args, .. } => {
                ('3', Some(*ack_id), Some(Value::Array(args.clone())))
            }
            Self::ConnectError { message, .. } => (
                '4',
                None,
                Some(serde_json::json!({ "message": message })),
            ),
        };

        let mut out = String::new();
        out.push(kind);
        let namespace = self.namespace();
        if namespace != DEFAULT_NAMESPACE {
            out.push_str(namespace);
            out.push(',');
        }
        if let Some(id) = ack_id {
            out.push_str(&id.to_string());
        }
        if let Some(data) = data {
            out.push_str(&data.to_string());
        }
        out
    }
}
