/// Errors that can occur in the transport layer.
///
/// `Unauthorized` and `Http` are the two classified outcomes of an API
/// call; both are handed to the caller untouched. The socket variants are
/// what the presence channel logs as connection errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The API answered 401. The session has already been cleared and the
    /// login redirect issued by the time the caller sees this.
    #[error("Unauthorized - Token expired or invalid")]
    Unauthorized,

    /// Any other non-success status. `message` comes from the error body
    /// when it has one, otherwise it is `HTTP <status>`.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The request never produced a response (DNS, connect, TLS, reset).
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// The base URL or a request path did not form a valid URL.
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A header name or value could not be encoded.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// The request body could not be serialized.
    #[error("request body encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The response body did not match the expected type.
    #[error("response body decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// Opening a socket connection failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// The socket was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending on a socket failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving from a socket failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}

impl TransportError {
    /// The HTTP status behind a classified API failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}
