//! Operator sign-in and sign-out.

use medconsole_session::{Claims, SessionError, codec};
use medconsole_transport::{AuthorizedTransport, DASHBOARD_ROUTE, LOGIN_ROUTE, TransportError};
use serde::{Deserialize, Serialize};

/// API path that exchanges credentials for a token.
pub const LOGIN_PATH: &str = "/auth/login";

/// Why a sign-in attempt did not produce a session.
#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    /// The API answered without an access token.
    #[error("no access token received from the server")]
    NoToken,

    /// The access token could not be decoded.
    #[error("access token is invalid")]
    InvalidToken,

    /// The account exists but is not an administrator.
    #[error("account is not an administrator")]
    NotAdmin,

    /// The session could not be saved.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The login request itself failed (bad credentials, network, ...).
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

/// Body of the login endpoint's answer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Signs operators in and out through the authorized transport.
#[derive(Debug, Clone)]
pub struct AuthService {
    transport: AuthorizedTransport,
}

impl AuthService {
    pub fn new(transport: AuthorizedTransport) -> Self {
        Self { transport }
    }

    /// Exchanges credentials for a session.
    ///
    /// Only administrator tokens are accepted. On success the token and its
    /// decoded identity are persisted and the navigator is sent to the
    /// dashboard. Nothing is persisted on any failure.
    pub async fn login(&self, email: &str, password: &str) -> Result<Claims, LoginError> {
        let response: LoginResponse = self
            .transport
            .post(LOGIN_PATH, &Credentials { email, password })
            .await?;

        let token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(LoginError::NoToken)?;
        let claims = codec::decode(&token).ok_or(LoginError::InvalidToken)?;
        if !claims.is_admin() {
            tracing::warn!(
                subject = %claims.id,
                role = %claims.role,
                "sign-in refused: not an administrator"
            );
            return Err(LoginError::NotAdmin);
        }

        self.transport.session().save_session(&token, &claims)?;
        tracing::info!(subject = %claims.id, email = %claims.email, "signed in");
        self.transport.navigator().navigate(DASHBOARD_ROUTE);
        Ok(claims)
    }

    /// Ends the session and sends the navigator to the login surface.
    pub fn logout(&self) -> Result<(), SessionError> {
        self.transport.session().clear_session()?;
        tracing::info!("signed out");
        self.transport.navigator().navigate(LOGIN_ROUTE);
        Ok(())
    }
}
