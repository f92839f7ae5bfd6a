//! Decoded identity carried inside a session token.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role name granted to console operators.
pub const ADMIN_ROLE: &str = "admin";

/// The identity claims decoded from a bearer token's payload.
///
/// This is also the shape persisted under the `user_info` key, so a stored
/// identity round-trips through serde unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject identifier of the authenticated account.
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    /// Expiry as seconds since the Unix epoch.
    pub exp: u64,
    /// Issued-at as seconds since the Unix epoch, when the issuer sets it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<u64>,
}

impl Claims {
    /// Case-insensitive comparison against the role claim.
    pub fn has_role(&self, role: &str) -> bool {
        self.role.eq_ignore_ascii_case(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMIN_ROLE)
    }

    /// True when `exp` is at or before `now` (seconds since the epoch).
    pub fn is_expired_at(&self, now: u64) -> bool {
        self.exp <= now
    }
}

/// Loosely-typed payload as issuers actually emit it.
///
/// Different backends name the subject differently and some emit numeric
/// claims as floats, so the payload is parsed leniently and then narrowed
/// into [`Claims`].
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawClaims {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default, rename = "_id")]
    underscore_id: Option<Value>,
    #[serde(default, rename = "userId")]
    user_id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    exp: Option<Value>,
    #[serde(default)]
    iat: Option<Value>,
}

impl RawClaims {
    /// Narrows the raw payload, returning `None` when the subject or the
    /// expiry is missing or unusable.
    pub(crate) fn into_claims(self) -> Option<Claims> {
        let id = [self.id, self.sub, self.underscore_id, self.user_id]
            .into_iter()
            .flatten()
            .find_map(|v| scalar_to_string(&v))?;
        let exp = self.exp.as_ref().and_then(seconds)?;
        Some(Claims {
            id,
            name: self.name.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            role: self.role.unwrap_or_default(),
            exp,
            iat: self.iat.as_ref().and_then(seconds),
        })
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn seconds(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64().filter(|f| f.is_finite() && *f >= 0.0).map(|f| f as u64)
        }),
        _ => None,
    }
}
