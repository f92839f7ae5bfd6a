//! Unverified decoding of bearer tokens.
//!
//! The client reads a token's payload only to drive the UI: hide the console
//! from non-admins and drop a session whose `exp` has passed. Signatures are
//! never checked here; the API verifies every request and remains the only
//! authority on whether a token is valid.

use std::collections::HashSet;
use std::time::{SystemTime, UNIX_EPOCH};

use base64ct::{Base64UrlUnpadded, Encoding};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};

use crate::claims::{Claims, RawClaims};

/// Decodes the payload of a `header.payload.signature` token.
///
/// Returns `None` for anything that is not a JWT with a JSON payload
/// carrying a subject and an expiry. Padded segments are accepted.
pub fn decode(token: &str) -> Option<Claims> {
    let unpadded: String = token.chars().filter(|&c| c != '=').collect();
    let key = DecodingKey::from_secret(&[]);

    match jsonwebtoken::decode::<RawClaims>(&unpadded, &key, &payload_only()) {
        Ok(data) => data.claims.into_claims(),
        Err(e) => {
            tracing::debug!(error = %e, "token is not a readable JWT");
            None
        }
    }
}

/// Reads the claims without checking the signature or any registered claim.
/// Expiry is judged by [`Claims::is_expired_at`] instead.
fn payload_only() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims = HashSet::new();
    validation
}

/// True if the token's expiry is at or before now, or if it cannot be
/// decoded at all.
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, now_secs())
}

/// [`is_expired`] against an explicit clock reading.
pub fn is_expired_at(token: &str, now: u64) -> bool {
    decode(token).is_none_or(|claims| claims.is_expired_at(now))
}

/// Case-insensitive role check; undecodable tokens have no role.
pub fn has_role(token: &str, role: &str) -> bool {
    decode(token).is_some_and(|claims| claims.has_role(role))
}

/// Builds a token around `payload` with an empty signature.
///
/// Servers reject such tokens; this exists for fixtures and local tooling
/// that need something [`decode`] understands.
pub fn encode_unsigned(payload: &serde_json::Value) -> String {
    let header = Base64UrlUnpadded::encode_string(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = Base64UrlUnpadded::encode_string(payload.to_string().as_bytes());
    format!("{header}.{body}.")
}

pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
