//! Client-side JWT payload decoding.
//!
//! The storefront never verifies token signatures; the backend does that on
//! every call. The payload is decoded only to show the visitor's name and
//! email and to learn the id used for chat.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// URL-safe base64 that accepts payloads with or without `=` padding.
const JWT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Keys the backend has been seen to use for the account id, in priority order.
const ID_KEYS: &[&str] = &["id", "_id", "userId", "sub"];

/// Errors that can occur when decoding a token payload.
#[derive(Debug, Error)]
pub enum ClaimsError {
    /// The token is not three dot-separated segments.
    #[error("token must have three segments")]
    Malformed,
    /// The payload segment is not valid base64url.
    #[error("payload is not base64url: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The payload is not JSON.
    #[error("payload is not JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The payload is JSON but not an object.
    #[error("payload is not a JSON object")]
    NotAnObject,
}

/// Claims read from a token payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub exp: Option<i64>,
    /// Any other claims, kept for display.
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl TokenClaims {
    /// When the token says it expires. Display only; never enforced.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    /// When the token was issued.
    #[must_use]
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.iat.and_then(|iat| DateTime::from_timestamp(iat, 0))
    }
}

/// Decode the payload of a JWT without verifying it.
///
/// # Errors
///
/// Returns an error if the token is not three segments or the payload is not
/// a base64url-encoded JSON object.
pub fn decode_claims(token: &str) -> Result<TokenClaims, ClaimsError> {
    let mut segments = token.trim().split('.');
    let (Some(_header), Some(payload), Some(_signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(ClaimsError::Malformed);
    };
    if payload.is_empty() {
        return Err(ClaimsError::Malformed);
    }

    let bytes = JWT_BASE64.decode(payload)?;
    let Value::Object(mut map) = serde_json::from_slice::<Value>(&bytes)? else {
        return Err(ClaimsError::NotAnObject);
    };

    let id = ID_KEYS
        .iter()
        .filter_map(|key| map.remove(*key))
        .find_map(|value| scalar_to_string(&value));

    Ok(TokenClaims {
        id,
        name: take_string(&mut map, "name"),
        email: take_string(&mut map, "email"),
        role: take_string(&mut map, "role"),
        iat: map.remove("iat").and_then(|v| v.as_i64()),
        exp: map.remove("exp").and_then(|v| v.as_i64()),
        extra: map,
    })
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> Option<String> {
    map.remove(key).and_then(|v| scalar_to_string(&v))
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Build an unsigned token around a JSON payload. Used by tests across the crate.
#[cfg(test)]
pub fn unsigned_token(payload: &Value) -> String {
    let header = JWT_BASE64.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = JWT_BASE64.encode(payload.to_string());
    format!("{header}.{body}.signature")
}
