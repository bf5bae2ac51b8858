//! Bearer credential and its claims
//!
//! A credential is a compact three-segment token. Only the middle segment is
//! read: a base64-encoded JSON object carrying `exp` and optionally `sub`.
//! Signatures are the backend's concern and are never checked here.

use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::SessionError;
use crate::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Expiry, seconds since the Unix epoch
    #[serde(default)]
    pub exp: Option<i64>,
    /// Subject identifier
    #[serde(default)]
    pub sub: Option<String>,
}

impl Claims {
    pub fn is_expired_at(&self, now: i64) -> bool {
        is_expired(self.exp, now)
    }
}

/// A credential without an expiry is treated as expired.
pub fn is_expired(exp: Option<i64>, now: i64) -> bool {
    match exp {
        Some(exp) => now > exp,
        None => true,
    }
}

/// Opaque bearer token issued by the backend at login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the claims segment, failing closed.
    ///
    /// Malformed tokens are logged and yield `None`; callers treat that the
    /// same as an expired credential.
    pub fn claims(&self) -> Option<Claims> {
        match decode_claims(&self.0) {
            Ok(claims) => Some(claims),
            Err(e) => {
                tracing::warn!(error = %e, "Invalid credential");
                None
            }
        }
    }

    pub fn expires_at(&self) -> Option<i64> {
        self.claims().and_then(|c| c.exp)
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.claims().map_or(true, |c| c.is_expired_at(now))
    }

    /// Value for an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Credential").field(&mask(&self.0)).finish()
    }
}

fn mask(token: &str) -> String {
    if token.len() <= 8 {
        return "****".to_string();
    }
    let head: String = token.chars().take(4).collect();
    format!("{head}…")
}

fn decode_claims(token: &str) -> Result<Claims> {
    let mut segments = token.split('.');
    let (Some(_), Some(payload), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(SessionError::MalformedCredential(
            "expected three segments".to_string(),
        ));
    };

    // Backends differ on alphabet and padding
    let payload = payload.trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .map_err(|e| SessionError::MalformedCredential(e.to_string()))?;

    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
pub(crate) fn unsigned_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}
