//! ID token claim extraction
//!
//! The token response comes straight from Google's token endpoint over TLS,
//! so the ID token payload is decoded without signature verification. It is
//! only used to learn who the credential belongs to before the profile fetch.

use base64::engine::general_purpose;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use log::warn;
use serde::Deserialize;

use super::OAuthError;

const GOOGLE_ISSUERS: [&str; 2] = ["https://accounts.google.com", "accounts.google.com"];

/// `aud` may be a single client ID or a list
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    #[must_use]
    pub fn contains(&self, client_id: &str) -> bool {
        match self {
            Self::Single(aud) => aud == client_id,
            Self::Multiple(auds) => auds.iter().any(|aud| aud == client_id),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdTokenClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub aud: Option<Audience>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl IdTokenClaims {
    /// Decode the payload segment of a compact JWT
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::IdToken`] if the token is not a three-part JWT,
    /// the payload is not base64url JSON, or `sub` is missing
    pub fn decode(id_token: &str) -> Result<Self, OAuthError> {
        let mut parts = id_token.split('.');
        let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(payload), Some(_), None) => payload,
            _ => {
                return Err(OAuthError::IdToken(
                    "ID token is not a compact JWT".to_string(),
                ))
            }
        };

        let raw = general_purpose::URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| OAuthError::IdToken(format!("Failed to decode ID token: {e}")))?;
        let claims: Self = serde_json::from_slice(&raw)
            .map_err(|e| OAuthError::IdToken(format!("Failed to parse ID token claims: {e}")))?;

        if claims.sub.is_empty() {
            return Err(OAuthError::IdToken(
                "Missing or invalid 'sub' claim in ID token".to_string(),
            ));
        }
        Ok(claims)
    }

    /// Problems with issuer, audience or expiry; these are reported, not enforced
    #[must_use]
    pub fn validation_warnings(&self, client_id: &str, now: DateTime<Utc>) -> Vec<String> {
        let mut warnings = Vec::new();

        match self.iss.as_deref() {
            Some(iss) if GOOGLE_ISSUERS.contains(&iss) => {}
            other => warnings.push(format!("unexpected issuer {other:?}")),
        }
        match &self.aud {
            Some(aud) if aud.contains(client_id) => {}
            other => warnings.push(format!("audience {other:?} does not include client ID")),
        }
        match self.exp {
            Some(exp) if exp > now.timestamp() => {}
            other => warnings.push(format!("ID token expired (exp {other:?})")),
        }

        warnings
    }

    /// Log each validation warning for this token
    pub fn log_warnings(&self, client_id: &str, now: DateTime<Utc>) {
        for warning in self.validation_warnings(client_id, now) {
            warn!("ID token for subject {}: {warning}", self.sub);
        }
    }
}
