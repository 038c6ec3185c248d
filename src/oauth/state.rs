//! Opaque OAuth state token
//!
//! The state parameter carries the spreadsheet the user asked for across the
//! provider redirect, so the callback can resume without server-side session
//! storage. Wire format: base64url(JSON `{nonce, spreadsheet_id}`), optionally
//! followed by `.` and an HMAC-SHA256 tag when a state secret is configured.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::settings::GoogleSettings;
use crate::utils::crypto::{generate_nonce, sign_payload, verify_payload};

/// Random bytes in every nonce
pub const NONCE_BYTES: usize = 16;

/// Padded URL-safe alphabet on encode; accepts padded and unpadded input
const STATE_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// State round-tripped through the provider redirect
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OAuthState {
    pub nonce: String,
    pub spreadsheet_id: String,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to decode state string: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("failed to parse JSON from decoded state: {0}")]
    Payload(#[source] serde_json::Error),

    #[error("state signature is missing or invalid")]
    Signature,

    #[error("failed to serialize state: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Encodes and decodes [`OAuthState`] tokens
#[derive(Clone, Default)]
pub struct StateCodec {
    secret: Option<Vec<u8>>,
}

impl StateCodec {
    /// Codec producing unsigned tokens
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec signing tokens with `secret`
    #[must_use]
    pub fn with_secret(secret: &[u8]) -> Self {
        Self {
            secret: Some(secret.to_vec()),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &GoogleSettings) -> Self {
        match &settings.state_secret {
            Some(secret) => Self::with_secret(secret.as_bytes()),
            None => Self::new(),
        }
    }

    #[must_use]
    pub fn is_signed(&self) -> bool {
        self.secret.is_some()
    }

    /// Build a fresh state for `spreadsheet_id` and encode it
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Serialize`] if the state cannot be serialized
    pub fn encode(&self, spreadsheet_id: &str) -> Result<String, DecodeError> {
        let state = OAuthState {
            nonce: generate_nonce(NONCE_BYTES),
            spreadsheet_id: spreadsheet_id.to_string(),
        };
        let raw = serde_json::to_vec(&state).map_err(DecodeError::Serialize)?;
        let payload = STATE_ENGINE.encode(raw);

        let token = match &self.secret {
            Some(secret) => {
                let tag = sign_payload(secret, payload.as_bytes());
                format!("{payload}.{tag}")
            }
            None => payload,
        };
        debug!("Encoded OAuth state: length = {} chars", token.len());
        Ok(token)
    }

    /// Decode a token received on the callback
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The signature is missing or does not match (signed codecs only)
    /// - The payload is not valid base64url
    /// - The decoded payload is not a JSON state object
    pub fn decode(&self, token: &str) -> Result<OAuthState, DecodeError> {
        let token = token.trim();
        let payload = match &self.secret {
            Some(secret) => {
                let (payload, tag) = token.split_once('.').ok_or(DecodeError::Signature)?;
                if !verify_payload(secret, payload.as_bytes(), tag) {
                    return Err(DecodeError::Signature);
                }
                payload
            }
            None => token,
        };

        let raw = STATE_ENGINE.decode(payload)?;
        serde_json::from_slice(&raw).map_err(DecodeError::Payload)
    }
}
