//! Credential persistence
//!
//! One item per user, keyed by `UserID`. Writes are single puts and the last
//! writer wins. Items carry a `TTL` so the backing table expires them.

#[cfg(feature = "dynamodb")]
pub mod dynamodb;
pub mod memory;

#[cfg(feature = "dynamodb")]
pub use dynamodb::DynamoTokenStore;
pub use memory::MemoryTokenStore;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::Credential;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to store token: {0}")]
    Write(String),

    #[error("failed to query token: {0}")]
    Query(String),

    #[error("no token found for user {0}")]
    NotFound(String),

    #[error("malformed token item: {0}")]
    Malformed(String),
}

/// Storage for linked-account credentials
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist `credential`, replacing any previous one for the same user
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Write`] if the backend rejects the write
    async fn store(&self, credential: &Credential) -> Result<(), StoreError>;

    /// Most recent credential stored for `user_id`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no credential exists, or a
    /// query/parse error from the backend
    async fn lookup(&self, user_id: &str) -> Result<Credential, StoreError>;
}

/// Persisted shape of a credential
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct StoredToken {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "UserID")]
    pub user_id: String,
    pub email: String,
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: String,
    /// RFC3339
    pub expiry: String,
    /// Seconds until expiry at write time
    pub expires_in: i64,
    pub created_at: String,
    pub last_used: String,
    pub revoked: bool,
    /// Unix seconds after which the item may be deleted
    #[serde(rename = "TTL")]
    pub ttl: i64,
}

impl StoredToken {
    #[must_use]
    pub fn from_credential(credential: &Credential, retention: Duration, now: DateTime<Utc>) -> Self {
        let now_rfc3339 = now.to_rfc3339();
        Self {
            id: Uuid::new_v4().to_string(),
            user_id: credential.user_id.clone(),
            email: credential.email.clone(),
            access_token: credential.access_token.clone(),
            token_type: credential.token_type.clone(),
            refresh_token: credential.refresh_token.clone(),
            expiry: credential.expiry.to_rfc3339(),
            expires_in: (credential.expiry - now).num_seconds(),
            created_at: now_rfc3339.clone(),
            last_used: now_rfc3339,
            revoked: false,
            ttl: (now + retention).timestamp(),
        }
    }

    /// Rebuild the credential
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] if `Expiry` is not RFC3339
    pub fn into_credential(self) -> Result<Credential, StoreError> {
        let expiry = DateTime::parse_from_rfc3339(&self.expiry)
            .map_err(|e| StoreError::Malformed(format!("failed to parse expiry: {e}")))?
            .with_timezone(&Utc);

        Ok(Credential {
            access_token: self.access_token,
            token_type: self.token_type,
            refresh_token: self.refresh_token,
            expiry,
            user_id: self.user_id,
            email: self.email,
        })
    }

    #[must_use]
    pub fn is_past_ttl(&self, now: DateTime<Utc>) -> bool {
        self.ttl <= now.timestamp()
    }
}
