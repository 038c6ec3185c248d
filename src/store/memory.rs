use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use log::debug;
use tokio::sync::RwLock;

use super::{StoreError, StoredToken, TokenStore};
use crate::models::Credential;

/// In-process token store for local runs and tests
pub struct MemoryTokenStore {
    items: RwLock<HashMap<String, StoredToken>>,
    retention: Duration,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new(retention: Duration) -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Number of stored items, expired ones included
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Raw persisted item for `user_id`
    pub async fn item(&self, user_id: &str) -> Option<StoredToken> {
        self.items.read().await.get(user_id).cloned()
    }
}

impl Default for MemoryTokenStore {
    fn default() -> Self {
        Self::new(Duration::days(30))
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn store(&self, credential: &Credential) -> Result<(), StoreError> {
        let item = StoredToken::from_credential(credential, self.retention, Utc::now());
        debug!("Storing token for user {} in memory", item.user_id);
        self.items.write().await.insert(item.user_id.clone(), item);
        Ok(())
    }

    async fn lookup(&self, user_id: &str) -> Result<Credential, StoreError> {
        let items = self.items.read().await;
        match items.get(user_id) {
            Some(item) if !item.is_past_ttl(Utc::now()) => item.clone().into_credential(),
            _ => Err(StoreError::NotFound(user_id.to_string())),
        }
    }
}
