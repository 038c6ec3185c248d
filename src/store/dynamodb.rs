use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::{Duration, Utc};
use log::{debug, info};

use super::{StoreError, StoredToken, TokenStore};
use crate::models::Credential;
use crate::settings::TokenStoreSettings;

type Item = HashMap<String, AttributeValue>;

/// DynamoDB-backed token store
#[derive(Clone)]
pub struct DynamoTokenStore {
    client: Client,
    table_name: String,
    index_name: Option<String>,
    retention: Duration,
}

impl DynamoTokenStore {
    #[must_use]
    pub fn new(
        client: Client,
        table_name: &str,
        index_name: Option<String>,
        retention: Duration,
    ) -> Self {
        Self {
            client,
            table_name: table_name.to_string(),
            index_name,
            retention,
        }
    }

    /// Build a client from the default AWS credential chain in the configured region
    pub async fn from_settings(settings: &TokenStoreSettings) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(aws_config::Region::new(settings.region.clone()))
            .load()
            .await;
        info!(
            "🗄️  Using DynamoDB table {} in {}",
            settings.table_name, settings.region
        );

        Self::new(
            Client::new(&config),
            &settings.table_name,
            settings.index_name.clone(),
            Duration::days(settings.retention_days),
        )
    }
}

/// Attribute map written for `token`
#[must_use]
pub fn to_item(token: &StoredToken) -> Item {
    HashMap::from([
        ("ID".to_string(), AttributeValue::S(token.id.clone())),
        ("UserID".to_string(), AttributeValue::S(token.user_id.clone())),
        ("Email".to_string(), AttributeValue::S(token.email.clone())),
        (
            "AccessToken".to_string(),
            AttributeValue::S(token.access_token.clone()),
        ),
        (
            "TokenType".to_string(),
            AttributeValue::S(token.token_type.clone()),
        ),
        (
            "RefreshToken".to_string(),
            AttributeValue::S(token.refresh_token.clone()),
        ),
        ("Expiry".to_string(), AttributeValue::S(token.expiry.clone())),
        (
            "ExpiresIn".to_string(),
            AttributeValue::N(token.expires_in.to_string()),
        ),
        (
            "CreatedAt".to_string(),
            AttributeValue::S(token.created_at.clone()),
        ),
        (
            "LastUsed".to_string(),
            AttributeValue::S(token.last_used.clone()),
        ),
        ("Revoked".to_string(), AttributeValue::Bool(token.revoked)),
        ("TTL".to_string(), AttributeValue::N(token.ttl.to_string())),
    ])
}

fn string_attr(item: &Item, name: &str) -> Result<String, StoreError> {
    item.get(name)
        .and_then(|value| value.as_s().ok())
        .cloned()
        .ok_or_else(|| StoreError::Malformed(format!("missing string attribute {name}")))
}

/// Numeric attribute, zero when absent or unparsable
fn number_attr(item: &Item, name: &str) -> i64 {
    item.get(name)
        .and_then(|value| value.as_n().ok())
        .and_then(|n| n.parse().ok())
        .unwrap_or_default()
}

/// Parse an attribute map read back from the table
///
/// Bookkeeping attributes default to empty/zero; identity and token fields are required.
///
/// # Errors
///
/// Returns [`StoreError::Malformed`] if a required string attribute is missing
pub fn from_item(item: &Item) -> Result<StoredToken, StoreError> {
    Ok(StoredToken {
        id: string_attr(item, "ID").unwrap_or_default(),
        user_id: string_attr(item, "UserID")?,
        email: string_attr(item, "Email")?,
        access_token: string_attr(item, "AccessToken")?,
        token_type: string_attr(item, "TokenType")?,
        refresh_token: string_attr(item, "RefreshToken")?,
        expiry: string_attr(item, "Expiry")?,
        expires_in: number_attr(item, "ExpiresIn"),
        created_at: string_attr(item, "CreatedAt").unwrap_or_default(),
        last_used: string_attr(item, "LastUsed").unwrap_or_default(),
        revoked: item
            .get("Revoked")
            .and_then(|value| value.as_bool().ok())
            .copied()
            .unwrap_or(false),
        ttl: number_attr(item, "TTL"),
    })
}

#[async_trait]
impl TokenStore for DynamoTokenStore {
    async fn store(&self, credential: &Credential) -> Result<(), StoreError> {
        let token = StoredToken::from_credential(credential, self.retention, Utc::now());
        debug!("Storing token for user {} in {}", token.user_id, self.table_name);

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_item(&token)))
            .send()
            .await
            .map_err(|e| StoreError::Write(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    async fn lookup(&self, user_id: &str) -> Result<Credential, StoreError> {
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .set_index_name(self.index_name.clone())
            .key_condition_expression("UserID = :uid")
            .expression_attribute_values(":uid", AttributeValue::S(user_id.to_string()))
            .scan_index_forward(false)
            .limit(1)
            .send()
            .await
            .map_err(|e| StoreError::Query(DisplayErrorContext(&e).to_string()))?;

        let item = output
            .items()
            .first()
            .ok_or_else(|| StoreError::NotFound(user_id.to_string()))?;
        from_item(item)?.into_credential()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestFixtures;

    #[test]
    fn test_item_attributes() {
        let credential = TestFixtures::credential_expiring_in(Duration::hours(1));
        let token = StoredToken::from_credential(&credential, Duration::days(30), Utc::now());
        let item = to_item(&token);

        assert_eq!(item.len(), 12);
        assert_eq!(
            item.get("UserID"),
            Some(&AttributeValue::S(credential.user_id.clone()))
        );
        assert_eq!(item.get("Revoked"), Some(&AttributeValue::Bool(false)));
        assert_eq!(
            item.get("TTL"),
            Some(&AttributeValue::N(token.ttl.to_string()))
        );
        assert_eq!(from_item(&item).unwrap(), token);
    }

    #[test]
    fn test_from_item_requires_token_fields() {
        let credential = TestFixtures::credential_expiring_in(Duration::hours(1));
        let token = StoredToken::from_credential(&credential, Duration::days(30), Utc::now());
        let mut item = to_item(&token);
        item.remove("AccessToken");

        assert!(matches!(from_item(&item), Err(StoreError::Malformed(_))));
    }

    #[test]
    fn test_from_item_tolerates_legacy_items() {
        // Items written before bookkeeping attributes existed
        let item: Item = HashMap::from([
            ("UserID".to_string(), AttributeValue::S("u1".to_string())),
            ("Email".to_string(), AttributeValue::S("u1@example.com".to_string())),
            ("AccessToken".to_string(), AttributeValue::S("a".to_string())),
            ("TokenType".to_string(), AttributeValue::S("Bearer".to_string())),
            ("RefreshToken".to_string(), AttributeValue::S(String::new())),
            (
                "Expiry".to_string(),
                AttributeValue::S("2030-01-01T00:00:00Z".to_string()),
            ),
        ]);

        let credential = from_item(&item).unwrap().into_credential().unwrap();
        assert_eq!(credential.user_id, "u1");
        assert!(!credential.has_refresh_token());
    }
}
