use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Date format used for spreadsheet cells and in the summary email
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

/// OAuth credential for a linked Google account
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub token_type: String,
    pub refresh_token: String,
    pub expiry: DateTime<Utc>,
    pub user_id: String,
    pub email: String,
}

impl Credential {
    /// Whether the access token is already past its expiry
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry < now
    }

    /// Whether the access token expires before `now + margin`
    #[must_use]
    pub fn expires_within(&self, margin: Duration, now: DateTime<Utc>) -> bool {
        self.expiry < now + margin
    }

    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        !self.refresh_token.is_empty()
    }
}

/// One spreadsheet row describing a tracked document
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentRecord {
    pub name: String,
    pub issue_date: NaiveDate,
    pub expiry_date: NaiveDate,
    pub duration: Duration,
    pub status: String,
}

impl DocumentRecord {
    /// Whole days from `today` until the expiry date (negative once expired)
    #[must_use]
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        (self.expiry_date - today).num_days()
    }

    /// True when the document expires today or within the next `window_days` days
    #[must_use]
    pub fn expires_within(&self, today: NaiveDate, window_days: i64) -> bool {
        let days = self.days_until_expiry(today);
        (0..=window_days).contains(&days)
    }
}

/// Google account profile as returned by the userinfo endpoint
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub verified_email: bool,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub given_name: String,
    #[serde(default)]
    pub family_name: String,
    #[serde(default)]
    pub picture: String,
    #[serde(default)]
    pub locale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hd: Option<String>,
}
