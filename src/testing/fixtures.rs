//! Test fixtures providing pre-built test objects
//!
//! Every Google endpoint can be pointed at one base URL, so a single mock
//! server stands in for the token, userinfo, Sheets and Gmail APIs.

use std::sync::Arc;

use base64::engine::general_purpose;
use base64::Engine as _;
use chrono::{Duration, Utc};

use crate::app::AppState;
use crate::google::GoogleApiClient;
use crate::models::{Credential, UserProfile};
use crate::settings::{DocExpirySettings, GoogleSettings};
use crate::store::{MemoryTokenStore, TokenStore};

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    pub const CLIENT_ID: &'static str = "test-client-id.apps.googleusercontent.com";
    pub const CLIENT_SECRET: &'static str = "test-client-secret";
    pub const REDIRECT_URL: &'static str = "http://localhost:8080/oauth2callback";
    pub const SPREADSHEET_ID: &'static str = "1ioCzdKVejCLjVk3h7_test-sheet";
    pub const USER_ID: &'static str = "112233445566778899";
    pub const EMAIL: &'static str = "user@example.com";
    pub const SUMMARY_URL: &'static str = "http://localhost:3000/summary";

    /// Google settings with every endpoint under `base_url`
    #[must_use]
    pub fn google_settings(base_url: &str) -> GoogleSettings {
        let base = base_url.trim_end_matches('/');
        GoogleSettings {
            client_id: Self::CLIENT_ID.to_string(),
            client_secret: Self::CLIENT_SECRET.to_string(),
            redirect_url: Self::REDIRECT_URL.to_string(),
            auth_url: format!("{base}/o/oauth2/auth"),
            token_url: format!("{base}/token"),
            tokeninfo_url: format!("{base}/tokeninfo"),
            userinfo_url: format!("{base}/oauth2/v2/userinfo"),
            sheets_base_url: base.to_string(),
            gmail_base_url: base.to_string(),
            http_timeout_seconds: 5,
            ..GoogleSettings::default()
        }
    }

    /// Full settings using the in-memory token store
    #[must_use]
    pub fn settings(base_url: &str) -> DocExpirySettings {
        let mut settings = DocExpirySettings {
            google: Self::google_settings(base_url),
            ..DocExpirySettings::default()
        };
        settings.token_store.backend = "memory".to_string();
        settings.application.frontend_summary_url = Self::SUMMARY_URL.to_string();
        settings
    }

    /// Application state backed by a fresh in-memory store
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built
    #[must_use]
    pub fn app_state(base_url: &str) -> AppState {
        Self::app_state_with_store(base_url, Arc::new(MemoryTokenStore::default()))
    }

    /// Application state sharing `store` with the caller
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built
    #[must_use]
    pub fn app_state_with_store(base_url: &str, store: Arc<dyn TokenStore>) -> AppState {
        AppState::new(Self::settings(base_url), store).expect("test app state")
    }

    /// Credential for the test user expiring after `expires_in`
    #[must_use]
    pub fn credential_expiring_in(expires_in: Duration) -> Credential {
        Credential {
            access_token: "ya29.test-access-token".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: "1//test-refresh-token".to_string(),
            expiry: Utc::now() + expires_in,
            user_id: Self::USER_ID.to_string(),
            email: Self::EMAIL.to_string(),
        }
    }

    #[must_use]
    pub fn user_profile() -> UserProfile {
        UserProfile {
            id: Self::USER_ID.to_string(),
            email: Self::EMAIL.to_string(),
            verified_email: true,
            name: "Test User".to_string(),
            given_name: "Test".to_string(),
            family_name: "User".to_string(),
            ..UserProfile::default()
        }
    }

    /// Unsigned compact JWT carrying Google-style claims for `sub`
    #[must_use]
    pub fn id_token(sub: &str, email: &str) -> String {
        let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let claims = serde_json::json!({
            "iss": "https://accounts.google.com",
            "aud": Self::CLIENT_ID,
            "sub": sub,
            "email": email,
            "exp": (Utc::now() + Duration::hours(1)).timestamp(),
        });
        let payload = general_purpose::URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.test-signature")
    }

    /// API client for the test credential against `base_url`
    #[must_use]
    pub fn api_client(base_url: &str) -> GoogleApiClient {
        GoogleApiClient::new(
            reqwest::Client::new(),
            &Self::credential_expiring_in(Duration::hours(1)),
            Self::google_settings(base_url),
        )
    }
}
