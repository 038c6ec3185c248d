//! Google OAuth authorization-code flow
//!
//! This module builds the consent URL, exchanges the authorization code for a
//! credential and keeps stored credentials usable (see [`tokens`]).

pub mod id_token;
pub mod state;
pub mod tokens;

pub use id_token::{Audience, IdTokenClaims};
pub use state::{DecodeError, OAuthState, StateCodec};
pub use tokens::{CredentialState, Freshness, RefreshError, TokenValidator};

use chrono::{Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::models::Credential;
use crate::settings::GoogleSettings;
use crate::utils::logging::LoggingHelper;

/// Query parameters Google sends back to the redirect URL
#[derive(Deserialize, Debug, Default)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("ID token processing failed: {0}")]
    IdToken(String),
}

/// Token endpoint response, shared by code exchange and refresh
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Token type, defaulting to `Bearer` when the provider omits it
    #[must_use]
    pub fn token_type(&self) -> String {
        self.token_type
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Bearer".to_string())
    }
}

/// Client for Google's authorization and token endpoints
#[derive(Clone)]
pub struct GoogleOAuthClient {
    settings: GoogleSettings,
    http_client: reqwest::Client,
}

impl GoogleOAuthClient {
    #[must_use]
    pub fn new(settings: GoogleSettings, http_client: reqwest::Client) -> Self {
        Self {
            settings,
            http_client,
        }
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.settings.client_id
    }

    /// Build the consent URL carrying `state`
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Configuration`] if the authorization endpoint is not a valid URL
    pub fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        let scopes = self.settings.scopes.join(" ");

        let mut url = url::Url::parse(&self.settings.auth_url)
            .map_err(|e| OAuthError::Configuration(format!("Invalid auth URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.settings.client_id)
            .append_pair("redirect_uri", &self.settings.redirect_url)
            .append_pair("response_type", "code")
            .append_pair("scope", &scopes)
            .append_pair("state", state)
            .append_pair("access_type", "offline");

        log::debug!("Built Google OAuth URL with scopes: {scopes}");
        Ok(url.to_string())
    }

    /// Exchange an authorization code for a credential
    ///
    /// The credential's identity comes from the ID token's `sub` and `email` claims.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The token endpoint cannot be reached or answers with a non-success status
    /// - The response is not a valid token response
    /// - The response carries no usable ID token
    pub async fn exchange_code(&self, code: &str) -> Result<Credential, OAuthError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.settings.redirect_url.as_str()),
            ("client_id", self.settings.client_id.as_str()),
            ("client_secret", self.settings.client_secret.as_str()),
        ];

        log::info!("Starting token exchange with Google");
        let response = self
            .http_client
            .post(&self.settings.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchange(format!("Failed to exchange code: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(OAuthError::TokenExchange(format!(
                "Token endpoint returned {status}: {error_text}"
            )));
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            OAuthError::TokenExchange(format!("Failed to parse token response: {e}"))
        })?;

        let id_token = token_response
            .id_token
            .as_deref()
            .ok_or_else(|| OAuthError::IdToken("No ID token available".to_string()))?;
        let claims = IdTokenClaims::decode(id_token)?;
        let now = Utc::now();
        claims.log_warnings(&self.settings.client_id, now);

        let expiry = match token_response.expires_in {
            Some(expires_in) => now + Duration::seconds(expires_in),
            None => now + Duration::hours(1),
        };

        let credential = Credential {
            access_token: token_response.access_token.clone(),
            token_type: token_response.token_type(),
            refresh_token: token_response.refresh_token.clone().unwrap_or_default(),
            expiry,
            user_id: claims.sub,
            email: claims.email.unwrap_or_default(),
        };
        LoggingHelper::log_token_exchange(&credential);
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestFixtures;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server_uri: &str) -> GoogleOAuthClient {
        let settings = TestFixtures::google_settings(server_uri);
        GoogleOAuthClient::new(settings, reqwest::Client::new())
    }

    #[test]
    fn test_authorization_url_parameters() {
        let client = client_for("http://localhost:9999");
        let url = url::Url::parse(&client.authorization_url("state-token").unwrap()).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(params["client_id"], TestFixtures::CLIENT_ID);
        assert_eq!(params["redirect_uri"], TestFixtures::REDIRECT_URL);
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["state"], "state-token");
        assert_eq!(params["access_type"], "offline");
        assert!(params["scope"].contains("https://www.googleapis.com/auth/gmail.send"));
        assert!(params["scope"].contains("openid"));
    }

    #[test]
    fn test_authorization_url_invalid_endpoint() {
        let mut settings = TestFixtures::google_settings("http://localhost:9999");
        settings.auth_url = "not a url".to_string();
        let client = GoogleOAuthClient::new(settings, reqwest::Client::new());

        assert!(matches!(
            client.authorization_url("state"),
            Err(OAuthError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_exchange_code_builds_credential_from_id_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.access",
                "refresh_token": "1//refresh",
                "expires_in": 3599,
                "token_type": "Bearer",
                "id_token": TestFixtures::id_token("user-123", "user@example.com"),
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credential = client_for(&server.uri())
            .exchange_code("auth-code")
            .await
            .unwrap();

        assert_eq!(credential.access_token, "ya29.access");
        assert_eq!(credential.refresh_token, "1//refresh");
        assert_eq!(credential.user_id, "user-123");
        assert_eq!(credential.email, "user@example.com");
        assert!(credential.expiry > Utc::now() + Duration::minutes(59));
    }

    #[tokio::test]
    async fn test_exchange_code_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let err = client_for(&server.uri())
            .exchange_code("bad-code")
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthError::TokenExchange(_)));
    }

    #[tokio::test]
    async fn test_exchange_code_without_id_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "ya29.access",
                "expires_in": 3599
            })))
            .mount(&server)
            .await;

        let err = client_for(&server.uri())
            .exchange_code("auth-code")
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthError::IdToken(_)));
    }

    #[test]
    fn test_token_type_defaults_to_bearer() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"a","token_type":""}"#).unwrap();
        assert_eq!(response.token_type(), "Bearer");
    }
}
