//! Keeping stored credentials usable
//!
//! A credential is `Fresh` while its expiry is more than five minutes away.
//! Inside that margin it must be refreshed; without a refresh token, or when
//! the refresh call fails, the request using it ends.

use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use thiserror::Error;

use super::TokenResponse;
use crate::models::Credential;
use crate::settings::GoogleSettings;

/// Credentials expiring sooner than this are refreshed before use
pub const REFRESH_MARGIN_MINUTES: i64 = 5;

#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("no refresh token available")]
    NoRefreshToken,

    #[error("token refresh failed with status: {0}")]
    Status(u16),

    #[error("token refresh request failed: {0}")]
    Transport(String),

    #[error("invalid token refresh response: {0}")]
    InvalidResponse(String),
}

impl RefreshError {
    /// Terminal usability state this failure leaves the credential in
    #[must_use]
    pub fn state(&self) -> CredentialState {
        match self {
            Self::NoRefreshToken => CredentialState::ExpiredNoRefresh,
            _ => CredentialState::RefreshFailed,
        }
    }
}

/// Usability of a credential at the time of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    Fresh,
    Refreshing,
    ExpiredNoRefresh,
    RefreshFailed,
}

impl CredentialState {
    /// State of `credential` before any refresh attempt
    #[must_use]
    pub fn of(credential: &Credential, now: DateTime<Utc>) -> Self {
        if !credential.expires_within(Duration::minutes(REFRESH_MARGIN_MINUTES), now) {
            Self::Fresh
        } else if credential.has_refresh_token() {
            Self::Refreshing
        } else {
            Self::ExpiredNoRefresh
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::ExpiredNoRefresh | Self::RefreshFailed)
    }
}

/// Outcome of [`TokenValidator::ensure_fresh`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// The credential was fresh and is returned as-is
    Unchanged(Credential),
    /// The credential was refreshed and must be persisted
    Refreshed(Credential),
}

impl Freshness {
    #[must_use]
    pub fn credential(&self) -> &Credential {
        match self {
            Self::Unchanged(credential) | Self::Refreshed(credential) => credential,
        }
    }

    #[must_use]
    pub fn into_credential(self) -> Credential {
        match self {
            Self::Unchanged(credential) | Self::Refreshed(credential) => credential,
        }
    }
}

/// Token introspection and refresh against Google's OAuth endpoints
#[derive(Clone)]
pub struct TokenValidator {
    http_client: reqwest::Client,
    tokeninfo_url: String,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl TokenValidator {
    #[must_use]
    pub fn new(settings: &GoogleSettings, http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            tokeninfo_url: settings.tokeninfo_url.clone(),
            token_url: settings.token_url.clone(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
        }
    }

    #[must_use]
    pub fn needs_refresh(credential: &Credential, now: DateTime<Utc>) -> bool {
        credential.expires_within(Duration::minutes(REFRESH_MARGIN_MINUTES), now)
    }

    /// Ask the provider whether the access token is still accepted
    ///
    /// Any transport failure or non-200 answer counts as invalid.
    pub async fn is_valid(&self, credential: &Credential) -> bool {
        let response = self
            .http_client
            .get(&self.tokeninfo_url)
            .query(&[("access_token", credential.access_token.as_str())])
            .send()
            .await;

        match response {
            Ok(response) if response.status() == reqwest::StatusCode::OK => true,
            Ok(response) => {
                debug!("Token introspection rejected with {}", response.status());
                false
            }
            Err(e) => {
                warn!("Token introspection request failed: {e}");
                false
            }
        }
    }

    /// Obtain a new access token using the credential's refresh token
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The credential has no refresh token (no request is made)
    /// - The token endpoint cannot be reached or answers with a non-200 status
    /// - The response is not a valid token response
    pub async fn refresh(&self, credential: &Credential) -> Result<Credential, RefreshError> {
        if !credential.has_refresh_token() {
            return Err(RefreshError::NoRefreshToken);
        }

        let params = [
            ("refresh_token", credential.refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| RefreshError::Transport(e.to_string()))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(RefreshError::Status(response.status().as_u16()));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| RefreshError::InvalidResponse(e.to_string()))?;

        let refresh_token = token_response
            .refresh_token
            .clone()
            .filter(|token| !token.is_empty())
            .unwrap_or_else(|| credential.refresh_token.clone());

        Ok(Credential {
            access_token: token_response.access_token.clone(),
            token_type: token_response.token_type(),
            refresh_token,
            expiry: Utc::now() + Duration::seconds(token_response.expires_in.unwrap_or_default()),
            user_id: credential.user_id.clone(),
            email: credential.email.clone(),
        })
    }

    /// Refresh the credential when it is inside the refresh margin
    ///
    /// # Errors
    ///
    /// Returns the [`RefreshError`] of a failed refresh
    pub async fn ensure_fresh(
        &self,
        credential: Credential,
        now: DateTime<Utc>,
    ) -> Result<Freshness, RefreshError> {
        match CredentialState::of(&credential, now) {
            CredentialState::Fresh => Ok(Freshness::Unchanged(credential)),
            CredentialState::ExpiredNoRefresh => Err(RefreshError::NoRefreshToken),
            CredentialState::Refreshing | CredentialState::RefreshFailed => {
                self.refresh(&credential).await.map(Freshness::Refreshed)
            }
        }
    }
}
