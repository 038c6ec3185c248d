//! Authenticated calls to Google REST APIs on behalf of a linked user

use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::models::{Credential, UserProfile};
use crate::settings::GoogleSettings;

#[derive(Debug, Error)]
pub enum GoogleApiError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("{url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// HTTP client bound to one user's access token
#[derive(Clone)]
pub struct GoogleApiClient {
    http_client: reqwest::Client,
    access_token: String,
    settings: GoogleSettings,
}

impl GoogleApiClient {
    #[must_use]
    pub fn new(http_client: reqwest::Client, credential: &Credential, settings: GoogleSettings) -> Self {
        Self {
            http_client,
            access_token: credential.access_token.clone(),
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &GoogleSettings {
        &self.settings
    }

    /// GET `url` with the bearer token and parse the JSON body
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or an unparsable body
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, GoogleApiError> {
        debug!("GET {url}");
        let response = self
            .http_client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| GoogleApiError::Transport(e.to_string()))?;
        Self::parse(url, response).await
    }

    /// POST `body` as JSON with the bearer token and parse the JSON response
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or an unparsable body
    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, GoogleApiError> {
        debug!("POST {url}");
        let response = self
            .http_client
            .post(url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| GoogleApiError::Transport(e.to_string()))?;
        Self::parse(url, response).await
    }

    async fn parse<T: DeserializeOwned>(
        url: &str,
        response: reqwest::Response,
    ) -> Result<T, GoogleApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(GoogleApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        response
            .json()
            .await
            .map_err(|e| GoogleApiError::InvalidResponse(e.to_string()))
    }

    /// Profile of the account the access token belongs to
    ///
    /// # Errors
    ///
    /// Returns a [`GoogleApiError`] if the userinfo call fails
    pub async fn fetch_user_profile(&self) -> Result<UserProfile, GoogleApiError> {
        let url = self.settings.userinfo_url.clone();
        self.get_json(&url).await
    }
}

/// `{base}/v4/spreadsheets/{id}/values/{range}` with each segment percent-encoded
///
/// # Errors
///
/// Returns [`GoogleApiError::InvalidResponse`] if `base` cannot carry a path
pub fn sheets_values_url(base: &str, spreadsheet_id: &str, range: &str) -> Result<String, GoogleApiError> {
    api_url(base, &["v4", "spreadsheets", spreadsheet_id, "values", range])
}

/// `{base}/gmail/v1/users/me/messages/send`
///
/// # Errors
///
/// Returns [`GoogleApiError::InvalidResponse`] if `base` cannot carry a path
pub fn gmail_send_url(base: &str) -> Result<String, GoogleApiError> {
    api_url(base, &["gmail", "v1", "users", "me", "messages", "send"])
}

fn api_url(base: &str, segments: &[&str]) -> Result<String, GoogleApiError> {
    let mut url = Url::parse(base)
        .map_err(|e| GoogleApiError::InvalidResponse(format!("invalid base URL {base}: {e}")))?;
    url.path_segments_mut()
        .map_err(|()| GoogleApiError::InvalidResponse(format!("base URL {base} cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url.to_string())
}
