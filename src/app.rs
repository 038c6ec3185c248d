//! Shared application state and route table

use std::sync::Arc;
use std::time::Duration;

use actix_web::{guard, web};
use anyhow::Context;
use log::info;

use crate::google::GoogleApiClient;
use crate::handlers::{health, invalid_request, login, oauth_callback, preflight, reminders};
use crate::models::Credential;
use crate::oauth::{GoogleOAuthClient, StateCodec, TokenValidator};
use crate::settings::DocExpirySettings;
use crate::store::{MemoryTokenStore, TokenStore};
use crate::utils::response_builder::CorsPolicy;

/// Read-only state shared by every request
#[derive(Clone)]
pub struct AppState {
    pub settings: DocExpirySettings,
    pub cors: CorsPolicy,
    pub state_codec: StateCodec,
    pub oauth: GoogleOAuthClient,
    pub validator: TokenValidator,
    pub store: Arc<dyn TokenStore>,
    http_client: reqwest::Client,
}

impl AppState {
    /// Build the state around an existing token store
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built
    pub fn new(settings: DocExpirySettings, store: Arc<dyn TokenStore>) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.google.http_timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            cors: CorsPolicy::from_settings(&settings.application),
            state_codec: StateCodec::from_settings(&settings.google),
            oauth: GoogleOAuthClient::new(settings.google.clone(), http_client.clone()),
            validator: TokenValidator::new(&settings.google, http_client.clone()),
            store,
            http_client,
            settings,
        })
    }

    /// Build the state with the token store backend named in settings
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unknown or the HTTP client cannot be built
    pub async fn from_settings(settings: DocExpirySettings) -> anyhow::Result<Self> {
        let store = Self::token_store(&settings).await?;
        Self::new(settings, store)
    }

    async fn token_store(settings: &DocExpirySettings) -> anyhow::Result<Arc<dyn TokenStore>> {
        match settings.token_store.backend.as_str() {
            "memory" => {
                info!("🗄️  Using in-memory token store");
                Ok(Arc::new(MemoryTokenStore::new(settings.token_retention())))
            }
            #[cfg(feature = "dynamodb")]
            "dynamodb" => Ok(Arc::new(
                crate::store::DynamoTokenStore::from_settings(&settings.token_store).await,
            )),
            other => anyhow::bail!("Unsupported token store backend: {other}"),
        }
    }

    /// Google API client acting with `credential`
    #[must_use]
    pub fn api_client(&self, credential: &Credential) -> GoogleApiClient {
        GoogleApiClient::new(
            self.http_client.clone(),
            credential,
            self.settings.google.clone(),
        )
    }
}

/// Register every route; unknown paths answer 400 and any `OPTIONS` request 200
pub fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/{tail:.*}")
            .guard(guard::Options())
            .to(preflight),
    )
    .service(web::resource("/login").to(login))
    .service(web::resource("/oauth2callback").to(oauth_callback))
    .route("/reminders", web::get().to(reminders))
    .route("/ping", web::get().to(health))
    .default_service(web::to(invalid_request));
}
