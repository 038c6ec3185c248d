// OAuth callback handler
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::{debug, error, warn};

use super::helpers::{deliver_summary, parse_query};
use crate::app::AppState;
use crate::error::FlowError;
use crate::models::Credential;
use crate::oauth::OAuthCallback;
use crate::utils::logging::LoggingHelper;
use crate::utils::response_builder::ResponseBuilder;

/// Progress through the callback; each step either advances or ends the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStage {
    Received,
    StateDecoded,
    CodeExchanged,
    TokenValidated,
    TokenStored,
    SummarySent,
    Redirected,
}

struct CallbackFlow<'a> {
    state: &'a AppState,
    stage: CallbackStage,
}

impl<'a> CallbackFlow<'a> {
    fn new(state: &'a AppState) -> Self {
        Self {
            state,
            stage: CallbackStage::Received,
        }
    }

    fn advance(&mut self, stage: CallbackStage) {
        debug!("OAuth callback: {:?} -> {stage:?}", self.stage);
        self.stage = stage;
    }

    async fn run(&mut self, params: OAuthCallback) -> Result<(), FlowError> {
        let oauth_state = self
            .state
            .state_codec
            .decode(params.state.as_deref().unwrap_or_default())
            .inspect_err(|e| error!("Failed to decode OAuth state: {e}"))?;
        self.advance(CallbackStage::StateDecoded);

        if let Some(provider_error) = params.error.as_deref() {
            warn!("Google returned an error on the callback: {provider_error}");
        }
        let code = params
            .code
            .filter(|code| !code.is_empty())
            .ok_or_else(|| FlowError::Validation("missing code".to_string()))?;

        let credential = self.exchange(&code).await?;
        self.advance(CallbackStage::CodeExchanged);

        if !self.state.validator.is_valid(&credential).await {
            error!("Exchanged token for user {} failed introspection", credential.user_id);
            return Err(FlowError::auth("invalid token"));
        }
        self.advance(CallbackStage::TokenValidated);

        self.state.store.store(&credential).await.map_err(|e| {
            error!("Failed to store token: {e}");
            FlowError::Store("error inserting into database".to_string())
        })?;
        self.advance(CallbackStage::TokenStored);

        deliver_summary(self.state, &credential, &oauth_state.spreadsheet_id).await?;
        self.advance(CallbackStage::SummarySent);
        Ok(())
    }

    /// Exchange the code; an already-expired token is refreshed when possible
    async fn exchange(&self, code: &str) -> Result<Credential, FlowError> {
        let credential = self.state.oauth.exchange_code(code).await.map_err(|e| {
            error!("Failed to exchange code: {e}");
            FlowError::auth("authentication failed")
        })?;

        if credential.is_expired(Utc::now()) && credential.has_refresh_token() {
            match self.state.validator.refresh(&credential).await {
                Ok(refreshed) => return Ok(refreshed),
                Err(e) => warn!("Refreshing the exchanged token failed, keeping it: {e}"),
            }
        }
        Ok(credential)
    }
}

/// Complete the Google consent flow and email the spreadsheet summary
pub async fn oauth_callback(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let params: OAuthCallback = parse_query(req.query_string());
    debug!(
        "OAuth callback received: state present = {}, code present = {}",
        params.state.is_some(),
        params.code.is_some()
    );

    let mut flow = CallbackFlow::new(&state);
    match flow.run(params).await {
        Ok(()) => {
            flow.advance(CallbackStage::Redirected);
            ResponseBuilder::redirect(
                &state.cors,
                StatusCode::FOUND,
                &state.settings.application.frontend_summary_url,
            )
        }
        Err(e) => {
            debug!("OAuth callback stopped after {:?}", flow.stage);
            ResponseBuilder::error(&state.cors, &e)
        }
    }
}
