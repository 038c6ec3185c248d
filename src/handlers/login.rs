// Login handler: start the Google consent flow
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use log::{debug, error};
use serde::Deserialize;

use super::helpers::parse_query;
use crate::app::AppState;
use crate::error::FlowError;
use crate::utils::response_builder::ResponseBuilder;

#[derive(Deserialize, Debug, Default)]
pub struct LoginQuery {
    pub spreadsheet_id: Option<String>,
}

/// Redirect to Google with the spreadsheet ID carried in the state token
pub async fn login(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let query: LoginQuery = parse_query(req.query_string());
    let spreadsheet_id = query.spreadsheet_id.as_deref().unwrap_or_default().trim();

    if spreadsheet_id.is_empty() {
        return ResponseBuilder::error(
            &state.cors,
            &FlowError::Validation("spreadsheet_id is missing".to_string()),
        );
    }

    let token = match state.state_codec.encode(spreadsheet_id) {
        Ok(token) => token,
        Err(e) => {
            error!("Failed to encode OAuth state: {e}");
            return ResponseBuilder::error(&state.cors, &FlowError::Decode(e));
        }
    };

    match state.oauth.authorization_url(&token) {
        Ok(auth_url) => {
            debug!("Redirecting login for spreadsheet {spreadsheet_id} to Google");
            ResponseBuilder::redirect(&state.cors, StatusCode::TEMPORARY_REDIRECT, &auth_url)
        }
        Err(e) => {
            error!("Failed to build authorization URL: {e}");
            ResponseBuilder::error(&state.cors, &FlowError::auth("authentication failed"))
        }
    }
}
