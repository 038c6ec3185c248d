// Reminder handler: resend the summary using a stored credential
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use log::{error, warn};
use serde::{Deserialize, Serialize};

use super::helpers::{deliver_summary, parse_query};
use crate::app::AppState;
use crate::error::FlowError;
use crate::models::Credential;
use crate::oauth::Freshness;
use crate::utils::logging::LoggingHelper;
use crate::utils::response_builder::ResponseBuilder;

pub const USER_ID_HEADER: &str = "X-User-ID";

#[derive(Deserialize, Debug, Default)]
pub struct ReminderQuery {
    pub spreadsheet_id: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ReminderResponse {
    pub status: String,
    pub documents: usize,
}

/// Load the caller's credential and make sure it can still be used
async fn usable_credential(state: &AppState, user_id: &str) -> Result<Credential, FlowError> {
    let credential = state.store.lookup(user_id).await.map_err(|e| {
        warn!("Cannot retrieve token for user {user_id}: {e}");
        FlowError::unauthorized("Unauthorized: Cannot retrieve token")
    })?;

    let freshness = state
        .validator
        .ensure_fresh(credential, Utc::now())
        .await
        .map_err(|e| {
            warn!("Token refresh for user {user_id} failed ({:?}): {e}", e.state());
            FlowError::unauthorized("Unauthorized: Token refresh failed")
        })?;

    match freshness {
        Freshness::Refreshed(refreshed) => {
            LoggingHelper::log_token_refreshed(user_id, &refreshed);
            state.store.store(&refreshed).await.map_err(|e| {
                error!("Failed to save refreshed token: {e}");
                FlowError::Store("Internal server error: Failed to save refreshed token".to_string())
            })?;
            Ok(refreshed)
        }
        Freshness::Unchanged(credential) => {
            if state.validator.is_valid(&credential).await {
                Ok(credential)
            } else {
                Err(FlowError::unauthorized("Unauthorized: Invalid token"))
            }
        }
    }
}

/// Send the summary for `spreadsheet_id` to the user named by the `X-User-ID` header
pub async fn reminders(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .unwrap_or_default();
    if user_id.is_empty() {
        return ResponseBuilder::error(
            &state.cors,
            &FlowError::unauthorized("Unauthorized: Missing user identification"),
        );
    }

    let query: ReminderQuery = parse_query(req.query_string());
    let spreadsheet_id = query.spreadsheet_id.as_deref().unwrap_or_default().trim();

    let result = match usable_credential(&state, user_id).await {
        Ok(credential) => deliver_summary(&state, &credential, spreadsheet_id).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(documents) => ResponseBuilder::new(&state.cors, StatusCode::OK)
            .with_json(&ReminderResponse {
                status: "sent".to_string(),
                documents,
            })
            .build(),
        Err(e) => ResponseBuilder::error(&state.cors, &e),
    }
}
