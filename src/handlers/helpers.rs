// Steps shared by the callback and reminder handlers
use chrono::Utc;
use log::error;
use serde::de::DeserializeOwned;

use crate::app::AppState;
use crate::error::FlowError;
use crate::models::Credential;
use crate::notifier::Notifier;
use crate::sheets::{SheetError, SheetReader};
use crate::utils::logging::LoggingHelper;

/// Parse the query string, treating anything unparsable as empty parameters
pub fn parse_query<T: DeserializeOwned + Default>(query_string: &str) -> T {
    actix_web::web::Query::<T>::from_query(query_string)
        .map(actix_web::web::Query::into_inner)
        .unwrap_or_default()
}

/// Fetch the profile, read the sheet and email the summary
///
/// Returns the number of documents included in the summary.
///
/// # Errors
///
/// Returns the [`FlowError`] of the first step that fails
pub async fn deliver_summary(
    state: &AppState,
    credential: &Credential,
    spreadsheet_id: &str,
) -> Result<usize, FlowError> {
    let api = state.api_client(credential);

    let profile = api.fetch_user_profile().await.map_err(|e| {
        error!("Failed to get user info: {e}");
        FlowError::Read("failed to get user info".to_string())
    })?;
    LoggingHelper::log_user_profile(&profile);

    let records = SheetReader::new(&api)
        .read_range(spreadsheet_id, &state.settings.sheets.range)
        .await
        .map_err(|e| match e {
            SheetError::Validation(_) => {
                error!("Rejected spreadsheet ID: {e}");
                FlowError::Validation("invalid spreadsheet id".to_string())
            }
            SheetError::Read(_) => {
                error!("Failed to read spreadsheet {spreadsheet_id}: {e}");
                FlowError::Read("error processing spreadsheet data".to_string())
            }
        })?;

    let notifications = &state.settings.notifications;
    Notifier::new(&api, &notifications.subject, notifications.reminder_window_days)
        .send_summary(&profile, &records, Utc::now().date_naive())
        .await
        .map_err(|e| {
            error!("Failed to send summary email: {e}");
            FlowError::Send("error sending email".to_string())
        })?;

    LoggingHelper::log_summary_sent(&profile.email, records.len());
    Ok(records.len())
}
