// Centralized logging for the OAuth callback flow
use log::{info, warn};

use crate::models::{Credential, UserProfile};
use crate::settings::DocExpirySettings;

pub struct LoggingHelper;

impl LoggingHelper {
    /// Log startup configuration without secrets
    pub fn log_startup(settings: &DocExpirySettings) {
        info!("🔧 Starting docexpiry on {}", settings.get_bind_address());
        info!(
            "🔗 OAuth redirect URL: {} (client configured: {})",
            settings.google.redirect_url,
            !settings.google.client_id.is_empty()
        );
        info!(
            "🗄️  Token store: {} (table {}, region {})",
            settings.token_store.backend,
            settings.token_store.table_name,
            settings.token_store.region
        );
        if settings.google.state_secret.is_none() {
            warn!("STATE_SECRET not set; OAuth state tokens are unsigned");
        }
    }

    /// Log a successful code exchange
    pub fn log_token_exchange(credential: &Credential) {
        info!(
            "=== OAuth Token Exchange Success for {} ===",
            credential.user_id
        );
        info!("Token type: {}", credential.token_type);
        info!("Expires at: {}", credential.expiry.to_rfc3339());
        info!("Refresh token present: {}", credential.has_refresh_token());
    }

    pub fn log_token_refreshed(user_id: &str, credential: &Credential) {
        info!(
            "🔄 Refreshed access token for user {} (new expiry {})",
            user_id,
            credential.expiry.to_rfc3339()
        );
    }

    pub fn log_user_profile(profile: &UserProfile) {
        info!(
            "👤 Retrieved user profile: id={} email={} verified={}",
            profile.id, profile.email, profile.verified_email
        );
    }

    /// Log that a summary email went out
    pub fn log_summary_sent(email: &str, documents: usize) {
        info!("📧 Sent document summary to {email} ({documents} documents)");
    }
}
