#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![deny(warnings)]
#![allow(clippy::multiple_crate_versions)]

use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use docexpiry::{
    configure_services, settings::DocExpirySettings, utils::LoggingHelper, AppState,
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from Settings.toml and environment variables
    // This also loads .env file and initializes the logger
    let settings = DocExpirySettings::load()
        .map_err(|e| anyhow::anyhow!("Failed to load settings: {e}"))?;
    LoggingHelper::log_startup(&settings);

    let state = AppState::from_settings(settings)
        .await
        .context("Failed to initialize application state")?;

    start_server(state).await
}

/// Start the HTTP server
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(state: AppState) -> anyhow::Result<()> {
    let bind_address = state.settings.get_bind_address();
    print_startup_info(&bind_address, &state.settings);

    let state = web::Data::new(state);
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)
    .with_context(|| format!("Failed to bind {bind_address}"))?
    .run()
    .await
    .context("Server error")
}

fn print_startup_info(bind_address: &str, settings: &DocExpirySettings) {
    println!("Starting docexpiry on http://{bind_address}");
    println!();
    println!("OAuth endpoints:");
    println!("  GET  /login?spreadsheet_id=<id> - Redirect to Google consent");
    println!("  GET  /oauth2callback            - Complete sign-in and email the summary");
    println!();
    println!("Reminder endpoints:");
    println!("  GET  /reminders?spreadsheet_id=<id> - Resend the summary (X-User-ID header)");
    println!();
    println!("OAuth redirect URL registered with Google:");
    println!("  {}", settings.google.redirect_url);
    println!();
    println!("System endpoints:");
    println!("  GET  /ping - Health check");
    println!("  Token store backend: {}", settings.token_store.backend);
}
