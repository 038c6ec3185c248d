use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DocExpirySettings {
    pub application: ApplicationSettings,
    pub google: GoogleSettings,
    pub sheets: SheetSettings,
    pub token_store: TokenStoreSettings,
    pub notifications: NotificationSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// Single origin allowed by the CORS policy (the front-end)
    pub cors_origin: String,
    /// Front-end page the callback redirects to once the summary is sent
    pub frontend_summary_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub scopes: Vec<String>,
    pub auth_url: String,
    pub token_url: String,
    pub tokeninfo_url: String,
    pub userinfo_url: String,
    pub sheets_base_url: String,
    pub gmail_base_url: String,
    /// When set, state tokens carry an HMAC-SHA256 tag keyed with this secret
    pub state_secret: Option<String>,
    /// Timeout applied to every outbound call
    pub http_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetSettings {
    pub range: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenStoreSettings {
    /// `dynamodb` or `memory`
    pub backend: String,
    pub table_name: String,
    /// Secondary index on `UserID`, when the table is keyed by something else
    pub index_name: Option<String>,
    pub region: String,
    pub retention_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationSettings {
    pub subject: String,
    pub reminder_window_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_origin: "http://localhost:3000".to_string(),
            frontend_summary_url: "http://localhost:3000/summary".to_string(),
        }
    }
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_url: "http://localhost:8080/oauth2callback".to_string(),
            scopes: vec![
                "openid".to_string(),
                "https://www.googleapis.com/auth/userinfo.profile".to_string(),
                "https://www.googleapis.com/auth/userinfo.email".to_string(),
                "https://www.googleapis.com/auth/spreadsheets.readonly".to_string(),
                "https://www.googleapis.com/auth/gmail.send".to_string(),
            ],
            auth_url: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
            tokeninfo_url: "https://oauth2.googleapis.com/tokeninfo".to_string(),
            userinfo_url: "https://www.googleapis.com/oauth2/v2/userinfo".to_string(),
            sheets_base_url: "https://sheets.googleapis.com".to_string(),
            gmail_base_url: "https://gmail.googleapis.com".to_string(),
            state_secret: None,
            http_timeout_seconds: 10,
        }
    }
}

impl Default for SheetSettings {
    fn default() -> Self {
        Self {
            range: "Sheet1!A1:E10".to_string(),
        }
    }
}

impl Default for TokenStoreSettings {
    fn default() -> Self {
        Self {
            backend: "dynamodb".to_string(),
            table_name: "Token".to_string(),
            index_name: None,
            region: "eu-north-1".to_string(),
            retention_days: 30,
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            subject: "Document Summary".to_string(),
            reminder_window_days: 7,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl DocExpirySettings {
    /// Load settings from configuration files and environment variables,
    /// then initialise the logger
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Settings file cannot be read or parsed
    /// - The logger was already initialised
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(settings.logging.level.as_str()),
        )
        .try_init()?;

        Ok(settings)
    }

    /// Load base settings from TOML file(s) or use defaults
    /// Settings are loaded with the following priority (highest to lowest):
    /// 1. Environment variables (applied separately after loading base settings)
    /// 2. Settings.toml in `DOCEXPIRY_SECRETS_DIR` (if specified and exists)
    /// 3. Settings.toml in current directory (if exists)
    /// 4. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if a settings file exists but cannot be read or parsed
    pub fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let mut settings = Self::default();

        let default_config_path = std::path::PathBuf::from("Settings.toml");
        if default_config_path.exists() {
            settings = Self::from_file(&default_config_path)?;
            println!(
                "✓ Loaded base settings from {}",
                default_config_path.display()
            );
        }

        if let Ok(secrets_dir) = std::env::var("DOCEXPIRY_SECRETS_DIR") {
            let secrets_path = std::path::Path::new(&secrets_dir).join("Settings.toml");
            if secrets_path.exists() {
                settings = Self::from_file(&secrets_path)?;
                println!("✓ Overriding settings from {}", secrets_path.display());
            } else {
                println!(
                    "ℹ DOCEXPIRY_SECRETS_DIR set but no Settings.toml found at: {}",
                    secrets_path.display()
                );
            }
        }

        Ok(settings)
    }

    /// Parse a single TOML settings file; missing sections fall back to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid TOML
    pub fn from_file(path: &std::path::Path) -> Result<Self, Box<dyn std::error::Error>> {
        let toml_content = fs::read_to_string(path)?;
        Ok(basic_toml::from_str(&toml_content)?)
    }

    /// Apply environment variable overrides to settings
    pub fn apply_env_overrides(settings: &mut Self) {
        Self::apply_application_env_overrides(&mut settings.application);
        Self::apply_google_env_overrides(&mut settings.google);
        Self::apply_sheet_env_overrides(&mut settings.sheets);
        Self::apply_token_store_env_overrides(&mut settings.token_store);
        Self::apply_notification_env_overrides(&mut settings.notifications);
        Self::apply_logging_env_overrides(&mut settings.logging);
    }

    fn apply_application_env_overrides(app_settings: &mut ApplicationSettings) {
        Self::apply_string_env_override("HOST", &mut app_settings.host);
        Self::apply_parsed_env_override("PORT", &mut app_settings.port);
        Self::apply_string_env_override("CORS_ORIGIN", &mut app_settings.cors_origin);
        Self::apply_string_env_override(
            "FRONTEND_SUMMARY_URL",
            &mut app_settings.frontend_summary_url,
        );
    }

    /// Apply environment overrides for the Google client settings
    pub fn apply_google_env_overrides(google_settings: &mut GoogleSettings) {
        Self::apply_string_env_override("GOOGLE_CLIENT_ID", &mut google_settings.client_id);
        Self::apply_string_env_override(
            "GOOGLE_CLIENT_SECRET",
            &mut google_settings.client_secret,
        );
        Self::apply_string_env_override("GOOGLE_REDIRECT_URL", &mut google_settings.redirect_url);
        Self::apply_parsed_env_override(
            "HTTP_TIMEOUT_SECONDS",
            &mut google_settings.http_timeout_seconds,
        );

        if let Ok(secret) = std::env::var("STATE_SECRET") {
            google_settings.state_secret = if secret.is_empty() { None } else { Some(secret) };
        }
    }

    fn apply_sheet_env_overrides(sheet_settings: &mut SheetSettings) {
        Self::apply_string_env_override("SHEET_RANGE", &mut sheet_settings.range);
    }

    /// Apply environment overrides for the token store settings
    pub fn apply_token_store_env_overrides(store_settings: &mut TokenStoreSettings) {
        Self::apply_string_env_override("TOKEN_STORE_BACKEND", &mut store_settings.backend);
        Self::apply_string_env_override("TOKEN_TABLE_NAME", &mut store_settings.table_name);
        Self::apply_string_env_override("AWS_REGION", &mut store_settings.region);
        Self::apply_parsed_env_override(
            "TOKEN_RETENTION_DAYS",
            &mut store_settings.retention_days,
        );
    }

    fn apply_notification_env_overrides(notification_settings: &mut NotificationSettings) {
        Self::apply_parsed_env_override(
            "REMINDER_WINDOW_DAYS",
            &mut notification_settings.reminder_window_days,
        );
    }

    fn apply_logging_env_overrides(logging_settings: &mut LoggingSettings) {
        Self::apply_string_env_override("RUST_LOG", &mut logging_settings.level);
    }

    /// Replace `target` with the variable's value when it is set and non-empty
    fn apply_string_env_override(env_var: &str, target: &mut String) {
        if let Ok(value) = std::env::var(env_var) {
            if !value.is_empty() {
                *target = value;
            }
        }
    }

    /// Replace `target` when the variable is set and parses; otherwise keep it
    fn apply_parsed_env_override<T: std::str::FromStr>(env_var: &str, target: &mut T) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<T>() {
                *target = value;
            }
        }
    }

    /// Get the bind address for the server
    #[must_use]
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.application.host, self.application.port)
    }

    /// Retention period attached to every stored credential
    #[must_use]
    pub fn token_retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.token_store.retention_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn clean_env_vars() {
        for var in [
            "GOOGLE_CLIENT_ID",
            "GOOGLE_CLIENT_SECRET",
            "GOOGLE_REDIRECT_URL",
            "HTTP_TIMEOUT_SECONDS",
            "STATE_SECRET",
            "TOKEN_STORE_BACKEND",
            "TOKEN_TABLE_NAME",
            "AWS_REGION",
            "TOKEN_RETENTION_DAYS",
            "DOCEXPIRY_SECRETS_DIR",
        ] {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = DocExpirySettings::default();

        assert_eq!(settings.application.cors_origin, "http://localhost:3000");
        assert_eq!(
            settings.application.frontend_summary_url,
            "http://localhost:3000/summary"
        );
        assert_eq!(settings.sheets.range, "Sheet1!A1:E10");
        assert_eq!(settings.token_store.table_name, "Token");
        assert_eq!(settings.token_store.retention_days, 30);
        assert_eq!(settings.google.http_timeout_seconds, 10);
        assert!(settings.google.state_secret.is_none());
        assert!(settings.google.scopes.iter().any(|s| s == "openid"));
        assert_eq!(settings.get_bind_address(), "0.0.0.0:8080");
    }

    #[test]
    #[serial]
    fn test_google_env_override() {
        clean_env_vars();

        let mut google_settings = GoogleSettings::default();
        std::env::set_var("GOOGLE_CLIENT_ID", "env-client-id");
        std::env::set_var("GOOGLE_CLIENT_SECRET", "env-client-secret");
        std::env::set_var("HTTP_TIMEOUT_SECONDS", "not-a-number");
        std::env::set_var("STATE_SECRET", "state-secret");

        DocExpirySettings::apply_google_env_overrides(&mut google_settings);

        assert_eq!(google_settings.client_id, "env-client-id");
        assert_eq!(google_settings.client_secret, "env-client-secret");
        // Unparseable values keep the default
        assert_eq!(google_settings.http_timeout_seconds, 10);
        assert_eq!(google_settings.state_secret.as_deref(), Some("state-secret"));

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_empty_state_secret_disables_signing() {
        clean_env_vars();

        let mut google_settings = GoogleSettings {
            state_secret: Some("from-file".to_string()),
            ..GoogleSettings::default()
        };
        std::env::set_var("STATE_SECRET", "");

        DocExpirySettings::apply_google_env_overrides(&mut google_settings);

        assert!(google_settings.state_secret.is_none());

        clean_env_vars();
    }

    #[test]
    #[serial]
    fn test_token_store_env_override() {
        clean_env_vars();

        let mut store_settings = TokenStoreSettings::default();
        std::env::set_var("TOKEN_STORE_BACKEND", "memory");
        std::env::set_var("TOKEN_RETENTION_DAYS", "7");

        DocExpirySettings::apply_token_store_env_overrides(&mut store_settings);

        assert_eq!(store_settings.backend, "memory");
        assert_eq!(store_settings.retention_days, 7);
        assert_eq!(store_settings.table_name, "Token");

        clean_env_vars();
    }

    #[test]
    fn test_partial_settings_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[application]\ncors_origin = \"https://app.example.com\"\n\n[google]\nclient_id = \"file-client\"\n"
        )
        .unwrap();

        let settings = DocExpirySettings::from_file(file.path()).unwrap();

        assert_eq!(settings.application.cors_origin, "https://app.example.com");
        assert_eq!(settings.application.port, 8080);
        assert_eq!(settings.google.client_id, "file-client");
        assert_eq!(
            settings.google.token_url,
            "https://oauth2.googleapis.com/token"
        );
        assert_eq!(settings.sheets.range, "Sheet1!A1:E10");
    }
}
