#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the docexpiry application
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod app;
pub mod error;
pub mod google;
pub mod handlers;
pub mod models;
pub mod notifier;
pub mod oauth;
pub mod settings;
pub mod sheets;
pub mod store;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use app::{configure_services, AppState};
pub use error::FlowError;
pub use models::{Credential, DocumentRecord, UserProfile};
pub use oauth::state::{OAuthState, StateCodec};
pub use settings::DocExpirySettings;
pub use store::{MemoryTokenStore, TokenStore};
