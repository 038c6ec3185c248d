// HTTP request handlers
pub mod callback;
pub mod helpers;
pub mod login;
pub mod reminders;
pub mod system;

// Re-export the main handler functions
pub use callback::{oauth_callback, CallbackStage};
pub use login::login;
pub use reminders::reminders;
pub use system::{health, invalid_request, preflight};
