pub mod crypto;
pub mod logging;
pub mod response_builder;

pub use logging::LoggingHelper;
pub use response_builder::{CorsPolicy, ResponseBuilder};
