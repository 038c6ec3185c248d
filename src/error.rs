//! Request-level error kinds
//!
//! Components return their own error types; handlers convert them into a
//! [`FlowError`] carrying the step-specific message sent back to the client.

use actix_web::http::StatusCode;
use thiserror::Error;

use crate::oauth::state::DecodeError;

#[derive(Debug, Error)]
pub enum FlowError {
    /// Bad input such as a missing or malformed spreadsheet ID
    #[error("{0}")]
    Validation(String),

    /// The state token could not be decoded
    #[error("{0}")]
    Decode(#[from] DecodeError),

    /// Code exchange failed or the token is invalid/expired without refresh
    #[error("{message}")]
    Auth { message: String, status: StatusCode },

    #[error("{0}")]
    Store(String),

    #[error("{0}")]
    Read(String),

    #[error("{0}")]
    Send(String),
}

impl FlowError {
    /// Authentication failure reported as 500, as the callback does
    #[must_use]
    pub fn auth(message: &str) -> Self {
        Self::Auth {
            message: message.to_string(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Authentication failure reported as 401
    #[must_use]
    pub fn unauthorized(message: &str) -> Self {
        Self::Auth {
            message: message.to_string(),
            status: StatusCode::UNAUTHORIZED,
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Auth { status, .. } => *status,
            Self::Decode(_) | Self::Store(_) | Self::Read(_) | Self::Send(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            FlowError::Validation("bad".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            FlowError::auth("authentication failed").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            FlowError::unauthorized("Unauthorized: Invalid token").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            FlowError::Store("error inserting into database".to_string()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            FlowError::Decode(DecodeError::Signature).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_display_is_the_response_message() {
        assert_eq!(
            FlowError::unauthorized("Unauthorized: Token refresh failed").to_string(),
            "Unauthorized: Token refresh failed"
        );
        assert_eq!(
            FlowError::Send("error sending email".to_string()).to_string(),
            "error sending email"
        );
    }
}
