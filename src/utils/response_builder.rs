//! HTTP response construction with a fixed CORS policy
//!
//! Every response leaving the service carries the same CORS header set. The
//! policy is built once from settings and each route only decorates the
//! status, location and body.

use actix_web::http::{header, StatusCode};
use actix_web::HttpResponse;
use serde::Serialize;

use crate::error::FlowError;
use crate::settings::ApplicationSettings;

pub const ALLOWED_METHODS: &str = "GET,POST,PUT,DELETE,OPTIONS";
pub const ALLOWED_HEADERS: &str =
    "Content-Type,X-Amz-Date,Authorization,X-Api-Key,X-Amz-Security-Token";

/// Fixed CORS header set attached to every response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsPolicy {
    pub allow_origin: String,
    pub allow_credentials: bool,
    pub allow_methods: String,
    pub allow_headers: String,
}

impl CorsPolicy {
    #[must_use]
    pub fn new(allow_origin: &str) -> Self {
        Self {
            allow_origin: allow_origin.to_string(),
            allow_credentials: true,
            allow_methods: ALLOWED_METHODS.to_string(),
            allow_headers: ALLOWED_HEADERS.to_string(),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &ApplicationSettings) -> Self {
        Self::new(&settings.cors_origin)
    }

    /// Header pairs in the order they are written
    #[must_use]
    pub fn headers(&self) -> [(header::HeaderName, String); 4] {
        [
            (
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                self.allow_origin.clone(),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                self.allow_credentials.to_string(),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                self.allow_methods.clone(),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                self.allow_headers.clone(),
            ),
        ]
    }
}

/// Builder for responses decorated with a [`CorsPolicy`]
pub struct ResponseBuilder<'a> {
    cors: &'a CorsPolicy,
    status: StatusCode,
    location: Option<String>,
    content_type: &'static str,
    body: String,
}

impl<'a> ResponseBuilder<'a> {
    /// Start a response with the given status
    #[must_use]
    pub fn new(cors: &'a CorsPolicy, status: StatusCode) -> Self {
        Self {
            cors,
            status,
            location: None,
            content_type: "application/json",
            body: String::new(),
        }
    }

    /// Redirect response (302 Found, 307 Temporary Redirect, ...)
    #[must_use]
    pub fn redirect(cors: &'a CorsPolicy, status: StatusCode, location: &str) -> HttpResponse {
        Self::new(cors, status).with_location(location).build()
    }

    /// Empty 200 response answering a CORS preflight request
    #[must_use]
    pub fn preflight(cors: &'a CorsPolicy) -> HttpResponse {
        Self::new(cors, StatusCode::OK).build()
    }

    /// Error response carrying the step-specific message as a plain-text body
    #[must_use]
    pub fn error(cors: &'a CorsPolicy, error: &FlowError) -> HttpResponse {
        Self::new(cors, error.status())
            .with_body(error.to_string())
            .build()
    }

    #[must_use]
    pub fn with_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize `value` as the response body
    #[must_use]
    pub fn with_json<T: Serialize>(mut self, value: &T) -> Self {
        self.body = serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string());
        self
    }

    #[must_use]
    pub fn build(self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status);
        builder.insert_header((header::CONTENT_TYPE, self.content_type));
        for header_pair in self.cors.headers() {
            builder.insert_header(header_pair);
        }
        if let Some(location) = self.location {
            builder.insert_header((header::LOCATION, location));
        }
        builder.body(self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    fn header_value<'r>(response: &'r HttpResponse, name: &str) -> Option<&'r str> {
        response
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
    }

    #[test]
    fn test_preflight_carries_full_cors_set() {
        let cors = CorsPolicy::new("http://localhost:3000");
        let response = ResponseBuilder::preflight(&cors);

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            header_value(&response, "access-control-allow-origin"),
            Some("http://localhost:3000")
        );
        assert_eq!(
            header_value(&response, "access-control-allow-credentials"),
            Some("true")
        );
        assert_eq!(
            header_value(&response, "access-control-allow-methods"),
            Some(ALLOWED_METHODS)
        );
        assert_eq!(
            header_value(&response, "access-control-allow-headers"),
            Some(ALLOWED_HEADERS)
        );
    }

    #[test]
    fn test_redirect_sets_location() {
        let cors = CorsPolicy::new("http://localhost:3000");
        let response = ResponseBuilder::redirect(
            &cors,
            StatusCode::FOUND,
            "http://localhost:3000/summary",
        );

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            header_value(&response, "location"),
            Some("http://localhost:3000/summary")
        );
        assert!(header_value(&response, "access-control-allow-origin").is_some());
    }

    #[actix_web::test]
    async fn test_error_response_uses_flow_status_and_message() {
        let cors = CorsPolicy::new("https://app.example.com");
        let response =
            ResponseBuilder::error(&cors, &FlowError::Validation("missing code".to_string()));

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            header_value(&response, "access-control-allow-origin"),
            Some("https://app.example.com")
        );
        let body = to_bytes(response.into_body()).await.unwrap();
        assert_eq!(&body[..], b"missing code");
    }
}
