use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse};
use log::debug;

use crate::app::AppState;
use crate::error::FlowError;
use crate::models::HealthResponse;
use crate::utils::response_builder::ResponseBuilder;

/// Health check endpoint
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    ResponseBuilder::new(&state.cors, StatusCode::OK)
        .with_json(&HealthResponse {
            status: "ok".to_string(),
            message: format!("docexpiry {} is running", crate::VERSION),
        })
        .build()
}

/// CORS preflight for any path
pub async fn preflight(state: web::Data<AppState>) -> HttpResponse {
    ResponseBuilder::preflight(&state.cors)
}

pub async fn invalid_request(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    debug!("No route for {} {}", req.method(), req.path());
    ResponseBuilder::error(
        &state.cors,
        &FlowError::Validation("Invalid Request".to_string()),
    )
}
