//! Health check endpoint handler.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::state::AppState;

/// Handler for the health check endpoint.
///
/// Reports which resource types currently have search handlers.
///
/// # HTTP Request
///
/// `GET [base]/health`
pub async fn health_handler(State(state): State<AppState>) -> Response {
    debug!("Processing health check request");

    let registry = state.dispatcher().registry().snapshot();

    let health_response = serde_json::json!({
        "status": "healthy",
        "resourceTypes": registry.resource_types(),
        "handlers": registry.len(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    });

    (StatusCode::OK, Json(health_response)).into_response()
}
