//! FHIR route configuration.

use axum::{Router, routing::get};

use crate::handlers;
use crate::state::AppState;

/// Creates all search API routes.
///
/// # Routes
///
/// - `GET /health` - Health check
/// - `GET /{type}` - Search
/// - `GET /{type}/_search` - Search
/// - `POST /{type}/_search` - Search (form body)
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/{resource_type}", get(handlers::search_get_handler))
        .route(
            "/{resource_type}/_search",
            get(handlers::search_get_handler).post(handlers::search_post_handler),
        )
        .with_state(state)
}
