//! # helios-rest - FHIR Search over HTTP
//!
//! HTTP transport for the Helios search dispatch core. Query-string and
//! form-encoded search requests are normalized into a
//! [`RawParameterSet`](helios_dispatch::RawParameterSet), dispatched to the
//! best matching registered handler, and returned as FHIR `searchset`
//! Bundles.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use helios_dispatch::{Dispatcher, HandlerRegistry};
//! use helios_rest::{ServerConfig, create_app_with_config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::default();
//!     let dispatcher = Dispatcher::new(HandlerRegistry::new());
//!
//!     let app = create_app_with_config(dispatcher, config.clone());
//!
//!     let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Interaction | HTTP Method | URL Pattern |
//! |------------|-------------|-------------|
//! | search | GET | `/[type]?params` or `/[type]/_search?params` |
//! | search | POST | `/[type]/_search` (form body) |
//! | health | GET | `/health` |
//!
//! ## Error Handling
//!
//! All errors are returned as FHIR [OperationOutcome](https://hl7.org/fhir/operationoutcome.html)
//! resources:
//!
//! | HTTP Status | FHIR Issue Code | Description |
//! |-------------|-----------------|-------------|
//! | 400 | invalid | Missing or malformed search parameter |
//! | 400 | not-supported | No handler accepts the supplied parameters |
//! | 500 | exception | The search handler failed |
//!
//! ## Architecture
//!
//! - [`error`] - Error types and OperationOutcome generation
//! - [`config`] - Server configuration
//! - [`state`] - Application state (dispatcher, configuration)
//! - [`handlers`] - HTTP request handlers
//! - [`responses`] - Bundle and OperationOutcome formatting
//! - [`routing`] - Route configuration

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod responses;
pub mod routing;
pub mod state;

pub use config::ServerConfig;
pub use error::{RestError, RestResult};
pub use state::AppState;

use std::time::Duration;

use axum::{Router, extract::DefaultBodyLimit, http::StatusCode};
use helios_dispatch::Dispatcher;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

/// Creates the Axum application with default configuration.
pub fn create_app(dispatcher: Dispatcher) -> Router {
    create_app_with_config(dispatcher, ServerConfig::default())
}

/// Creates the Axum application with custom configuration.
///
/// # Example
///
/// ```rust
/// use helios_dispatch::{Dispatcher, HandlerRegistry};
/// use helios_rest::{ServerConfig, create_app_with_config};
///
/// let config = ServerConfig {
///     port: 3000,
///     enable_cors: true,
///     ..Default::default()
/// };
/// let app = create_app_with_config(Dispatcher::new(HandlerRegistry::new()), config);
/// ```
pub fn create_app_with_config(dispatcher: Dispatcher, config: ServerConfig) -> Router {
    info!(
        resource_types = ?dispatcher.registry().snapshot().resource_types(),
        "Creating search API server"
    );

    let state = AppState::new(dispatcher, config.clone());

    let router = routing::fhir_routes::create_routes(state);

    let service_builder = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.request_timeout),
        ));

    let router = router.layer(DefaultBodyLimit::max(config.max_body_size));

    let router = if config.enable_cors {
        router.layer(build_cors_layer(&config))
    } else {
        router
    };

    router.layer(service_builder)
}

/// Builds the CORS layer based on configuration.
fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let mut cors = CorsLayer::new();

    if config.cors_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    if config.cors_methods == "*" {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Vec<_> = config
            .cors_methods
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_methods(methods);
    }

    if config.cors_headers == "*" {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Vec<_> = config
            .cors_headers
            .split(',')
            .filter_map(|s| s.trim().parse().ok())
            .collect();
        cors = cors.allow_headers(headers);
    }

    cors
}

/// Initializes the tracing subscriber for logging.
///
/// This should be called once at application startup. `RUST_LOG` takes
/// precedence over `level`.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "helios_hfs={level},helios_rest={level},helios_dispatch={level},tower_http=debug"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
