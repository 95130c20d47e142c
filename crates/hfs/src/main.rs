//! Helios FHIR Server (HFS)
//!
//! Serves FHIR search over HTTP from an in-memory resource catalog.

mod catalog;

use std::sync::Arc;

use clap::Parser;
use helios_dispatch::Dispatcher;
use helios_rest::{ServerConfig, create_app_with_config, init_logging};
use tracing::{info, warn};

use crate::catalog::ResourceCatalog;

/// Starts the Axum HTTP server.
async fn serve(app: axum::Router, config: &ServerConfig) -> anyhow::Result<()> {
    let addr = config.socket_addr();
    info!(address = %addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        port = config.port,
        host = %config.host,
        base_url = %config.base_url(),
        "Starting Helios FHIR Server"
    );

    let catalog = match &config.data_file {
        Some(path) => ResourceCatalog::load(path)?,
        None => {
            warn!("No data file configured (REST_DATA_FILE); serving an empty catalog");
            ResourceCatalog::new()
        }
    };

    let registry = Arc::new(catalog).build_registry()?;
    let dispatcher = Dispatcher::new(registry);

    let app = create_app_with_config(dispatcher, config.clone());
    serve(app, &config).await
}
