//! Application state for the FHIR search API.
//!
//! Shared by every request handler: the search dispatcher and the server
//! configuration.

use std::sync::Arc;

use helios_dispatch::Dispatcher;

use crate::config::ServerConfig;

/// Shared application state for the search API.
///
/// # Example
///
/// ```rust
/// use helios_dispatch::{Dispatcher, HandlerRegistry};
/// use helios_rest::{AppState, ServerConfig};
///
/// let dispatcher = Dispatcher::new(HandlerRegistry::new());
/// let state = AppState::new(dispatcher, ServerConfig::default());
/// assert_eq!(state.base_url(), "http://localhost:8080");
/// ```
#[derive(Clone)]
pub struct AppState {
    /// The search dispatcher.
    dispatcher: Arc<Dispatcher>,

    /// Server configuration.
    config: Arc<ServerConfig>,
}

impl AppState {
    /// Creates a new AppState with the given dispatcher and configuration.
    pub fn new(dispatcher: Dispatcher, config: ServerConfig) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            config: Arc::new(config),
        }
    }

    /// Returns a reference to the dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Returns a clone of the dispatcher Arc, for moving onto a worker.
    pub fn dispatcher_arc(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Returns the base URL for the server, without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }
}
