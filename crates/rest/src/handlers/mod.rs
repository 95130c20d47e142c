//! HTTP request handlers.
//!
//! - [`search`] - Search for resources
//! - [`health`] - Health check endpoint

pub mod health;
pub mod search;

pub use health::health_handler;
pub use search::{search_get_handler, search_post_handler};
