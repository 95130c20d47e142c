//! Route configuration for the FHIR search API.

pub mod fhir_routes;

pub use fhir_routes::create_routes;
