//! Response formatting for the FHIR search API.
//!
//! - [`operation_outcome`] - OperationOutcome generation
//! - [`bundle`] - searchset Bundle serialization

pub mod bundle;
pub mod operation_outcome;

pub use bundle::{BundleBuilder, searchset_bundle};
pub use operation_outcome::OperationOutcomeBuilder;
