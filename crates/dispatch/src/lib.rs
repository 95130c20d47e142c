//! # Helios Search Dispatch
//!
//! Request binding and dispatch core for FHIR search.
//!
//! A search request is a resource type plus a set of raw name/value pairs.
//! This crate turns it into a call on the most specific registered handler
//! and wraps the handler's output into an ordered, titled result bundle.
//!
//! ## Overview
//!
//! - [`params`]: typed search parameter values (string, token, token list,
//!   reference) and their parsers
//! - [`signature`]: declared handler parameter lists
//! - [`raw`]: transport-independent raw parameter sets
//! - [`binder`]: raw values to typed values, per signature
//! - [`registry`]: handler registration and best-match selection
//! - [`dispatcher`]: the end-to-end search entry point
//! - [`bundle`]: result bundle assembly and entry titles
//!
//! ## Example
//!
//! ```
//! use helios_dispatch::{
//!     BoundParameters, Dispatcher, HandlerError, HandlerRegistry, HandlerSignature, ParamType,
//!     ParameterSpec, RawParameterSet,
//! };
//! use serde_json::json;
//!
//! let mut registry = HandlerRegistry::new();
//! registry.register_search(
//!     "Patient",
//!     HandlerSignature::new(vec![ParameterSpec::required("_id", ParamType::String)]).unwrap(),
//!     |params: &BoundParameters| {
//!         let id = params.string("_id").map(|s| s.value().to_string());
//!         Ok::<_, HandlerError>(json!({ "resourceType": "Patient", "id": id }))
//!     },
//! );
//!
//! let dispatcher = Dispatcher::new(registry);
//! let raw = RawParameterSet::from_pairs(vec![("_id", "123")]);
//! let bundle = dispatcher.dispatch("Patient", &raw).unwrap();
//!
//! assert_eq!(bundle.len(), 1);
//! assert_eq!(bundle.entries()[0].title(), "Patient/123");
//! ```

#![warn(missing_docs)]

pub mod binder;
pub mod bundle;
pub mod dispatcher;
pub mod error;
pub mod params;
pub mod raw;
pub mod registry;
pub mod signature;

pub use binder::{BoundParameters, bind};
pub use bundle::{BundleEntry, ResultBundle, assemble, entry_title};
pub use dispatcher::Dispatcher;
pub use error::{BindError, DispatchError, DispatchResult, ErrorKind, HandlerError, RegistryError};
pub use params::{
    ParamError, ParamType, ReferenceParam, SearchParam, StringParam, TokenOrListParam, TokenParam,
};
pub use raw::{RawParameterSet, RawValue};
pub use registry::{HandlerOutput, HandlerRegistry, SearchFn, SearchHandler, SharedRegistry};
pub use signature::{HandlerSignature, ParameterSpec};
