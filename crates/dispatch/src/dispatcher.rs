//! Search dispatch.
//!
//! One dispatch is: compute the supplied names, match a handler, bind the
//! raw values against its signature, invoke it, and assemble the results.
//! Nothing here keeps per-request state, so a [`Dispatcher`] can be shared
//! across threads freely.

use std::time::Instant;

use tracing::{debug, warn};

use crate::binder::bind;
use crate::bundle::{ResultBundle, assemble};
use crate::error::{DispatchError, DispatchResult};
use crate::raw::RawParameterSet;
use crate::registry::{HandlerRegistry, SearchHandler, SharedRegistry};

/// Routes search requests to registered handlers.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: SharedRegistry,
}

impl Dispatcher {
    /// Creates a dispatcher over `registry`.
    pub fn new(registry: impl Into<SharedRegistry>) -> Self {
        Self {
            registry: registry.into(),
        }
    }

    /// Returns the shared registry, for registering handlers later.
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Registers a handler. Requests already in flight are unaffected.
    pub fn register(&self, handler: SearchHandler) {
        self.registry.register(handler);
    }

    /// Executes a search for `resource_type`.
    pub fn dispatch(&self, resource_type: &str, raw: &RawParameterSet) -> DispatchResult<ResultBundle> {
        let start = Instant::now();
        let snapshot = self.registry.snapshot();
        let supplied = raw.supplied_names();

        let handler = snapshot.match_handler(resource_type, &supplied)?;
        let bound = bind(handler.signature(), raw)?;

        let output = handler.invoke(&bound).map_err(|source| {
            warn!(
                resource_type = %resource_type,
                handler = %handler,
                error = %source,
                "Search handler failed"
            );
            DispatchError::HandlerExecutionFailure {
                resource_type: resource_type.to_string(),
                source,
            }
        })?;

        let bundle = assemble(output.into_resources());

        debug!(
            resource_type = %resource_type,
            handler = %handler,
            results = bundle.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Search dispatched"
        );

        Ok(bundle)
    }
}

impl From<HandlerRegistry> for Dispatcher {
    fn from(registry: HandlerRegistry) -> Self {
        Self::new(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::BoundParameters;
    use crate::error::{BindError, ErrorKind, HandlerError};
    use crate::params::ParamType;
    use crate::signature::{HandlerSignature, ParameterSpec};
    use serde_json::{Value, json};

    fn patient_dispatcher() -> Dispatcher {
        let mut registry = HandlerRegistry::new();
        registry.register_search("Patient", HandlerSignature::empty(), |_: &BoundParameters| {
            Ok::<_, HandlerError>(vec![
                json!({"resourceType": "Patient", "id": "1"}),
                json!({"resourceType": "Patient", "id": "2"}),
            ])
        });
        registry.register_search(
            "Patient",
            HandlerSignature::new(vec![ParameterSpec::required("_id", ParamType::String)]).unwrap(),
            |params: &BoundParameters| {
                let id = params.string("_id").map(|s| s.value().to_string());
                Ok::<_, HandlerError>(id.map(|id| json!({"resourceType": "Patient", "id": id})))
            },
        );
        Dispatcher::new(registry)
    }

    #[test]
    fn test_dispatch_default_handler() {
        let bundle = patient_dispatcher()
            .dispatch("Patient", &RawParameterSet::new())
            .unwrap();
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.entries()[1].title(), "Patient/2");
    }

    #[test]
    fn test_dispatch_specific_handler() {
        let raw = RawParameterSet::from_pairs(vec![("_id", "abc")]);
        let bundle = patient_dispatcher().dispatch("Patient", &raw).unwrap();
        assert_eq!(bundle.len(), 1);
        assert_eq!(bundle.entries()[0].resource()["id"], "abc");
    }

    #[test]
    fn test_empty_value_selects_default() {
        let raw = RawParameterSet::from_pairs(vec![("_id", "")]);
        let bundle = patient_dispatcher().dispatch("Patient", &raw).unwrap();
        assert_eq!(bundle.len(), 2);
    }

    #[test]
    fn test_unknown_type() {
        let err = patient_dispatcher()
            .dispatch("Encounter", &RawParameterSet::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoMatchingHandler);
    }

    #[test]
    fn test_malformed_value_is_reported_before_invocation() {
        let mut registry = HandlerRegistry::new();
        registry.register_search(
            "Observation",
            HandlerSignature::new(vec![ParameterSpec::required("subject", ParamType::Reference)]).unwrap(),
            |_: &BoundParameters| -> Result<Vec<Value>, HandlerError> {
                panic!("handler must not run on malformed input")
            },
        );
        let dispatcher = Dispatcher::new(registry);

        let raw = RawParameterSet::from_pairs(vec![("subject", "Patient//1")]);
        let err = dispatcher.dispatch("Observation", &raw).unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Bind(BindError::MalformedParameterValue { ref parameter, .. })
                if parameter == "subject"
        ));
    }

    #[test]
    fn test_handler_failure_is_wrapped() {
        let mut registry = HandlerRegistry::new();
        registry.register_search("Patient", HandlerSignature::empty(), |_: &BoundParameters| {
            Err::<Vec<Value>, _>("backend unavailable")
        });
        let dispatcher = Dispatcher::new(registry);

        let err = dispatcher
            .dispatch("Patient", &RawParameterSet::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::HandlerExecutionFailure);
        assert!(err.to_string().contains("backend unavailable"));
    }

    #[test]
    fn test_late_registration_is_visible() {
        let dispatcher = Dispatcher::new(HandlerRegistry::new());
        assert!(dispatcher.dispatch("Patient", &RawParameterSet::new()).is_err());

        dispatcher.register(SearchHandler::new(
            "Patient",
            HandlerSignature::empty(),
            |_: &BoundParameters| Ok::<_, HandlerError>(None),
        ));

        let bundle = dispatcher
            .dispatch("Patient", &RawParameterSet::new())
            .unwrap();
        assert!(bundle.is_empty());
    }
}
