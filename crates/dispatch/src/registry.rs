//! Search handler registry and matching.
//!
//! Handlers are registered per resource type. For a request, the matcher
//! keeps every handler whose required parameters were all supplied and picks
//! the one with the most required parameters. Supplied names a handler does
//! not declare never disqualify it.
//!
//! Equal required-set sizes are resolved by registration order. That is
//! deterministic but usually means two handlers overlap, so it is logged
//! both at registration and whenever a request actually hits the tie.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::binder::BoundParameters;
use crate::error::{DispatchError, HandlerError};
use crate::signature::HandlerSignature;

/// Boxed handler callable.
pub type SearchFn = dyn Fn(&BoundParameters) -> Result<HandlerOutput, HandlerError> + Send + Sync;

/// What a handler callable produced.
///
/// Handlers may return a single resource, possibly absent, or a list.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutput {
    /// Zero or one resource.
    Single(Option<Value>),
    /// Any number of resources, in result order.
    List(Vec<Value>),
}

impl HandlerOutput {
    /// Normalizes the output to a list. An absent single resource is an
    /// empty list.
    pub fn into_resources(self) -> Vec<Value> {
        match self {
            HandlerOutput::Single(resource) => resource.into_iter().collect(),
            HandlerOutput::List(resources) => resources,
        }
    }
}

impl From<Value> for HandlerOutput {
    fn from(resource: Value) -> Self {
        HandlerOutput::Single(Some(resource))
    }
}

impl From<Option<Value>> for HandlerOutput {
    fn from(resource: Option<Value>) -> Self {
        HandlerOutput::Single(resource)
    }
}

impl From<Vec<Value>> for HandlerOutput {
    fn from(resources: Vec<Value>) -> Self {
        HandlerOutput::List(resources)
    }
}

/// A registered search handler.
#[derive(Clone)]
pub struct SearchHandler {
    resource_type: String,
    name: Option<String>,
    signature: HandlerSignature,
    callable: Arc<SearchFn>,
}

impl SearchHandler {
    /// Creates a handler for `resource_type`.
    ///
    /// The callable may return anything convertible into [`HandlerOutput`]
    /// and any error convertible into [`HandlerError`].
    pub fn new<F, R, E>(resource_type: impl Into<String>, signature: HandlerSignature, f: F) -> Self
    where
        F: Fn(&BoundParameters) -> Result<R, E> + Send + Sync + 'static,
        R: Into<HandlerOutput>,
        E: Into<HandlerError>,
    {
        let callable = move |params: &BoundParameters| -> Result<HandlerOutput, HandlerError> {
            f(params).map(Into::into).map_err(Into::into)
        };
        Self {
            resource_type: resource_type.into(),
            name: None,
            signature,
            callable: Arc::new(callable),
        }
    }

    /// Sets a label used in log output.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns the target resource type.
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Returns the label, if one was set.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the declared signature.
    pub fn signature(&self) -> &HandlerSignature {
        &self.signature
    }

    /// Calls the handler.
    pub fn invoke(&self, params: &BoundParameters) -> Result<HandlerOutput, HandlerError> {
        (self.callable)(params)
    }
}

impl fmt::Display for SearchHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}",
            self.name.as_deref().unwrap_or(&self.resource_type),
            self.signature
        )
    }
}

impl fmt::Debug for SearchHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchHandler")
            .field("resource_type", &self.resource_type)
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// Handlers grouped by resource type, in registration order.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Vec<SearchHandler>>,
}

impl HandlerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler to its resource type's list.
    pub fn register(&mut self, handler: SearchHandler) {
        let existing = self
            .handlers
            .entry(handler.resource_type.clone())
            .or_default();

        let cardinality = handler.signature.required_count();
        for other in existing.iter() {
            if other.signature.required_count() == cardinality {
                warn!(
                    resource_type = %handler.resource_type,
                    handler = %handler,
                    registered = %other,
                    required = cardinality,
                    "Search handlers share a required-parameter count; ties resolve to the first registered"
                );
            }
        }

        info!(
            resource_type = %handler.resource_type,
            handler = %handler,
            "Registered search handler"
        );
        existing.push(handler);
    }

    /// Builds and registers a handler in one step.
    pub fn register_search<F, R, E>(
        &mut self,
        resource_type: impl Into<String>,
        signature: HandlerSignature,
        f: F,
    ) where
        F: Fn(&BoundParameters) -> Result<R, E> + Send + Sync + 'static,
        R: Into<HandlerOutput>,
        E: Into<HandlerError>,
    {
        self.register(SearchHandler::new(resource_type, signature, f));
    }

    /// Returns the handlers of a resource type, in registration order.
    pub fn handlers_for(&self, resource_type: &str) -> &[SearchHandler] {
        self.handlers
            .get(resource_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the resource types with at least one handler, sorted.
    pub fn resource_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.handlers.keys().cloned().collect();
        types.sort();
        types
    }

    /// Returns the total number of handlers.
    pub fn len(&self) -> usize {
        self.handlers.values().map(Vec::len).sum()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Selects the best handler for the supplied parameter names.
    ///
    /// `supplied` must already exclude names supplied only with empty values.
    pub fn match_handler(
        &self,
        resource_type: &str,
        supplied: &BTreeSet<String>,
    ) -> Result<&SearchHandler, DispatchError> {
        let mut best: Option<&SearchHandler> = None;
        let mut tied: Vec<&SearchHandler> = Vec::new();

        for candidate in self
            .handlers_for(resource_type)
            .iter()
            .filter(|h| h.signature.is_satisfied_by(supplied))
        {
            match best {
                Some(current)
                    if candidate.signature.required_count()
                        <= current.signature.required_count() =>
                {
                    if candidate.signature.required_count() == current.signature.required_count() {
                        tied.push(candidate);
                    }
                }
                _ => {
                    best = Some(candidate);
                    tied.clear();
                }
            }
        }

        let Some(handler) = best else {
            return Err(DispatchError::NoMatchingHandler {
                resource_type: resource_type.to_string(),
                supplied: supplied.iter().cloned().collect(),
            });
        };

        if !tied.is_empty() {
            warn!(
                resource_type = %resource_type,
                selected = %handler,
                tied = ?tied.iter().map(|h| h.to_string()).collect::<Vec<_>>(),
                "Ambiguous search handler match resolved by registration order"
            );
        }

        debug!(resource_type = %resource_type, handler = %handler, "Matched search handler");
        Ok(handler)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handler_count", &self.len())
            .field("resource_types", &self.resource_types())
            .finish()
    }
}

/// A registry that can still accept handlers while serving requests.
///
/// Readers load an immutable snapshot without locking. Writers are
/// serialized, copy the current registry, append, and swap the copy in.
#[derive(Clone)]
pub struct SharedRegistry {
    current: Arc<ArcSwap<HandlerRegistry>>,
    write_lock: Arc<Mutex<()>>,
}

impl SharedRegistry {
    /// Wraps a registry built at startup.
    pub fn new(registry: HandlerRegistry) -> Self {
        Self {
            current: Arc::new(ArcSwap::from_pointee(registry)),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<HandlerRegistry> {
        self.current.load_full()
    }

    /// Registers a handler by publishing a new snapshot.
    ///
    /// Requests already holding the previous snapshot keep using it.
    pub fn register(&self, handler: SearchHandler) {
        let _guard = self.write_lock.lock();
        let mut next = HandlerRegistry::clone(&self.current.load());
        next.register(handler);
        self.current.store(Arc::new(next));
    }
}

impl From<HandlerRegistry> for SharedRegistry {
    fn from(registry: HandlerRegistry) -> Self {
        Self::new(registry)
    }
}

impl fmt::Debug for SharedRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedRegistry")
            .field(&*self.current.load())
            .finish()
    }
}
