//! In-memory resource catalog.
//!
//! Holds resources loaded from a JSON file and registers search handlers
//! that serve them. For each resource type present:
//!
//! | Handler | Required | Optional |
//! |---------|----------|----------|
//! | all resources of the type | - | `_id`, `identifier`, `code` |
//! | by subject (types with a `subject`) | `subject` (reference) | `_id`, `identifier`, `code` |
//!
//! Supplied parameters filter conjunctively. `code` is declared only for
//! types that carry a `code`.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use helios_dispatch::{
    BoundParameters, HandlerRegistry, HandlerSignature, ParamType, ParameterSpec, ReferenceParam,
    RegistryError, SearchHandler, TokenParam,
};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while loading a catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The data file could not be read.
    #[error("failed to read data file: {0}")]
    Io(#[from] std::io::Error),

    /// The data file is not a Bundle or an array of resources.
    #[error("data file is not a Bundle or an array of resources: {0}")]
    Json(#[from] serde_json::Error),

    /// An entry has no `resourceType`.
    #[error("resource at position {index} has no resourceType")]
    MissingResourceType {
        /// Position of the resource in the file.
        index: usize,
    },
}

/// The accepted data file layouts.
#[derive(Deserialize)]
#[serde(untagged)]
enum DataFile {
    Resources(Vec<Value>),
    Bundle {
        #[serde(default)]
        entry: Vec<DataEntry>,
    },
}

#[derive(Deserialize)]
struct DataEntry {
    resource: Option<Value>,
}

/// Resources grouped by type, in load order.
#[derive(Debug, Default)]
pub struct ResourceCatalog {
    by_type: BTreeMap<String, Vec<Value>>,
}

impl ResourceCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a catalog from a JSON file holding a Bundle or an array.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let reader = BufReader::new(File::open(path)?);
        let data: DataFile = serde_json::from_reader(reader)?;
        let catalog = Self::from_data(data)?;

        info!(
            path = %path.display(),
            resources = catalog.len(),
            resource_types = ?catalog.resource_types(),
            "Loaded resource catalog"
        );
        Ok(catalog)
    }

    /// Builds a catalog from an in-memory JSON document.
    pub fn from_json(document: Value) -> Result<Self, CatalogError> {
        Self::from_data(serde_json::from_value(document)?)
    }

    fn from_data(data: DataFile) -> Result<Self, CatalogError> {
        let resources: Vec<Value> = match data {
            DataFile::Resources(resources) => resources,
            DataFile::Bundle { entry } => entry.into_iter().filter_map(|e| e.resource).collect(),
        };

        let mut catalog = Self::new();
        for (index, resource) in resources.into_iter().enumerate() {
            catalog.insert(resource).ok_or(CatalogError::MissingResourceType { index })?;
        }
        Ok(catalog)
    }

    /// Adds a resource. Returns `None` if it has no `resourceType`.
    pub fn insert(&mut self, resource: Value) -> Option<()> {
        let resource_type = resource.get("resourceType")?.as_str()?.to_string();
        self.by_type.entry(resource_type).or_default().push(resource);
        Some(())
    }

    /// Returns the resource types present, sorted.
    pub fn resource_types(&self) -> Vec<&str> {
        self.by_type.keys().map(String::as_str).collect()
    }

    /// Returns the resources of a type, in load order.
    pub fn resources(&self, resource_type: &str) -> &[Value] {
        self.by_type
            .get(resource_type)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns the total number of resources.
    pub fn len(&self) -> usize {
        self.by_type.values().map(Vec::len).sum()
    }

    fn filter<F>(&self, resource_type: &str, predicate: F) -> Vec<Value>
    where
        F: Fn(&Value) -> bool,
    {
        self.resources(resource_type)
            .iter()
            .filter(|r| predicate(r))
            .cloned()
            .collect()
    }

    /// Builds a registry with the catalog's search handlers.
    pub fn build_registry(self: Arc<Self>) -> Result<HandlerRegistry, RegistryError> {
        let mut registry = HandlerRegistry::new();

        for resource_type in self.resource_types() {
            for handler in self.handlers_for(resource_type)? {
                registry.register(handler);
            }
        }

        if registry.is_empty() {
            warn!("Resource catalog is empty; every search will fail with no matching handler");
        }
        Ok(registry)
    }

    fn handlers_for(self: &Arc<Self>, resource_type: &str) -> Result<Vec<SearchHandler>, RegistryError> {
        let resources = self.resources(resource_type);
        let has_subject = resources.iter().any(|r| r.get("subject").is_some());
        let has_code = resources.iter().any(|r| r.get("code").is_some());

        let mut filters = vec![
            ParameterSpec::optional("_id", ParamType::String),
            ParameterSpec::optional("identifier", ParamType::Token),
        ];
        if has_code {
            filters.push(ParameterSpec::optional("code", ParamType::TokenOrList));
        }

        let mut handlers = Vec::with_capacity(2);
        handlers.push(
            self.filtered_handler(resource_type, HandlerSignature::new(filters.clone())?)
                .named(format!("{} (all)", resource_type)),
        );

        // Requires one more parameter than the default handler, so the two
        // never tie.
        if has_subject {
            let mut params = vec![ParameterSpec::required("subject", ParamType::Reference)];
            params.extend(filters);
            handlers.push(
                self.filtered_handler(resource_type, HandlerSignature::new(params)?)
                    .named(format!("{} by subject", resource_type)),
            );
        }

        debug!(resource_type = %resource_type, handlers = handlers.len(), "Built catalog search handlers");
        Ok(handlers)
    }

    fn filtered_handler(self: &Arc<Self>, resource_type: &str, signature: HandlerSignature) -> SearchHandler {
        let catalog = Arc::clone(self);
        let ty = resource_type.to_string();
        SearchHandler::new(resource_type, signature, move |params: &BoundParameters| {
            Ok::<_, Infallible>(catalog.filter(&ty, |r| matches_all(r, params)))
        })
    }
}

/// Applies every bound parameter as a conjunctive filter.
fn matches_all(resource: &Value, params: &BoundParameters) -> bool {
    let id_matches = params
        .string("_id")
        .is_none_or(|id| resource.get("id").and_then(Value::as_str) == Some(id.value()));
    let identifier_matches = params.token("identifier").is_none_or(|token| {
        elements(resource.get("identifier")).any(|i| token_matches(token, i.get("system"), i.get("value")))
    });
    let subject_matches = params.reference("subject").is_none_or(|subject| {
        resource
            .pointer("/subject/reference")
            .and_then(Value::as_str)
            .is_some_and(|reference| reference_matches(reference, subject))
    });
    let code_matches = params.token_list("code").is_none_or(|codes| {
        elements(resource.pointer("/code/coding"))
            .any(|coding| codes.iter().any(|t| token_matches(t, coding.get("system"), coding.get("code"))))
    });

    id_matches && identifier_matches && subject_matches && code_matches
}

/// Iterates over a JSON array, or nothing.
fn elements(value: Option<&Value>) -> impl Iterator<Item = &Value> {
    value.and_then(Value::as_array).into_iter().flatten()
}

/// Matches a token against a system/value pair.
///
/// No system in the token matches any system. An explicitly empty system
/// (`|code`) only matches values without a system.
fn token_matches(token: &TokenParam, system: Option<&Value>, value: Option<&Value>) -> bool {
    if value.and_then(Value::as_str) != Some(token.code()) {
        return false;
    }
    match token.system() {
        None => true,
        Some("") => system.and_then(Value::as_str).is_none_or(str::is_empty),
        Some(expected) => system.and_then(Value::as_str) == Some(expected),
    }
}

/// Matches a stored reference string (relative or absolute, possibly
/// versioned) against a reference parameter.
///
/// A versioned parameter only matches a reference to that same version.
fn reference_matches(reference: &str, param: &ReferenceParam) -> bool {
    let (unversioned, version) = match reference.split_once("/_history/") {
        Some((head, version)) => (head, Some(version)),
        None => (reference, None),
    };
    if param.version().is_some_and(|expected| version != Some(expected)) {
        return false;
    }

    let mut segments = unversioned.rsplit('/');
    let Some(id) = segments.next() else {
        return false;
    };
    if id != param.id_part() {
        return false;
    }
    match param.resource_type() {
        Some(expected) => segments.next() == Some(expected),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helios_dispatch::{Dispatcher, ErrorKind, RawParameterSet};
    use serde_json::json;

    fn sample_bundle() -> Value {
        json!({
            "resourceType": "Bundle",
            "type": "collection",
            "entry": [
                {"resource": {
                    "resourceType": "Patient",
                    "id": "100",
                    "identifier": [{"system": "urn:mrn", "value": "MRN1"}],
                    "name": [{"family": "Smith"}]
                }},
                {"resource": {
                    "resourceType": "Patient",
                    "id": "101",
                    "identifier": [{"value": "MRN2"}],
                    "name": [{"family": "Jones"}]
                }},
                {"resource": {
                    "resourceType": "Observation",
                    "id": "obs-1",
                    "subject": {"reference": "Patient/100"},
                    "code": {"coding": [{"system": "http://loinc.org", "code": "3141-9"}]}
                }},
                {"resource": {
                    "resourceType": "Observation",
                    "id": "obs-2",
                    "subject": {"reference": "http://example.org/fhir/Patient/100/_history/2"},
                    "code": {"coding": [{"system": "http://loinc.org", "code": "8302-2"}]}
                }},
                {"resource": {
                    "resourceType": "Observation",
                    "id": "obs-3",
                    "subject": {"reference": "Patient/101"},
                    "code": {"coding": [{"system": "http://loinc.org", "code": "3141-9"}]}
                }},
                {"fullUrl": "urn:uuid:no-resource"}
            ]
        })
    }

    fn dispatcher() -> Dispatcher {
        let catalog = Arc::new(ResourceCatalog::from_json(sample_bundle()).unwrap());
        Dispatcher::new(catalog.build_registry().unwrap())
    }

    fn ids(dispatcher: &Dispatcher, resource_type: &str, pairs: &[(&str, &str)]) -> Vec<String> {
        let raw = RawParameterSet::from_pairs(pairs.iter().copied());
        dispatcher
            .dispatch(resource_type, &raw)
            .unwrap()
            .iter()
            .map(|e| e.resource()["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_load_bundle_and_array() {
        let catalog = ResourceCatalog::from_json(sample_bundle()).unwrap();
        assert_eq!(catalog.len(), 5);
        assert_eq!(catalog.resource_types(), vec!["Observation", "Patient"]);

        let catalog = ResourceCatalog::from_json(json!([
            {"resourceType": "Patient", "id": "1"}
        ]))
        .unwrap();
        assert_eq!(catalog.resources("Patient").len(), 1);
    }

    #[test]
    fn test_missing_resource_type_rejected() {
        let err = ResourceCatalog::from_json(json!([{"id": "1"}])).unwrap_err();
        assert!(matches!(err, CatalogError::MissingResourceType { index: 0 }));
    }

    #[test]
    fn test_not_a_data_file() {
        assert!(matches!(
            ResourceCatalog::from_json(json!("nope")),
            Err(CatalogError::Json(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        serde_json::to_writer(&mut file, &sample_bundle()).unwrap();

        let catalog = ResourceCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.resources("Observation").len(), 3);
    }

    #[test]
    fn test_default_search() {
        assert_eq!(ids(&dispatcher(), "Patient", &[]), vec!["100", "101"]);
    }

    #[test]
    fn test_search_by_id() {
        let dispatcher = dispatcher();
        assert_eq!(ids(&dispatcher, "Patient", &[("_id", "101")]), vec!["101"]);
        assert!(ids(&dispatcher, "Patient", &[("_id", "999")]).is_empty());
    }

    #[test]
    fn test_search_by_identifier() {
        let dispatcher = dispatcher();
        assert_eq!(ids(&dispatcher, "Patient", &[("identifier", "MRN1")]), vec!["100"]);
        assert_eq!(ids(&dispatcher, "Patient", &[("identifier", "urn:mrn|MRN1")]), vec!["100"]);
        assert!(ids(&dispatcher, "Patient", &[("identifier", "urn:other|MRN1")]).is_empty());
        assert_eq!(ids(&dispatcher, "Patient", &[("identifier", "|MRN2")]), vec!["101"]);
        assert!(ids(&dispatcher, "Patient", &[("identifier", "|MRN1")]).is_empty());
    }

    #[test]
    fn test_search_by_subject() {
        let dispatcher = dispatcher();
        assert_eq!(
            ids(&dispatcher, "Observation", &[("subject", "Patient/100")]),
            vec!["obs-1", "obs-2"]
        );
        assert_eq!(
            ids(&dispatcher, "Observation", &[("subject:Patient", "101")]),
            vec!["obs-3"]
        );
        assert_eq!(
            ids(&dispatcher, "Observation", &[("subject", "100")]),
            vec!["obs-1", "obs-2"]
        );
    }

    #[test]
    fn test_search_by_subject_and_code() {
        let dispatcher = dispatcher();
        assert_eq!(
            ids(
                &dispatcher,
                "Observation",
                &[("subject", "Patient/100"), ("code", "http://loinc.org|8302-2")]
            ),
            vec!["obs-2"]
        );
        assert_eq!(
            ids(
                &dispatcher,
                "Observation",
                &[("subject", "Patient/100"), ("code", "3141-9,8302-2")]
            ),
            vec!["obs-1", "obs-2"]
        );
    }

    #[test]
    fn test_subject_handler_only_for_types_with_subject() {
        let bundle = dispatcher()
            .dispatch(
                "Patient",
                &RawParameterSet::from_pairs(vec![("subject", "Patient/1")]),
            )
            .unwrap();
        // Patient has no subject handler, so the default handler serves it.
        assert_eq!(bundle.len(), 2);
    }

    #[test]
    fn test_unknown_type() {
        let err = dispatcher()
            .dispatch("Encounter", &RawParameterSet::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoMatchingHandler);
    }

    #[test]
    fn test_reference_matches() {
        let typed = ReferenceParam::parse("Patient/100").unwrap();
        assert!(reference_matches("Patient/100", &typed));
        assert!(reference_matches("http://x/fhir/Patient/100", &typed));
        assert!(reference_matches("Patient/100/_history/3", &typed));
        assert!(!reference_matches("Group/100", &typed));
        assert!(!reference_matches("Patient/1000", &typed));

        let bare = ReferenceParam::parse("100").unwrap();
        assert!(reference_matches("Group/100", &bare));
    }

    #[test]
    fn test_versioned_reference_matches_same_version_only() {
        let versioned = ReferenceParam::parse("Patient/100/_history/1").unwrap();
        assert!(reference_matches("Patient/100/_history/1", &versioned));
        assert!(reference_matches("http://x/fhir/Patient/100/_history/1", &versioned));
        assert!(!reference_matches("Patient/100/_history/2", &versioned));
        assert!(!reference_matches("Patient/100", &versioned));
    }

    #[test]
    fn test_versioned_subject_search() {
        let dispatcher = dispatcher();
        assert_eq!(
            ids(&dispatcher, "Observation", &[("subject", "Patient/100/_history/2")]),
            vec!["obs-2"]
        );
        assert!(ids(&dispatcher, "Observation", &[("subject", "Patient/100/_history/1")]).is_empty());
    }

    #[test]
    fn test_id_and_subject_filter_together() {
        let dispatcher = dispatcher();
        assert!(
            ids(&dispatcher, "Observation", &[("_id", "obs-1"), ("subject", "Patient/101")]).is_empty()
        );
        assert_eq!(
            ids(&dispatcher, "Observation", &[("_id", "obs-3"), ("subject", "Patient/101")]),
            vec!["obs-3"]
        );
    }

    #[test]
    fn test_id_and_identifier_filter_together() {
        let dispatcher = dispatcher();
        assert!(ids(&dispatcher, "Patient", &[("_id", "101"), ("identifier", "MRN1")]).is_empty());
        assert_eq!(
            ids(&dispatcher, "Patient", &[("_id", "100"), ("identifier", "MRN1")]),
            vec!["100"]
        );
    }

    #[test]
    fn test_code_without_subject() {
        assert_eq!(
            ids(&dispatcher(), "Observation", &[("code", "3141-9")]),
            vec!["obs-1", "obs-3"]
        );
    }

    #[test]
    fn test_handlers_never_tie() {
        let catalog = Arc::new(ResourceCatalog::from_json(sample_bundle()).unwrap());
        let registry = Arc::clone(&catalog).build_registry().unwrap();

        for resource_type in catalog.resource_types() {
            let mut counts: Vec<usize> = registry
                .handlers_for(resource_type)
                .iter()
                .map(|h| h.signature().required_count())
                .collect();
            let total = counts.len();
            counts.sort_unstable();
            counts.dedup();
            assert_eq!(counts.len(), total, "tied handlers for {resource_type}");
        }
    }
}
