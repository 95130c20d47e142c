//! Searchset Bundle serialization.
//!
//! Renders a dispatch [`ResultBundle`] as a FHIR JSON `searchset` Bundle.

use chrono::{SecondsFormat, Utc};
use helios_dispatch::ResultBundle;
use serde_json::{Value, json};
use url::form_urlencoded;
use uuid::Uuid;

/// A link in a Bundle.
#[derive(Debug, Clone)]
pub struct BundleLink {
    /// The relation type (self, next, previous, first, last).
    pub relation: String,
    /// The URL.
    pub url: String,
}

impl BundleLink {
    /// Creates a new link.
    pub fn new(relation: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            relation: relation.into(),
            url: url.into(),
        }
    }

    /// Creates a self link.
    pub fn self_link(url: impl Into<String>) -> Self {
        Self::new("self", url)
    }

    /// Converts to FHIR JSON.
    pub fn to_json(&self) -> Value {
        json!({
            "relation": self.relation,
            "url": self.url
        })
    }
}

/// A search result entry in a Bundle.
#[derive(Debug, Clone)]
pub struct BundleEntry {
    /// Full URL of the resource, when it has an id.
    pub full_url: Option<String>,
    /// The resource itself.
    pub resource: Value,
    /// Display title.
    pub title: String,
}

impl BundleEntry {
    /// Creates a search result entry.
    pub fn search_result(resource: Value, title: impl Into<String>) -> Self {
        Self {
            full_url: None,
            resource,
            title: title.into(),
        }
    }

    /// Sets the full URL.
    pub fn with_full_url(mut self, url: impl Into<String>) -> Self {
        self.full_url = Some(url.into());
        self
    }

    /// Converts to FHIR JSON.
    pub fn to_json(&self) -> Value {
        let mut entry = json!({});

        if let Some(url) = &self.full_url {
            entry["fullUrl"] = json!(url);
        }
        entry["title"] = json!(self.title);
        entry["resource"] = self.resource.clone();
        entry["search"] = json!({ "mode": "match" });

        entry
    }
}

/// Builder for searchset Bundle resources.
#[derive(Debug)]
pub struct BundleBuilder {
    id: String,
    total: Option<usize>,
    links: Vec<BundleLink>,
    entries: Vec<BundleEntry>,
    timestamp: Option<String>,
}

impl BundleBuilder {
    /// Creates a searchset bundle builder with a fresh id.
    pub fn searchset() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            total: None,
            links: Vec::new(),
            entries: Vec::new(),
            timestamp: None,
        }
    }

    /// Sets the total count.
    pub fn total(mut self, count: usize) -> Self {
        self.total = Some(count);
        self
    }

    /// Adds a link.
    pub fn add_link(mut self, link: BundleLink) -> Self {
        self.links.push(link);
        self
    }

    /// Adds a self link.
    pub fn self_link(self, url: impl Into<String>) -> Self {
        self.add_link(BundleLink::self_link(url))
    }

    /// Adds an entry.
    pub fn add_entry(mut self, entry: BundleEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Sets the timestamp.
    pub fn timestamp(mut self, ts: impl Into<String>) -> Self {
        self.timestamp = Some(ts.into());
        self
    }

    /// Builds the Bundle resource.
    pub fn build(self) -> Value {
        let mut bundle = json!({
            "resourceType": "Bundle",
            "id": self.id,
            "type": "searchset"
        });

        if let Some(ts) = self.timestamp {
            bundle["timestamp"] = json!(ts);
        }

        if let Some(total) = self.total {
            bundle["total"] = json!(total);
        }

        if !self.links.is_empty() {
            bundle["link"] = json!(self.links.iter().map(BundleLink::to_json).collect::<Vec<_>>());
        }

        bundle["entry"] = json!(self.entries.iter().map(BundleEntry::to_json).collect::<Vec<_>>());

        bundle
    }
}

/// Renders a dispatch result as a searchset Bundle.
///
/// `params` are the raw pairs the search was issued with, used to rebuild
/// the self link.
pub fn searchset_bundle(
    result: ResultBundle,
    base_url: &str,
    resource_type: &str,
    params: &[(String, String)],
) -> Value {
    let mut builder = BundleBuilder::searchset()
        .timestamp(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
        .total(result.len())
        .self_link(build_search_url(base_url, resource_type, params));

    for entry in result {
        let (resource, title) = entry.into_parts();
        let full_url = full_url(base_url, &resource);
        let mut entry = BundleEntry::search_result(resource, title);
        if let Some(url) = full_url {
            entry = entry.with_full_url(url);
        }
        builder = builder.add_entry(entry);
    }

    builder.build()
}

/// Returns `{base}/{type}/{id}` when the resource has both.
fn full_url(base_url: &str, resource: &Value) -> Option<String> {
    let resource_type = resource.get("resourceType")?.as_str()?;
    let id = resource.get("id")?.as_str().filter(|id| !id.is_empty())?;
    Some(format!("{}/{}/{}", base_url, resource_type, id))
}

/// Builds a search URL from base URL and parameters, keeping their order.
pub fn build_search_url(base_url: &str, resource_type: &str, params: &[(String, String)]) -> String {
    if params.is_empty() {
        return format!("{}/{}", base_url, resource_type);
    }

    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    format!("{}/{}?{}", base_url, resource_type, query)
}
