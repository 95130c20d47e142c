//! Result bundle assembly.
//!
//! Wraps handler results into an ordered [`ResultBundle`], computing a
//! display title for every entry. The assembler never filters or reorders:
//! entry order and count are exactly the handler's output.

use serde_json::Value;

/// One resource in a result bundle, with its derived title.
#[derive(Debug, Clone, PartialEq)]
pub struct BundleEntry {
    resource: Value,
    title: String,
}

impl BundleEntry {
    /// Returns the resource, unchanged from the handler's output.
    pub fn resource(&self) -> &Value {
        &self.resource
    }

    /// Returns the derived title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Splits the entry into resource and title.
    pub fn into_parts(self) -> (Value, String) {
        (self.resource, self.title)
    }
}

/// The ordered result of a search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultBundle {
    entries: Vec<BundleEntry>,
}

impl ResultBundle {
    /// Returns the entries in handler-result order.
    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the search matched nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over the entries.
    pub fn iter(&self) -> std::slice::Iter<'_, BundleEntry> {
        self.entries.iter()
    }

    /// Consumes the bundle, returning its entries.
    pub fn into_entries(self) -> Vec<BundleEntry> {
        self.entries
    }
}

impl IntoIterator for ResultBundle {
    type Item = BundleEntry;
    type IntoIter = std::vec::IntoIter<BundleEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Builds a bundle from handler results.
pub fn assemble(resources: Vec<Value>) -> ResultBundle {
    let entries = resources
        .into_iter()
        .map(|resource| {
            let title = entry_title(&resource);
            BundleEntry { resource, title }
        })
        .collect();

    ResultBundle { entries }
}

/// Computes the display title of a resource.
///
/// - Person-like resources: upper-cased primary family name, then the primary
///   identifier value in parentheses when there is one.
/// - Observation: display of the first coding, else its code.
/// - Anything else, or when those fields are absent: `Type/id`.
pub fn entry_title(resource: &Value) -> String {
    let title = match resource_type(resource) {
        Some("Patient" | "Practitioner" | "RelatedPerson" | "Person") => person_title(resource),
        Some("Observation") => observation_title(resource),
        _ => None,
    };

    title.unwrap_or_else(|| generic_title(resource))
}

fn resource_type(resource: &Value) -> Option<&str> {
    resource.get("resourceType").and_then(Value::as_str)
}

fn non_empty(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn person_title(resource: &Value) -> Option<String> {
    // `family` is a string in current FHIR versions and a list in DSTU1.
    let family = match resource.pointer("/name/0/family") {
        Some(Value::Array(parts)) => non_empty(parts.first()),
        other => non_empty(other),
    }?;

    let mut title = family.to_uppercase();
    if let Some(identifier) = non_empty(resource.pointer("/identifier/0/value")) {
        title.push_str(&format!(" ({})", identifier));
    }
    Some(title)
}

fn observation_title(resource: &Value) -> Option<String> {
    let coding = resource
        .get("code")
        .or_else(|| resource.get("name"))?
        .pointer("/coding/0")?;

    non_empty(coding.get("display"))
        .or_else(|| non_empty(coding.get("code")))
        .map(str::to_string)
}

fn generic_title(resource: &Value) -> String {
    match (resource_type(resource), non_empty(resource.get("id"))) {
        (Some(resource_type), Some(id)) => format!("{}/{}", resource_type, id),
        (Some(resource_type), None) => resource_type.to_string(),
        (None, _) => "Resource".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patient_title() {
        let patient = json!({
            "resourceType": "Patient",
            "id": "1",
            "identifier": [{"system": "system", "value": "identifier123"}],
            "name": [{"family": "idaaa"}]
        });
        assert_eq!(entry_title(&patient), "IDAAA (identifier123)");
    }

    #[test]
    fn test_patient_title_with_family_list() {
        let patient = json!({
            "resourceType": "Patient",
            "name": [{"family": ["Smith", "Jones"]}]
        });
        assert_eq!(entry_title(&patient), "SMITH");
    }

    #[test]
    fn test_patient_without_name_falls_back() {
        let patient = json!({
            "resourceType": "Patient",
            "id": "1",
            "identifier": [{"system": "system", "value": "identifier123"}]
        });
        assert_eq!(entry_title(&patient), "Patient/1");
    }

    #[test]
    fn test_observation_title() {
        let observation = json!({
            "resourceType": "Observation",
            "id": "1",
            "code": {"coding": [{"code": "3141-9"}, {"code": "8302-2"}]}
        });
        assert_eq!(entry_title(&observation), "3141-9");

        let observation = json!({
            "resourceType": "Observation",
            "code": {"coding": [{"code": "3141-9", "display": "Body weight"}]}
        });
        assert_eq!(entry_title(&observation), "Body weight");
    }

    #[test]
    fn test_generic_titles() {
        assert_eq!(
            entry_title(&json!({"resourceType": "Encounter", "id": "e1"})),
            "Encounter/e1"
        );
        assert_eq!(entry_title(&json!({"resourceType": "Encounter"})), "Encounter");
        assert_eq!(entry_title(&json!({})), "Resource");
    }

    #[test]
    fn test_assemble_preserves_order_and_resources() {
        let resources = vec![
            json!({"resourceType": "Patient", "id": "b"}),
            json!({"resourceType": "Patient", "id": "a"}),
            json!({"resourceType": "Patient", "id": "b"}),
        ];
        let bundle = assemble(resources.clone());

        assert_eq!(bundle.len(), 3);
        let ids: Vec<&str> = bundle
            .iter()
            .map(|e| e.resource()["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["b", "a", "b"]);
        assert_eq!(bundle.entries()[0].resource(), &resources[0]);
    }

    #[test]
    fn test_assemble_empty() {
        assert!(assemble(Vec::new()).is_empty());
    }
}
