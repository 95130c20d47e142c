//! Raw request parameters.
//!
//! Query-string pairs and form-encoded pairs are both normalized into a
//! [`RawParameterSet`], so everything downstream is independent of where the
//! pairs came from.

use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Name to values mapping as supplied by the transport.
///
/// Repeated keys keep every value, in supplied order. Keys are stored
/// verbatim, including any `:modifier` suffix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParameterSet {
    params: BTreeMap<String, Vec<String>>,
}

/// One non-empty value supplied for a parameter name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawValue<'a> {
    /// The modifier from the key (`Patient` in `subject:Patient`).
    pub modifier: Option<&'a str>,
    /// The supplied value.
    pub value: &'a str,
}

impl RawParameterSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from key/value pairs, keeping repeated keys.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut set = Self::new();
        for (key, value) in pairs {
            set.insert(key, value);
        }
        set
    }

    /// Builds a set from an already grouped map.
    pub fn from_map(params: HashMap<String, Vec<String>>) -> Self {
        Self {
            params: params.into_iter().collect(),
        }
    }

    /// Appends a value for `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.entry(key.into()).or_default().push(value.into());
    }

    /// Returns the values supplied for an exact key.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.params.get(key).map(Vec::as_slice)
    }

    /// Iterates over keys and their values.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns true if no keys were supplied.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Returns the base names that carry at least one non-empty value.
    ///
    /// A key supplied only with empty strings counts as not supplied.
    pub fn supplied_names(&self) -> BTreeSet<String> {
        self.params
            .iter()
            .filter(|(_, values)| values.iter().any(|v| !v.is_empty()))
            .map(|(key, _)| split_key(key).0.to_string())
            .collect()
    }

    /// Returns every non-empty value supplied under `name`, with or without a
    /// modifier.
    pub fn values_for(&self, name: &str) -> Vec<RawValue<'_>> {
        self.params
            .iter()
            .filter_map(|(key, values)| {
                let (base, modifier) = split_key(key);
                (base == name).then_some((modifier, values))
            })
            .flat_map(|(modifier, values)| {
                values
                    .iter()
                    .filter(|v| !v.is_empty())
                    .map(move |v| RawValue {
                        modifier,
                        value: v.as_str(),
                    })
            })
            .collect()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for RawParameterSet {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_pairs(iter)
    }
}

/// Splits `name:modifier` into its parts.
fn split_key(key: &str) -> (&str, Option<&str>) {
    match key.split_once(':') {
        Some((base, modifier)) => (base, Some(modifier)),
        None => (key, None),
    }
}
