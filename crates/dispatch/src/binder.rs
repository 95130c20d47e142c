//! Parameter binding.
//!
//! [`bind`] turns a [`RawParameterSet`] into one typed value per parameter of
//! a [`HandlerSignature`]:
//!
//! 1. A required parameter that is missing, or supplied only with empty
//!    strings, fails with `MissingRequiredParameter`.
//! 2. An optional parameter that is missing or empty binds to the absence
//!    marker (`None`), never to an empty typed value.
//! 3. Present values are parsed as the declared type; parse failures become
//!    `MalformedParameterValue` naming the parameter.
//! 4. Supplied names the signature does not declare are ignored.

use std::collections::HashMap;

use tracing::trace;

use crate::error::BindError;
use crate::params::{
    ParamError, ParamType, ReferenceParam, SearchParam, StringParam, TokenOrListParam, TokenParam,
};
use crate::raw::{RawParameterSet, RawValue};
use crate::signature::{HandlerSignature, ParameterSpec};

/// Typed arguments for one handler invocation.
///
/// Every declared parameter has an entry; `None` is the absence marker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundParameters {
    values: HashMap<String, Option<SearchParam>>,
}

impl BoundParameters {
    /// Returns the bound value, or `None` when absent or undeclared.
    pub fn get(&self, name: &str) -> Option<&SearchParam> {
        self.values.get(name).and_then(Option::as_ref)
    }

    /// Returns true if `name` is declared and was supplied.
    pub fn is_present(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Returns true if `name` is declared by the bound signature.
    pub fn is_declared(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns a string value.
    pub fn string(&self, name: &str) -> Option<&StringParam> {
        match self.get(name) {
            Some(SearchParam::String(p)) => Some(p),
            _ => None,
        }
    }

    /// Returns a token value.
    pub fn token(&self, name: &str) -> Option<&TokenParam> {
        match self.get(name) {
            Some(SearchParam::Token(p)) => Some(p),
            _ => None,
        }
    }

    /// Returns a token list value.
    pub fn token_list(&self, name: &str) -> Option<&TokenOrListParam> {
        match self.get(name) {
            Some(SearchParam::TokenOrList(p)) => Some(p),
            _ => None,
        }
    }

    /// Returns a reference value.
    pub fn reference(&self, name: &str) -> Option<&ReferenceParam> {
        match self.get(name) {
            Some(SearchParam::Reference(p)) => Some(p),
            _ => None,
        }
    }

    /// Iterates over every declared parameter and its bound value.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&SearchParam>)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }

    /// Returns the number of declared parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the signature declared no parameters.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Binds raw values to `signature`.
pub fn bind(signature: &HandlerSignature, raw: &RawParameterSet) -> Result<BoundParameters, BindError> {
    let supplied: Vec<(&ParameterSpec, Vec<RawValue<'_>>)> = signature
        .params()
        .iter()
        .map(|spec| (spec, raw.values_for(spec.name())))
        .collect();

    if let Some((spec, _)) = supplied
        .iter()
        .find(|(spec, values)| spec.is_required() && values.is_empty())
    {
        return Err(BindError::MissingRequiredParameter {
            parameter: spec.name().to_string(),
            signature: signature.to_string(),
        });
    }

    let mut values = HashMap::with_capacity(supplied.len());
    for (spec, raw_values) in supplied {
        let bound = if raw_values.is_empty() {
            None
        } else {
            Some(bind_value(spec, &raw_values)?)
        };
        trace!(parameter = %spec.name(), bound = ?bound, "Bound search parameter");
        values.insert(spec.name().to_string(), bound);
    }

    Ok(BoundParameters { values })
}

/// Parses the non-empty values supplied for one parameter.
fn bind_value(spec: &ParameterSpec, raw_values: &[RawValue<'_>]) -> Result<SearchParam, BindError> {
    if spec.param_type().accepts_multiple_values() {
        let mut list = TokenOrListParam::default();
        for raw in raw_values {
            reject_modifier(spec, raw)?;
            list.extend(TokenOrListParam::parse(raw.value).map_err(|e| malformed(spec, raw.value, e))?);
        }
        return Ok(SearchParam::TokenOrList(list));
    }

    let raw = match raw_values {
        [single] => single,
        _ => {
            let joined: Vec<&str> = raw_values.iter().map(|r| r.value).collect();
            return Err(BindError::MalformedParameterValue {
                parameter: spec.name().to_string(),
                value: joined.join(","),
                reason: format!("{} parameters accept a single value", spec.param_type()),
            });
        }
    };

    if spec.param_type() == ParamType::Reference {
        return bind_reference(spec, raw).map(SearchParam::Reference);
    }

    reject_modifier(spec, raw)?;
    SearchParam::parse(spec.param_type(), raw.value).map_err(|e| malformed(spec, raw.value, e))
}

/// Parses a reference, applying a `:Type` modifier to bare ids.
fn bind_reference(spec: &ParameterSpec, raw: &RawValue<'_>) -> Result<ReferenceParam, BindError> {
    let reference = ReferenceParam::parse(raw.value).map_err(|e| malformed(spec, raw.value, e))?;

    let Some(modifier) = raw.modifier else {
        return Ok(reference);
    };

    if !modifier.starts_with(|c: char| c.is_ascii_uppercase()) {
        return Err(BindError::MalformedParameterValue {
            parameter: spec.name().to_string(),
            value: raw.value.to_string(),
            reason: format!("unsupported modifier ':{}'", modifier),
        });
    }

    match reference.resource_type() {
        None => Ok(reference.with_resource_type(modifier)),
        Some(resource_type) if resource_type == modifier => Ok(reference),
        Some(resource_type) => Err(BindError::MalformedParameterValue {
            parameter: spec.name().to_string(),
            value: raw.value.to_string(),
            reason: format!(
                "reference type {} conflicts with modifier ':{}'",
                resource_type, modifier
            ),
        }),
    }
}

fn reject_modifier(spec: &ParameterSpec, raw: &RawValue<'_>) -> Result<(), BindError> {
    match raw.modifier {
        None => Ok(()),
        Some(modifier) => Err(BindError::MalformedParameterValue {
            parameter: spec.name().to_string(),
            value: raw.value.to_string(),
            reason: format!(
                "modifier ':{}' is not supported for {} parameters",
                modifier,
                spec.param_type()
            ),
        }),
    }
}

fn malformed(spec: &ParameterSpec, value: &str, err: ParamError) -> BindError {
    BindError::MalformedParameterValue {
        parameter: spec.name().to_string(),
        value: value.to_string(),
        reason: err.to_string(),
    }
}
