//! Handler parameter signatures.
//!
//! A [`HandlerSignature`] is the explicit, data-only description of the
//! parameters a search handler accepts. It is built once at registration and
//! drives both matching and binding.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use crate::error::RegistryError;
use crate::params::ParamType;

/// A single declared parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterSpec {
    name: String,
    param_type: ParamType,
    required: bool,
}

impl ParameterSpec {
    /// Declares a required parameter.
    pub fn required(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: true,
        }
    }

    /// Declares an optional parameter.
    pub fn optional(name: impl Into<String>, param_type: ParamType) -> Self {
        Self {
            name: name.into(),
            param_type,
            required: false,
        }
    }

    /// Returns the parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared type.
    pub fn param_type(&self) -> ParamType {
        self.param_type
    }

    /// Returns true if the parameter must be supplied.
    pub fn is_required(&self) -> bool {
        self.required
    }
}

impl fmt::Display for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = if self.required { "" } else { "?" };
        write!(f, "{}{}: {}", self.name, marker, self.param_type)
    }
}

/// The ordered parameter list of one handler.
///
/// Parameter names are unique within a signature.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerSignature {
    params: Vec<ParameterSpec>,
}

impl HandlerSignature {
    /// Builds a signature, rejecting duplicate or malformed names.
    pub fn new(params: impl IntoIterator<Item = ParameterSpec>) -> Result<Self, RegistryError> {
        let params: Vec<ParameterSpec> = params.into_iter().collect();
        let mut seen = HashSet::new();

        for param in &params {
            if param.name.is_empty() || param.name.contains(':') {
                return Err(RegistryError::InvalidParameterName {
                    name: param.name.clone(),
                });
            }
            if !seen.insert(param.name.as_str()) {
                return Err(RegistryError::DuplicateParameter {
                    name: param.name.clone(),
                });
            }
        }

        Ok(Self { params })
    }

    /// A signature that takes no parameters.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns the declared parameters in declaration order.
    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    /// Looks up a parameter by name.
    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Iterates over the names of required parameters.
    pub fn required_names(&self) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
    }

    /// Returns how many parameters are required.
    pub fn required_count(&self) -> usize {
        self.params.iter().filter(|p| p.required).count()
    }

    /// Returns true if every required parameter is in `supplied`.
    pub fn is_satisfied_by(&self, supplied: &BTreeSet<String>) -> bool {
        self.required_names().all(|name| supplied.contains(name))
    }
}

impl fmt::Display for HandlerSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", param)?;
        }
        f.write_str(")")
    }
}
