//! Typed search parameter values.
//!
//! Raw query strings are turned into one of four value kinds:
//!
//! | Kind | Raw form | Example |
//! |------|----------|---------|
//! | [`StringParam`] | any text | `Smith` |
//! | [`TokenParam`] | `[system|]code` | `http://loinc.org|3141-9` |
//! | [`TokenOrListParam`] | comma-separated tokens | `3141-9,8302-2` |
//! | [`ReferenceParam`] | `[Type/]id[/_history/vid]` | `Patient/100` |
//!
//! Parsing is purely syntactic. Nothing here consults a resource registry, so
//! a bare id keeps an unresolved resource type until the caller supplies one.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Declared type of a handler parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Free text, kept verbatim.
    String,
    /// A single coded value, optionally qualified by a system.
    Token,
    /// A comma-separated list of tokens, matched with OR semantics.
    TokenOrList,
    /// A reference to another resource.
    Reference,
}

impl ParamType {
    /// Returns true if more than one supplied value can be merged into a
    /// single bound value.
    pub fn accepts_multiple_values(&self) -> bool {
        matches!(self, ParamType::TokenOrList)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::String => write!(f, "string"),
            ParamType::Token => write!(f, "token"),
            ParamType::TokenOrList => write!(f, "token-or-list"),
            ParamType::Reference => write!(f, "reference"),
        }
    }
}

impl FromStr for ParamType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" => Ok(ParamType::String),
            "token" => Ok(ParamType::Token),
            "token-or-list" => Ok(ParamType::TokenOrList),
            "reference" => Ok(ParamType::Reference),
            _ => Err(format!("unknown parameter type: {}", s)),
        }
    }
}

/// Syntactic failure while parsing a single raw value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    /// The value is empty where content is required.
    #[error("value is empty")]
    Empty,

    /// A token carries more than one `|` separator.
    #[error("token contains more than one '|' separator")]
    TooManySeparators,

    /// A token list has an empty entry (e.g. `a,,b`).
    #[error("token list has an empty entry at position {position}")]
    EmptyListEntry {
        /// Zero-based index of the empty entry.
        position: usize,
    },

    /// A reference is not `id`, `Type/id` or `Type/id/_history/vid`.
    #[error("expected 'id', 'Type/id' or 'Type/id/_history/version'")]
    InvalidReference,
}

/// A plain string parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StringParam {
    value: String,
}

impl StringParam {
    /// Creates a string parameter holding `value` verbatim.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Returns the raw value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for StringParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// A token parameter: a code with an optional coding system.
///
/// `system` is `None` when the raw value had no `|`. A leading `|` (as in
/// `|code`) yields `Some("")`, i.e. an explicitly empty system.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenParam {
    system: Option<String>,
    code: String,
}

impl TokenParam {
    /// Creates a token from its parts.
    pub fn new(system: Option<String>, code: impl Into<String>) -> Self {
        Self {
            system,
            code: code.into(),
        }
    }

    /// Parses `code` or `system|code`.
    pub fn parse(raw: &str) -> Result<Self, ParamError> {
        let token = match raw.split_once('|') {
            None => Self::new(None, raw),
            Some((_, code)) if code.contains('|') => return Err(ParamError::TooManySeparators),
            Some((system, code)) => Self::new(Some(system.to_string()), code),
        };

        if token.code.is_empty() && token.system.as_deref().unwrap_or("").is_empty() {
            return Err(ParamError::Empty);
        }

        Ok(token)
    }

    /// Returns the coding system, if one was given.
    pub fn system(&self) -> Option<&str> {
        self.system.as_deref()
    }

    /// Returns the code.
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl FromStr for TokenParam {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TokenParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.system {
            Some(system) => write!(f, "{}|{}", system, self.code),
            None => f.write_str(&self.code),
        }
    }
}

/// An ordered list of tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TokenOrListParam {
    tokens: Vec<TokenParam>,
}

impl TokenOrListParam {
    /// Creates a list from already parsed tokens.
    pub fn new(tokens: Vec<TokenParam>) -> Self {
        Self { tokens }
    }

    /// Parses a comma-separated list of tokens.
    pub fn parse(raw: &str) -> Result<Self, ParamError> {
        let tokens = raw
            .split(',')
            .enumerate()
            .map(|(position, segment)| {
                if segment.is_empty() {
                    Err(ParamError::EmptyListEntry { position })
                } else {
                    TokenParam::parse(segment)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { tokens })
    }

    /// Appends the tokens of `other`, keeping their order.
    pub fn extend(&mut self, other: TokenOrListParam) {
        self.tokens.extend(other.tokens);
    }

    /// Returns the tokens in supplied order.
    pub fn tokens(&self) -> &[TokenParam] {
        &self.tokens
    }

    /// Returns the number of tokens.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Returns true if the list holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Iterates over the tokens.
    pub fn iter(&self) -> std::slice::Iter<'_, TokenParam> {
        self.tokens.iter()
    }
}

impl FromStr for TokenOrListParam {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TokenOrListParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", token)?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a TokenOrListParam {
    type Item = &'a TokenParam;
    type IntoIter = std::slice::Iter<'a, TokenParam>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}

/// A reference parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReferenceParam {
    resource_type: Option<String>,
    id: String,
    version: Option<String>,
}

impl ReferenceParam {
    /// Creates a reference from its parts.
    pub fn new(resource_type: Option<String>, id: impl Into<String>) -> Self {
        Self {
            resource_type,
            id: id.into(),
            version: None,
        }
    }

    /// Parses `id`, `Type/id` or `Type/id/_history/vid`.
    pub fn parse(raw: &str) -> Result<Self, ParamError> {
        if raw.is_empty() {
            return Err(ParamError::Empty);
        }

        let segments: Vec<&str> = raw.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(ParamError::InvalidReference);
        }

        match segments.as_slice() {
            [id] => Ok(Self::new(None, *id)),
            [resource_type, id] => Ok(Self::new(Some(resource_type.to_string()), *id)),
            [resource_type, id, "_history", version] => {
                Ok(Self::new(Some(resource_type.to_string()), *id).with_version(*version))
            }
            _ => Err(ParamError::InvalidReference),
        }
    }

    /// Sets the resource type.
    pub fn with_resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    /// Sets the version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Returns the resource type, if known.
    pub fn resource_type(&self) -> Option<&str> {
        self.resource_type.as_deref()
    }

    /// Returns the logical id.
    pub fn id_part(&self) -> &str {
        &self.id
    }

    /// Returns the version, if one was given.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }
}

impl FromStr for ReferenceParam {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ReferenceParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(resource_type) = &self.resource_type {
            write!(f, "{}/", resource_type)?;
        }
        f.write_str(&self.id)?;
        if let Some(version) = &self.version {
            write!(f, "/_history/{}", version)?;
        }
        Ok(())
    }
}

/// A bound search parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SearchParam {
    /// A string value.
    String(StringParam),
    /// A token value.
    Token(TokenParam),
    /// A list of token values.
    TokenOrList(TokenOrListParam),
    /// A reference value.
    Reference(ReferenceParam),
}

impl SearchParam {
    /// Parses `raw` as the given declared type.
    pub fn parse(param_type: ParamType, raw: &str) -> Result<Self, ParamError> {
        Ok(match param_type {
            ParamType::String => SearchParam::String(StringParam::new(raw)),
            ParamType::Token => SearchParam::Token(TokenParam::parse(raw)?),
            ParamType::TokenOrList => SearchParam::TokenOrList(TokenOrListParam::parse(raw)?),
            ParamType::Reference => SearchParam::Reference(ReferenceParam::parse(raw)?),
        })
    }

    /// Returns the type of this value.
    pub fn param_type(&self) -> ParamType {
        match self {
            SearchParam::String(_) => ParamType::String,
            SearchParam::Token(_) => ParamType::Token,
            SearchParam::TokenOrList(_) => ParamType::TokenOrList,
            SearchParam::Reference(_) => ParamType::Reference,
        }
    }
}

impl fmt::Display for SearchParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchParam::String(p) => p.fmt(f),
            SearchParam::Token(p) => p.fmt(f),
            SearchParam::TokenOrList(p) => p.fmt(f),
            SearchParam::Reference(p) => p.fmt(f),
        }
    }
}
