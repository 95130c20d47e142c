//! Error types for search dispatch.
//!
//! Every failure is terminal for the current request. Nothing is retried
//! here; callers map the [`ErrorKind`] of a [`DispatchError`] onto their own
//! status codes.

use std::fmt;

use thiserror::Error;

/// Error returned by a handler callable.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while binding raw values to a handler signature.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// A required parameter was omitted or supplied only with empty values.
    #[error("missing required parameter '{parameter}' for {signature}")]
    MissingRequiredParameter {
        /// The parameter name.
        parameter: String,
        /// Rendering of the handler signature.
        signature: String,
    },

    /// A supplied value could not be parsed as the declared type.
    #[error("invalid value '{value}' for parameter '{parameter}': {reason}")]
    MalformedParameterValue {
        /// The parameter name.
        parameter: String,
        /// The offending raw value.
        value: String,
        /// What was wrong with it.
        reason: String,
    },
}

/// Errors raised when a handler signature violates its invariants.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Two parameters in one signature share a name.
    #[error("parameter '{name}' is declared more than once")]
    DuplicateParameter {
        /// The repeated name.
        name: String,
    },

    /// A parameter name is empty or contains a modifier separator.
    #[error("invalid parameter name '{name}'")]
    InvalidParameterName {
        /// The rejected name.
        name: String,
    },
}

/// Errors returned by [`Dispatcher::dispatch`](crate::Dispatcher::dispatch).
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Binding failed.
    #[error(transparent)]
    Bind(#[from] BindError),

    /// No registered handler accepts the supplied parameters.
    #[error("no search handler for {resource_type} accepts parameters [{}]", .supplied.join(", "))]
    NoMatchingHandler {
        /// The requested resource type.
        resource_type: String,
        /// The supplied (non-empty) parameter names, sorted.
        supplied: Vec<String>,
    },

    /// The handler callable failed.
    #[error("search handler for {resource_type} failed: {source}")]
    HandlerExecutionFailure {
        /// The requested resource type.
        resource_type: String,
        /// The error raised by the handler.
        #[source]
        source: HandlerError,
    },
}

impl DispatchError {
    /// Returns the flat kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::Bind(BindError::MalformedParameterValue { .. }) => {
                ErrorKind::MalformedParameterValue
            }
            DispatchError::Bind(BindError::MissingRequiredParameter { .. }) => {
                ErrorKind::MissingRequiredParameter
            }
            DispatchError::NoMatchingHandler { .. } => ErrorKind::NoMatchingHandler,
            DispatchError::HandlerExecutionFailure { .. } => ErrorKind::HandlerExecutionFailure,
        }
    }
}

/// The four kinds of dispatch failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A value failed to parse.
    MalformedParameterValue,
    /// A required parameter was absent.
    MissingRequiredParameter,
    /// No handler matched.
    NoMatchingHandler,
    /// The handler itself failed.
    HandlerExecutionFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MalformedParameterValue => write!(f, "MalformedParameterValue"),
            ErrorKind::MissingRequiredParameter => write!(f, "MissingRequiredParameter"),
            ErrorKind::NoMatchingHandler => write!(f, "NoMatchingHandler"),
            ErrorKind::HandlerExecutionFailure => write!(f, "HandlerExecutionFailure"),
        }
    }
}

/// Result type alias for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
