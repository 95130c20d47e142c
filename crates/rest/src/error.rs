//! Error types for the FHIR search API.
//!
//! Every error is returned to the client as a FHIR OperationOutcome.
//!
//! # Error Mapping
//!
//! Dispatch failures are mapped to HTTP status codes and FHIR issue codes:
//!
//! | Dispatch Error | HTTP Status | FHIR Issue Code |
//! |----------------|-------------|-----------------|
//! | MalformedParameterValue | 400 | invalid |
//! | MissingRequiredParameter | 400 | invalid |
//! | NoMatchingHandler | 400 | not-supported |
//! | HandlerExecutionFailure | 500 | exception |

use std::fmt;

use axum::{
    Json,
    extract::rejection::{FormRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use helios_dispatch::{BindError, DispatchError};
use tracing::error;

use crate::responses::operation_outcome::{Issue, IssueType, OperationOutcomeBuilder};

/// The error type for search API requests.
#[derive(Debug)]
pub enum RestError {
    /// A search parameter was missing or could not be parsed (HTTP 400).
    InvalidParameter {
        /// The offending parameter name.
        parameter: String,
        /// Error message.
        message: String,
    },

    /// No search handler accepts the request (HTTP 400).
    UnsupportedSearch {
        /// The requested resource type.
        resource_type: String,
        /// Error message.
        message: String,
    },

    /// The query string or form body could not be read (HTTP 400).
    BadRequest {
        /// Error message.
        message: String,
    },

    /// Internal server error (HTTP 500).
    InternalError {
        /// Error message.
        message: String,
    },
}

impl RestError {
    /// Returns the HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            RestError::InvalidParameter { .. }
            | RestError::UnsupportedSearch { .. }
            | RestError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            RestError::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl fmt::Display for RestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RestError::InvalidParameter { parameter, message } => {
                write!(f, "Invalid search parameter '{}': {}", parameter, message)
            }
            RestError::UnsupportedSearch { message, .. } => {
                write!(f, "Unsupported search: {}", message)
            }
            RestError::BadRequest { message } => {
                write!(f, "Bad request: {}", message)
            }
            RestError::InternalError { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for RestError {}

impl IntoResponse for RestError {
    fn into_response(self) -> Response {
        let status = self.status();
        let issue = match &self {
            RestError::InvalidParameter { parameter, message } => {
                Issue::error(IssueType::Invalid, message.clone()).with_expression(parameter.clone())
            }
            RestError::UnsupportedSearch { message, .. } => {
                Issue::error(IssueType::NotSupported, message.clone())
            }
            RestError::BadRequest { message } => Issue::error(IssueType::Invalid, message.clone()),
            RestError::InternalError { message } => {
                Issue::error(IssueType::Exception, message.clone())
            }
        };

        let operation_outcome = OperationOutcomeBuilder::new().add_issue(issue).build();
        (status, Json(operation_outcome)).into_response()
    }
}

impl From<DispatchError> for RestError {
    fn from(err: DispatchError) -> Self {
        let message = err.to_string();
        match err {
            DispatchError::Bind(BindError::MissingRequiredParameter { parameter, .. })
            | DispatchError::Bind(BindError::MalformedParameterValue { parameter, .. }) => {
                RestError::InvalidParameter { parameter, message }
            }
            DispatchError::NoMatchingHandler { resource_type, .. } => {
                RestError::UnsupportedSearch {
                    resource_type,
                    message,
                }
            }
            DispatchError::HandlerExecutionFailure { .. } => {
                error!(error = %message, "Search handler failed");
                RestError::InternalError { message }
            }
        }
    }
}

impl From<QueryRejection> for RestError {
    fn from(rejection: QueryRejection) -> Self {
        RestError::BadRequest {
            message: rejection.body_text(),
        }
    }
}

impl From<FormRejection> for RestError {
    fn from(rejection: FormRejection) -> Self {
        RestError::BadRequest {
            message: rejection.body_text(),
        }
    }
}

impl From<tokio::task::JoinError> for RestError {
    fn from(err: tokio::task::JoinError) -> Self {
        RestError::InternalError {
            message: format!("Search task failed: {}", err),
        }
    }
}

/// Result type alias for REST operations.
pub type RestResult<T> = Result<T, RestError>;
