//! Typed errors and HTTP mapping.
//!
//! Layers below the HTTP boundary only ever raise [`AppError`]. Turning one
//! into a response does not render a body: it tags the response with a
//! [`Failure`] that the error normalizer turns into the error envelope, so
//! the envelope is built in exactly one place.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
    #[error("resource {resource}: {message}")]
    Resource { resource: String, message: String },
}

/// All violations reported for one input field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub messages: Vec<String>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            messages: vec![message.into()],
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Validation failed")]
    Validation(Vec<FieldError>),
    #[error("{0}")]
    BadRequest(String),
    /// Extractor rejection that keeps the status axum assigned to it (400, 413, 415, ...).
    #[error("{1}")]
    Rejected(StatusCode, String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Request cancelled")]
    Cancelled,
    #[error("Store deadline exceeded")]
    DeadlineExceeded,
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("internal: {0}")]
    Internal(String),
}

/// How the normalizer treats a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// One or more field-level violations.
    Validation,
    /// Declares its own status code and message.
    Domain,
    /// Anything else; rendered as an internal error.
    Unclassified,
}

/// The normalizer's view of a raised failure.
#[derive(Clone, Debug)]
pub struct Failure {
    pub kind: FailureKind,
    pub status: Option<StatusCode>,
    /// Declared message payload: a JSON string, or an object carrying `message`.
    pub payload: Option<Value>,
    pub errors: Vec<FieldError>,
    /// Debug chain of the underlying error, exposed as `stack` in development.
    pub detail: Option<String>,
}

impl AppError {
    /// Conflict raised when a unique field already holds the submitted value.
    pub fn duplicate(resource: &str, field: &str) -> Self {
        AppError::Conflict(format!("{} with {} already exists", resource, field))
    }

    /// A foreign key points at a row that does not exist.
    pub fn missing_reference(field: &str) -> Self {
        AppError::NotFound(format!("{} does not reference an existing record", field))
    }

    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        AppError::NotFound(format!("{} with id '{}' not found", resource, id))
    }

    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        AppError::Validation(vec![FieldError::new(field, message)])
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            AppError::Validation(_) => FailureKind::Validation,
            AppError::BadRequest(_)
            | AppError::Rejected(..)
            | AppError::Forbidden(_)
            | AppError::NotFound(_)
            | AppError::Conflict(_)
            | AppError::Cancelled
            | AppError::DeadlineExceeded => FailureKind::Domain,
            AppError::Config(_) | AppError::Db(_) | AppError::Internal(_) => FailureKind::Unclassified,
        }
    }

    /// Declared status; unclassified failures declare none and resolve to 500.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => Some(StatusCode::BAD_REQUEST),
            AppError::Rejected(status, _) => Some(*status),
            AppError::Forbidden(_) => Some(StatusCode::FORBIDDEN),
            AppError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            AppError::Conflict(_) => Some(StatusCode::CONFLICT),
            AppError::Cancelled => Some(StatusCode::SERVICE_UNAVAILABLE),
            AppError::DeadlineExceeded => Some(StatusCode::GATEWAY_TIMEOUT),
            AppError::Config(_) | AppError::Db(_) | AppError::Internal(_) => None,
        }
    }

    pub fn to_failure(&self) -> Failure {
        let kind = self.kind();
        let message = match kind {
            FailureKind::Unclassified => "Internal server error".to_string(),
            _ => self.to_string(),
        };
        let errors = match self {
            AppError::Validation(errors) => errors.clone(),
            _ => Vec::new(),
        };
        Failure {
            kind,
            status: self.status(),
            payload: Some(Value::String(message)),
            errors,
            detail: Some(error_chain(self)),
        }
    }
}

/// Debug representation of an error followed by its `source()` chain.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = format!("{:?}", err);
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\ncaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let failure = self.to_failure();
        let status = failure.status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = status.into_response();
        response.extensions_mut().insert(failure);
        response
    }
}
