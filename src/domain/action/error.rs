//! Closed error taxonomy shared by every action, middleware and transport

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::domain::DomainError;

/// Kind of a [`TypedError`]; each kind maps to exactly one HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// No, invalid or expired session where one is required
    SessionNotFound,
    /// Input failed schema validation or a domain precondition
    ActionParamValidation,
    /// No action matches the requested name or route
    ActionNotFound,
    /// Unexpected failure inside an action
    ActionRun,
}

impl ErrorKind {
    /// HTTP status code for this kind
    pub fn status_code(&self) -> u16 {
        match self {
            Self::SessionNotFound => 401,
            Self::ActionParamValidation => 406,
            Self::ActionNotFound => 404,
            Self::ActionRun => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::ActionParamValidation => "ACTION_PARAM_VALIDATION",
            Self::ActionNotFound => "ACTION_NOT_FOUND",
            Self::ActionRun => "ACTION_RUN",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error value carried out of the dispatcher.
///
/// Built once at the point of failure with everything a transport needs to
/// render the response; the wire shape is `{type, message, key?, value?, stack?}`.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct TypedError {
    #[serde(rename = "type")]
    kind: ErrorKind,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
}

impl TypedError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            key: None,
            value: None,
            stack: None,
        }
    }

    pub fn session_not_found() -> Self {
        Self::new(ErrorKind::SessionNotFound, "Session not found")
    }

    /// Validation failure for a single field and the value that was submitted
    pub fn param_validation(
        key: impl Into<String>,
        value: Option<Value>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: ErrorKind::ActionParamValidation,
            message: message.into(),
            key: Some(key.into()),
            value,
            stack: None,
        }
    }

    /// Domain precondition failure that is not tied to one field
    pub fn precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ActionParamValidation, message)
    }

    pub fn action_not_found(name: &str) -> Self {
        Self::new(
            ErrorKind::ActionNotFound,
            format!("Action '{}' not found", name),
        )
    }

    pub fn action_run(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ActionRun, message)
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Copy of this error without stack information, for production responses
    pub fn without_stack(mut self) -> Self {
        self.stack = None;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    pub fn status_code(&self) -> u16 {
        self.kind.status_code()
    }
}

impl From<DomainError> for TypedError {
    fn from(err: DomainError) -> Self {
        let message = err.to_string();

        match err {
            DomainError::Validation {
                field: Some(field), ..
            }
            | DomainError::Conflict {
                field: Some(field), ..
            } => Self {
                kind: ErrorKind::ActionParamValidation,
                message,
                key: Some(field),
                value: None,
                stack: None,
            },
            DomainError::Validation { field: None, .. }
            | DomainError::Conflict { field: None, .. } => Self::precondition(message),
            // Missing records and records owned by someone else look the same on the wire
            DomainError::NotFound { .. }
            | DomainError::Configuration { .. }
            | DomainError::Internal { .. }
            | DomainError::Storage { .. }
            | DomainError::Cache { .. } => Self::action_run(message),
        }
    }
}

impl From<anyhow::Error> for TypedError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<TypedError>() {
            Ok(typed) => typed,
            Err(err) => match err.downcast::<DomainError>() {
                Ok(domain) => domain.into(),
                Err(err) => Self::action_run(err.to_string()).with_stack(format!("{:?}", err)),
            },
        }
    }
}

/// `{ "error": { ... } }` envelope written by both transports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: TypedError,
}
