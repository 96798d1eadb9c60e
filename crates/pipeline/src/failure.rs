//! Failure categories a pipeline stage can report.

use serde_json::json;
use thiserror::Error;

use milestone_core::DomainError;

use crate::response::{Response, Status};
use crate::validation::ValidationErrors;

/// Categorized pipeline failure.
///
/// Inner stages return these unmodified; only the error-translation stage turns
/// them into responses (see [`Failure::to_response`]).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Failure {
    /// No valid credential was presented.
    #[error("unauthorized")]
    Unauthorized,

    /// Valid credential, but insufficient privilege or not the resource owner.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// One or more field rules failed. Carries every violation, not just the first.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// Anything else. The detail is for operators, never for callers.
    #[error("unclassified failure: {0}")]
    Unclassified(String),
}

impl Failure {
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub fn unclassified(detail: impl Into<String>) -> Self {
        Self::Unclassified(detail.into())
    }

    /// Single-violation validation failure.
    pub fn invalid(field: &str, rule: &str, message: impl Into<String>) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, rule, message);
        Self::Validation(errors)
    }

    pub fn status(&self) -> Status {
        match self {
            Failure::Unauthorized => Status::Unauthorized,
            Failure::Forbidden(_) => Status::Forbidden,
            Failure::Validation(_) => Status::UnprocessableEntity,
            Failure::Unclassified(_) => Status::InternalServerError,
        }
    }

    /// Stable machine-readable code used in response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Failure::Unauthorized => "unauthorized",
            Failure::Forbidden(_) => "forbidden",
            Failure::Validation(_) => "validation_error",
            Failure::Unclassified(_) => "internal_error",
        }
    }

    /// Boundary response for this failure.
    ///
    /// Unclassified failures get a generic message; their detail stays in logs.
    pub fn to_response(&self) -> Response {
        let body = match self {
            Failure::Unauthorized => json!({
                "error": self.code(),
                "message": "a valid credential is required",
            }),
            Failure::Forbidden(reason) => json!({
                "error": self.code(),
                "message": reason,
            }),
            Failure::Validation(errors) => json!({
                "error": self.code(),
                "message": "validation failed",
                "errors": errors,
            }),
            Failure::Unclassified(_) => json!({
                "error": self.code(),
                "message": "internal server error",
            }),
        };
        Response::new(self.status(), Some(body))
    }
}

impl From<DomainError> for Failure {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => Failure::invalid("base", "domain", msg),
            DomainError::InvalidId(msg) => Failure::invalid("id", "format", msg),
            DomainError::Conflict(msg) => Failure::invalid("base", "conflict", msg),
            DomainError::NotFound => Failure::invalid("base", "exists", "record does not exist"),
            DomainError::Unavailable(msg) => Failure::Unclassified(msg),
        }
    }
}
