use http::StatusCode;
use serde::{Deserialize, Serialize};

use crudkit_security::PermissionError;

use crate::domain::error::DomainError;

/// RFC 9457 problem details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance: String,
    /// Machine-readable error code.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl Problem {
    #[must_use]
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            type_url: "about:blank".to_owned(),
            title: title.into(),
            status: status.as_u16(),
            detail: detail.into(),
            instance: String::new(),
            code: String::new(),
            trace_id: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = instance.into();
        self
    }

    #[must_use]
    pub fn with_trace_id(mut self, trace_id: Option<String>) -> Self {
        self.trace_id = trace_id;
        self
    }

    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

/// Map a domain error to a Problem for `instance`
pub fn domain_error_to_problem(e: &DomainError, instance: &str) -> Problem {
    let trace_id = tracing::Span::current()
        .id()
        .map(|id| id.into_u64().to_string());

    let problem = match e {
        DomainError::Validation(v) => {
            Problem::new(StatusCode::BAD_REQUEST, "Validation Failed", v.to_string())
                .with_code(v.code())
        }
        DomainError::Permission(PermissionError::NoAbilityComputed) => Problem::new(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "Authentication is required",
        )
        .with_code("unauthorized"),
        DomainError::Permission(p @ PermissionError::Denied { .. }) => {
            Problem::new(StatusCode::FORBIDDEN, "Access denied", p.to_string())
                .with_code("forbidden")
        }
        DomainError::NotFound { .. } => {
            Problem::new(StatusCode::NOT_FOUND, "Not Found", e.to_string()).with_code("not_found")
        }
        DomainError::Conflict { .. } => {
            Problem::new(StatusCode::CONFLICT, "Conflict", e.to_string()).with_code("conflict")
        }
        DomainError::Internal(_) => {
            // details stay in the log
            tracing::error!(error = ?e, "Internal error occurred");
            Problem::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                "An internal error occurred",
            )
            .with_code("internal")
        }
    };
    problem.with_instance(instance).with_trace_id(trace_id)
}

/// Implement Into<Problem> for `DomainError` so `?` works at the boundary
impl From<DomainError> for Problem {
    fn from(e: DomainError) -> Self {
        domain_error_to_problem(&e, "/")
    }
}
