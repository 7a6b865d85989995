use crudkit_query::ValidationError;
use crudkit_security::PermissionError;

#[derive(Debug, thiserror::Error)]
pub enum DomainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("{entity} already exists: {detail}")]
    Conflict { entity: &'static str, detail: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn conflict(entity: &'static str, detail: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            detail: detail.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        tracing::error!(error = %e, "record conversion failed");
        Self::Internal(e.to_string())
    }
}
