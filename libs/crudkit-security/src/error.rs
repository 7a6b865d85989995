use thiserror::Error;

use crate::ability::{Action, Subject};

/// Authorization failure at a call site.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    /// The request carries no ability (unauthenticated caller).
    #[error("no ability computed for the current request")]
    NoAbilityComputed,

    #[error("permission denied: cannot {action} {subject}")]
    Denied { action: Action, subject: Subject },
}

/// A role, action or subject name that is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct ParseNameError {
    pub kind: &'static str,
    pub value: String,
}
