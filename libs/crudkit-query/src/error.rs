//! Validation errors raised while compiling untrusted query input.

use thiserror::Error;

/// Rejection of a filter, update, page or include request.
///
/// Every variant is a caller error (4xx-equivalent). Nothing here is ever
/// corrected silently or retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// An operator object without any operator keys.
    #[error("condition on '{field}' has no operators")]
    EmptyCondition { field: String },

    /// A value does not fit the field's semantic type or the operator's
    /// operand type.
    #[error("type mismatch on '{field}': expected {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },

    /// Conflicting or inverted range bounds.
    #[error("invalid range on '{field}': {reason}")]
    InvalidRange { field: String, reason: String },

    /// More than one of `increment`, `decrement`, `multiply`, `divide`.
    #[error("more than one update operator set on '{field}'")]
    MultipleUpdateOps { field: String },

    /// A filter (or an `OR` branch list) with no conditions.
    #[error("no condition included in {entity} filter")]
    EmptyFilter { entity: String },

    /// An update with no fields.
    #[error("update without any data specified for {entity}")]
    EmptyUpdate { entity: String },

    #[error("'{field}' is not a sortable field of {entity}")]
    InvalidSortField { entity: String, field: String },

    #[error("a defined value is required for '{field}'")]
    RequiredValue { field: String },

    #[error("{entity} has no field '{field}'")]
    UnknownField { entity: String, field: String },

    #[error("unknown operator '{operator}' on '{field}'")]
    UnknownOperator { field: String, operator: String },

    #[error("'in' on '{field}' requires a non-empty list")]
    EmptyInList { field: String },

    /// Input of the wrong JSON shape (e.g. a filter that is not an object).
    #[error("invalid {target}: expected {expected}")]
    InvalidShape {
        target: String,
        expected: &'static str,
    },

    #[error("null is not allowed for {target}")]
    NullNotAllowed { target: String },

    #[error("invalid page parameter '{param}': {reason}")]
    InvalidPage { param: String, reason: String },

    #[error("{entity} has no relation '{relation}' to include")]
    InvalidInclude { entity: String, relation: String },

    #[error("include list for {entity} must not be empty")]
    EmptyInclude { entity: String },

    #[error("division by zero on '{field}'")]
    DivisionByZero { field: String },

    /// Arithmetic on a stored value that is null or would overflow.
    #[error("cannot apply arithmetic update to '{field}'")]
    InvalidArithmetic { field: String },
}

impl ValidationError {
    /// Stable machine-readable code, used in boundary responses.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyCondition { .. } => "empty_condition",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::InvalidRange { .. } => "invalid_range",
            Self::MultipleUpdateOps { .. } => "multiple_update_ops",
            Self::EmptyFilter { .. } => "empty_filter",
            Self::EmptyUpdate { .. } => "empty_update",
            Self::InvalidSortField { .. } => "invalid_sort_field",
            Self::RequiredValue { .. } => "required_value",
            Self::UnknownField { .. } => "unknown_field",
            Self::UnknownOperator { .. } => "unknown_operator",
            Self::EmptyInList { .. } => "empty_in_list",
            Self::InvalidShape { .. } => "invalid_shape",
            Self::NullNotAllowed { .. } => "null_not_allowed",
            Self::InvalidPage { .. } => "invalid_page",
            Self::InvalidInclude { .. } => "invalid_include",
            Self::EmptyInclude { .. } => "empty_include",
            Self::DivisionByZero { .. } => "division_by_zero",
            Self::InvalidArithmetic { .. } => "invalid_arithmetic",
        }
    }

    pub(crate) fn type_mismatch(field: &str, expected: &'static str) -> Self {
        Self::TypeMismatch {
            field: field.to_owned(),
            expected,
        }
    }

    pub(crate) fn invalid_range(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidRange {
            field: field.to_owned(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_shape(target: impl Into<String>, expected: &'static str) -> Self {
        Self::InvalidShape {
            target: target.into(),
            expected,
        }
    }

    pub(crate) fn invalid_page(param: &str, reason: impl Into<String>) -> Self {
        Self::InvalidPage {
            param: param.to_owned(),
            reason: reason.into(),
        }
    }
}
