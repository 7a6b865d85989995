//! Per-field condition compiler.
//!
//! A raw condition is either a bare value (equality) or an operator object
//! such as `{"gte": 5, "lt": 10}`. Compilation is fail-fast: the first
//! violated rule is returned and nothing is corrected silently.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::schema::FieldSpec;
use crate::value::{FieldType, FieldValue};

/// Operator keys accepted inside a condition object.
pub mod operators {
    pub const STARTS_WITH: &str = "startsWith";
    pub const ENDS_WITH: &str = "endsWith";
    pub const CONTAINS: &str = "contains";
    pub const IN: &str = "in";
    pub const GT: &str = "gt";
    pub const GTE: &str = "gte";
    pub const LT: &str = "lt";
    pub const LTE: &str = "lte";
}

/// One end of a range.
#[derive(Clone, Debug, PartialEq)]
pub enum Bound {
    Exclusive(FieldValue),
    Inclusive(FieldValue),
}

impl Bound {
    #[must_use]
    pub fn value(&self) -> &FieldValue {
        match self {
            Self::Exclusive(v) | Self::Inclusive(v) => v,
        }
    }

    #[must_use]
    pub fn is_inclusive(&self) -> bool {
        matches!(self, Self::Inclusive(_))
    }
}

/// Validated operator object. At least one member is set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OperatorSet {
    pub starts_with: Option<String>,
    pub ends_with: Option<String>,
    pub contains: Option<String>,
    /// Never empty when present.
    pub one_of: Option<Vec<FieldValue>>,
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

impl OperatorSet {
    fn is_empty(&self) -> bool {
        self.starts_with.is_none()
            && self.ends_with.is_none()
            && self.contains.is_none()
            && self.one_of.is_none()
            && self.lower.is_none()
            && self.upper.is_none()
    }

    /// All operators must hold (AND).
    #[must_use]
    pub fn matches(&self, actual: &FieldValue) -> bool {
        let text = actual.as_str();
        if let Some(prefix) = &self.starts_with
            && !text.is_some_and(|s| s.starts_with(prefix.as_str()))
        {
            return false;
        }
        if let Some(suffix) = &self.ends_with
            && !text.is_some_and(|s| s.ends_with(suffix.as_str()))
        {
            return false;
        }
        if let Some(needle) = &self.contains
            && !text.is_some_and(|s| s.contains(needle.as_str()))
        {
            return false;
        }
        if let Some(values) = &self.one_of
            && !values.iter().any(|v| v.same_as(actual))
        {
            return false;
        }
        if let Some(lower) = &self.lower {
            let ok = match actual.compare(lower.value()) {
                Some(Ordering::Greater) => true,
                Some(Ordering::Equal) => lower.is_inclusive(),
                Some(Ordering::Less) | None => false,
            };
            if !ok {
                return false;
            }
        }
        if let Some(upper) = &self.upper {
            let ok = match actual.compare(upper.value()) {
                Some(Ordering::Less) => true,
                Some(Ordering::Equal) => upper.is_inclusive(),
                Some(Ordering::Greater) | None => false,
            };
            if !ok {
                return false;
            }
        }
        true
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        if let Some(s) = &self.starts_with {
            out.insert(operators::STARTS_WITH.to_owned(), Value::String(s.clone()));
        }
        if let Some(s) = &self.ends_with {
            out.insert(operators::ENDS_WITH.to_owned(), Value::String(s.clone()));
        }
        if let Some(s) = &self.contains {
            out.insert(operators::CONTAINS.to_owned(), Value::String(s.clone()));
        }
        if let Some(values) = &self.one_of {
            out.insert(
                operators::IN.to_owned(),
                Value::Array(values.iter().map(FieldValue::to_json).collect()),
            );
        }
        if let Some(lower) = &self.lower {
            let key = if lower.is_inclusive() {
                operators::GTE
            } else {
                operators::GT
            };
            out.insert(key.to_owned(), lower.value().to_json());
        }
        if let Some(upper) = &self.upper {
            let key = if upper.is_inclusive() {
                operators::LTE
            } else {
                operators::LT
            };
            out.insert(key.to_owned(), upper.value().to_json());
        }
        Value::Object(out)
    }
}

/// A validated condition on a single field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldCondition {
    Equals(FieldValue),
    Operators(OperatorSet),
}

impl FieldCondition {
    #[must_use]
    pub fn matches(&self, actual: &FieldValue) -> bool {
        match self {
            Self::Equals(expected) => expected.same_as(actual),
            Self::Operators(ops) => ops.matches(actual),
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Equals(v) => v.to_json(),
            Self::Operators(ops) => ops.to_json(),
        }
    }
}

/// Compile a raw JSON condition for `field`.
///
/// `raw == None` means the key was present but its value undefined.
///
/// # Errors
///
/// Returns a [`ValidationError`] describing the first rule the input breaks.
pub fn compile_condition(
    field: &FieldSpec,
    raw: Option<&Value>,
) -> Result<FieldCondition, ValidationError> {
    let Some(raw) = raw else {
        return Err(ValidationError::RequiredValue {
            field: field.name.to_owned(),
        });
    };
    match raw {
        Value::Object(map) => compile_operators(field, map).map(FieldCondition::Operators),
        Value::Null if !field.nullable => Err(ValidationError::NullNotAllowed {
            target: field.name.to_owned(),
        }),
        other => coerce(field, other).map(FieldCondition::Equals),
    }
}

fn coerce(field: &FieldSpec, raw: &Value) -> Result<FieldValue, ValidationError> {
    FieldValue::coerce(field.ty, raw)
        .ok_or_else(|| ValidationError::type_mismatch(field.name, field.ty.name()))
}

/// Operator operands are never null.
fn coerce_operand(field: &FieldSpec, raw: &Value) -> Result<FieldValue, ValidationError> {
    if raw.is_null() {
        return Err(ValidationError::type_mismatch(field.name, field.ty.name()));
    }
    coerce(field, raw)
}

fn string_operand(field: &FieldSpec, raw: &Value) -> Result<String, ValidationError> {
    match raw {
        Value::String(s) if field.ty == FieldType::String => Ok(s.clone()),
        _ => Err(ValidationError::type_mismatch(field.name, "string")),
    }
}

fn set_bound(
    field: &FieldSpec,
    slot: &mut Option<Bound>,
    bound: Bound,
    conflict: &str,
) -> Result<(), ValidationError> {
    if slot.is_some() {
        return Err(ValidationError::invalid_range(
            field.name,
            format!("{conflict} are mutually exclusive"),
        ));
    }
    *slot = Some(bound);
    Ok(())
}

fn compile_operators(
    field: &FieldSpec,
    map: &Map<String, Value>,
) -> Result<OperatorSet, ValidationError> {
    let mut ops = OperatorSet::default();
    for (key, raw) in map {
        match key.as_str() {
            operators::STARTS_WITH => ops.starts_with = Some(string_operand(field, raw)?),
            operators::ENDS_WITH => ops.ends_with = Some(string_operand(field, raw)?),
            operators::CONTAINS => ops.contains = Some(string_operand(field, raw)?),
            operators::IN => {
                let Value::Array(items) = raw else {
                    return Err(ValidationError::type_mismatch(field.name, "array"));
                };
                if items.is_empty() {
                    return Err(ValidationError::EmptyInList {
                        field: field.name.to_owned(),
                    });
                }
                let values = items
                    .iter()
                    .map(|item| coerce_operand(field, item))
                    .collect::<Result<Vec<_>, _>>()?;
                ops.one_of = Some(values);
            }
            operators::GT => {
                let v = coerce_operand(field, raw)?;
                set_bound(field, &mut ops.lower, Bound::Exclusive(v), "gt and gte")?;
            }
            operators::GTE => {
                let v = coerce_operand(field, raw)?;
                set_bound(field, &mut ops.lower, Bound::Inclusive(v), "gt and gte")?;
            }
            operators::LT => {
                let v = coerce_operand(field, raw)?;
                set_bound(field, &mut ops.upper, Bound::Exclusive(v), "lt and lte")?;
            }
            operators::LTE => {
                let v = coerce_operand(field, raw)?;
                set_bound(field, &mut ops.upper, Bound::Inclusive(v), "lt and lte")?;
            }
            other => {
                return Err(ValidationError::UnknownOperator {
                    field: field.name.to_owned(),
                    operator: other.to_owned(),
                });
            }
        }
    }

    if ops.is_empty() {
        return Err(ValidationError::EmptyCondition {
            field: field.name.to_owned(),
        });
    }

    if let (Some(lower), Some(upper)) = (&ops.lower, &ops.upper) {
        match lower.value().compare(upper.value()) {
            Some(Ordering::Less | Ordering::Equal) => {}
            Some(Ordering::Greater) => {
                return Err(ValidationError::invalid_range(
                    field.name,
                    format!(
                        "lower bound {} is greater than upper bound {}",
                        lower.value(),
                        upper.value()
                    ),
                ));
            }
            None => {
                return Err(ValidationError::invalid_range(
                    field.name,
                    "bounds are not comparable",
                ));
            }
        }
    }

    Ok(ops)
}
