//! Update-operation builder.
//!
//! A field in an update body is either a bare value (assignment) or an
//! arithmetic operator object with exactly one of `increment`, `decrement`,
//! `multiply`, `divide`. Arithmetic is only accepted on numeric fields.

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::filter::OR_KEY;
use crate::schema::{EntitySchema, FieldSpec};
use crate::value::FieldValue;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpdateOpKind {
    Increment,
    Decrement,
    Multiply,
    Divide,
}

impl UpdateOpKind {
    pub const ALL: [Self; 4] = [
        Self::Increment,
        Self::Decrement,
        Self::Multiply,
        Self::Divide,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Increment => "increment",
            Self::Decrement => "decrement",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
        }
    }

    fn parse(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

/// Arithmetic applied to the stored value.
#[derive(Clone, Debug, PartialEq)]
pub struct UpdateOp {
    pub kind: UpdateOpKind,
    /// Always `Int` or `Float`, matching the field type.
    pub operand: FieldValue,
}

#[derive(Clone, Debug, PartialEq)]
pub enum UpdateValue {
    Set(FieldValue),
    Apply(UpdateOp),
}

impl UpdateValue {
    /// Compute the new value from the stored one.
    ///
    /// Returns `None` when arithmetic hits a non-numeric stored value or
    /// overflows.
    #[must_use]
    pub fn apply(&self, current: &FieldValue) -> Option<FieldValue> {
        let op = match self {
            Self::Set(v) => return Some(v.clone()),
            Self::Apply(op) => op,
        };
        match (current, &op.operand) {
            (FieldValue::Int(a), FieldValue::Int(b)) => match op.kind {
                UpdateOpKind::Increment => a.checked_add(*b),
                UpdateOpKind::Decrement => a.checked_sub(*b),
                UpdateOpKind::Multiply => a.checked_mul(*b),
                UpdateOpKind::Divide => a.checked_div(*b),
            }
            .map(FieldValue::Int),
            (FieldValue::Float(a), FieldValue::Float(b)) => {
                let out = match op.kind {
                    UpdateOpKind::Increment => a + b,
                    UpdateOpKind::Decrement => a - b,
                    UpdateOpKind::Multiply => a * b,
                    UpdateOpKind::Divide => a / b,
                };
                out.is_finite().then_some(FieldValue::Float(out))
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Set(v) => v.to_json(),
            Self::Apply(op) => {
                let mut out = Map::new();
                out.insert(op.kind.as_str().to_owned(), op.operand.to_json());
                Value::Object(out)
            }
        }
    }
}

/// Validated update for one entity. Never empty.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityUpdate {
    pub entity: &'static str,
    pub fields: Vec<(&'static FieldSpec, UpdateValue)>,
}

impl EntityUpdate {
    #[must_use]
    pub fn to_json(&self) -> Value {
        let out: Map<String, Value> = self
            .fields
            .iter()
            .map(|(field, value)| (field.name.to_owned(), value.to_json()))
            .collect();
        Value::Object(out)
    }

    /// Apply the update to a stored record in place.
    ///
    /// The record is left untouched when any field fails.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidArithmetic`] when an operator cannot
    /// be applied to the stored value.
    pub fn apply_to(&self, record: &mut Map<String, Value>) -> Result<(), ValidationError> {
        let mut next = Vec::with_capacity(self.fields.len());
        for (field, value) in &self.fields {
            let current = record
                .get(field.name)
                .and_then(|raw| FieldValue::coerce(field.ty, raw))
                .unwrap_or(FieldValue::Null);
            let updated =
                value
                    .apply(&current)
                    .ok_or_else(|| ValidationError::InvalidArithmetic {
                        field: field.name.to_owned(),
                    })?;
            next.push((field.name, updated));
        }
        for (name, value) in next {
            record.insert(name.to_owned(), value.to_json());
        }
        Ok(())
    }
}

/// Compile the update value of a single field.
///
/// # Errors
///
/// Returns [`ValidationError::MultipleUpdateOps`] when more than one operator
/// is set, [`ValidationError::TypeMismatch`] for arithmetic on non-numeric
/// fields or operands, and [`ValidationError::DivisionByZero`] for `divide: 0`.
pub fn compile_update_value(
    field: &FieldSpec,
    raw: &Value,
) -> Result<UpdateValue, ValidationError> {
    let Value::Object(map) = raw else {
        if raw.is_null() && !field.nullable {
            return Err(ValidationError::NullNotAllowed {
                target: field.name.to_owned(),
            });
        }
        return FieldValue::coerce(field.ty, raw)
            .map(UpdateValue::Set)
            .ok_or_else(|| ValidationError::type_mismatch(field.name, field.ty.name()));
    };

    let mut found: Option<(UpdateOpKind, &Value)> = None;
    for (key, operand) in map {
        let Some(kind) = UpdateOpKind::parse(key) else {
            return Err(ValidationError::UnknownOperator {
                field: field.name.to_owned(),
                operator: key.clone(),
            });
        };
        if found.is_some() {
            return Err(ValidationError::MultipleUpdateOps {
                field: field.name.to_owned(),
            });
        }
        found = Some((kind, operand));
    }
    let Some((kind, operand)) = found else {
        return Err(ValidationError::EmptyCondition {
            field: field.name.to_owned(),
        });
    };

    if !field.ty.is_numeric() {
        return Err(ValidationError::type_mismatch(field.name, "number"));
    }
    let operand = match FieldValue::coerce(field.ty, operand) {
        Some(v) if !v.is_null() => v,
        _ => return Err(ValidationError::type_mismatch(field.name, field.ty.name())),
    };
    if kind == UpdateOpKind::Divide && is_zero(&operand) {
        return Err(ValidationError::DivisionByZero {
            field: field.name.to_owned(),
        });
    }
    Ok(UpdateValue::Apply(UpdateOp { kind, operand }))
}

#[allow(clippy::float_cmp)]
fn is_zero(v: &FieldValue) -> bool {
    match v {
        FieldValue::Int(n) => *n == 0,
        FieldValue::Float(n) => *n == 0.0,
        _ => false,
    }
}

/// Build a whole-entity update. `OR` groups are not allowed here.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyUpdate`] for an absent, null or empty
/// body, [`ValidationError::UnknownField`] for fields that are not declared
/// or not updatable, and any per-field error from [`compile_update_value`].
pub fn build_update(
    schema: &EntitySchema,
    raw: Option<&Value>,
) -> Result<EntityUpdate, ValidationError> {
    let empty = || ValidationError::EmptyUpdate {
        entity: schema.name.to_owned(),
    };
    let map = match raw {
        None | Some(Value::Null) => return Err(empty()),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(ValidationError::invalid_shape(
                format!("{} update", schema.name),
                "object",
            ));
        }
    };
    if map.is_empty() {
        return Err(empty());
    }

    let mut fields = Vec::with_capacity(map.len());
    for (key, raw) in map {
        if key == OR_KEY {
            return Err(ValidationError::invalid_shape(
                format!("{} update", schema.name),
                "field map without OR",
            ));
        }
        let field = schema
            .field(key)
            .filter(|f| f.updatable)
            .ok_or_else(|| ValidationError::UnknownField {
                entity: schema.name.to_owned(),
                field: key.clone(),
            })?;
        fields.push((field, compile_update_value(field, raw)?));
    }
    Ok(EntityUpdate {
        entity: schema.name,
        fields,
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::value::FieldType;
    use serde_json::json;

    static FIELDS: [FieldSpec; 4] = [
        FieldSpec::new("id", FieldType::Int).readonly(),
        FieldSpec::new("name", FieldType::String),
        FieldSpec::new("price", FieldType::Float),
        FieldSpec::new("stock", FieldType::Int),
    ];
    static ITEM: EntitySchema = EntitySchema::new("item", &FIELDS, &[]);

    #[test]
    fn two_update_ops_on_one_field_are_rejected() {
        let raw = json!({"price": {"increment": 5, "decrement": 2}});
        assert_eq!(
            build_update(&ITEM, Some(&raw)),
            Err(ValidationError::MultipleUpdateOps {
                field: "price".into()
            })
        );
    }

    #[test]
    fn empty_or_missing_body_is_empty_update() {
        let expected = Err(ValidationError::EmptyUpdate {
            entity: "item".into(),
        });
        assert_eq!(build_update(&ITEM, None), expected);
        assert_eq!(build_update(&ITEM, Some(&Value::Null)), expected);
        assert_eq!(build_update(&ITEM, Some(&json!({}))), expected);
    }

    #[test]
    fn or_and_readonly_fields_are_rejected() {
        assert!(matches!(
            build_update(&ITEM, Some(&json!({"OR": []}))),
            Err(ValidationError::InvalidShape { .. })
        ));
        assert!(matches!(
            build_update(&ITEM, Some(&json!({"id": 3}))),
            Err(ValidationError::UnknownField { field, .. }) if field == "id"
        ));
    }

    #[test]
    fn arithmetic_only_on_numeric_fields() {
        assert!(matches!(
            build_update(&ITEM, Some(&json!({"name": {"increment": 1}}))),
            Err(ValidationError::TypeMismatch { expected: "number", .. })
        ));
        assert!(matches!(
            build_update(&ITEM, Some(&json!({"stock": {"increment": 1.5}}))),
            Err(ValidationError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn divide_by_zero_is_rejected() {
        assert!(matches!(
            build_update(&ITEM, Some(&json!({"stock": {"divide": 0}}))),
            Err(ValidationError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn apply_to_record() {
        let update = build_update(
            &ITEM,
            Some(&json!({"name": "lamp", "price": {"multiply": 2}, "stock": {"decrement": 3}})),
        )
        .unwrap();
        let mut record = json!({"id": 1, "name": "desk", "price": 10.5, "stock": 4})
            .as_object()
            .cloned()
            .unwrap();
        update.apply_to(&mut record).unwrap();
        assert_eq!(
            Value::Object(record),
            json!({"id": 1, "name": "lamp", "price": 21.0, "stock": 1})
        );
    }

    #[test]
    fn failed_apply_leaves_record_untouched() {
        let update = build_update(
            &ITEM,
            Some(&json!({"name": "lamp", "stock": {"increment": 1}})),
        )
        .unwrap();
        let mut record = json!({"name": "desk", "stock": i64::MAX})
            .as_object()
            .cloned()
            .unwrap();
        let before = record.clone();
        assert!(matches!(
            update.apply_to(&mut record),
            Err(ValidationError::InvalidArithmetic { .. })
        ));
        assert_eq!(record, before);
    }

    #[test]
    fn renders_operator_objects() {
        let update = build_update(&ITEM, Some(&json!({"price": {"increment": 5}}))).unwrap();
        assert_eq!(update.to_json(), json!({"price": {"increment": 5.0}}));
    }
}
