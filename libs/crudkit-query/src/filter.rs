//! Whole-entity filter builder.

use serde_json::{Map, Value};

use crate::condition::{FieldCondition, compile_condition};
use crate::error::ValidationError;
use crate::schema::{EntitySchema, FieldSpec};

/// Key of the top-level disjunction.
pub const OR_KEY: &str = "OR";

/// Conjunction of per-field conditions. Never empty.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldFilter {
    pub conditions: Vec<(&'static FieldSpec, FieldCondition)>,
}

impl FieldFilter {
    #[must_use]
    pub fn to_json(&self) -> Value {
        let out: Map<String, Value> = self
            .conditions
            .iter()
            .map(|(field, cond)| (field.name.to_owned(), cond.to_json()))
            .collect();
        Value::Object(out)
    }
}

/// Validated filter over one entity.
#[derive(Clone, Debug, PartialEq)]
pub enum EntityFilter {
    /// Every condition must hold.
    All(FieldFilter),
    /// At least one branch must hold. Never empty.
    Any(Vec<FieldFilter>),
}

impl EntityFilter {
    /// Branches of the filter as a disjunction of conjunctions.
    #[must_use]
    pub fn branches(&self) -> &[FieldFilter] {
        match self {
            Self::All(f) => std::slice::from_ref(f),
            Self::Any(branches) => branches,
        }
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::All(f) => f.to_json(),
            Self::Any(branches) => {
                let mut out = Map::new();
                out.insert(
                    OR_KEY.to_owned(),
                    Value::Array(branches.iter().map(FieldFilter::to_json).collect()),
                );
                Value::Object(out)
            }
        }
    }
}

/// Outcome of parsing an optional filter.
///
/// An explicit `null` is kept apart from an absent filter: relation filters
/// use it to mean "no related record", own-entity filters reject it.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum FilterInput {
    #[default]
    Absent,
    Null,
    Filter(EntityFilter),
}

impl FilterInput {
    #[must_use]
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Require a non-null filter for `target`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NullNotAllowed`] for an explicit `null`.
    pub fn non_null(self, target: &str) -> Result<Option<EntityFilter>, ValidationError> {
        match self {
            Self::Absent => Ok(None),
            Self::Null => Err(ValidationError::NullNotAllowed {
                target: target.to_owned(),
            }),
            Self::Filter(f) => Ok(Some(f)),
        }
    }
}

/// Parse and validate a raw filter for `schema`.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyFilter`] for `{}` or `{"OR": []}`,
/// [`ValidationError::InvalidShape`] for malformed input,
/// [`ValidationError::UnknownField`] for undeclared fields, and any
/// per-field error from [`compile_condition`].
pub fn build_filter(
    schema: &EntitySchema,
    raw: Option<&Value>,
) -> Result<FilterInput, ValidationError> {
    let map = match raw {
        None => return Ok(FilterInput::Absent),
        Some(Value::Null) => return Ok(FilterInput::Null),
        Some(Value::Object(map)) => map,
        Some(_) => {
            return Err(ValidationError::invalid_shape(
                format!("{} filter", schema.name),
                "object",
            ));
        }
    };

    let Some(or) = map.get(OR_KEY) else {
        return build_field_filter(schema, map).map(|f| FilterInput::Filter(EntityFilter::All(f)));
    };
    if map.len() > 1 {
        return Err(ValidationError::invalid_shape(
            format!("{} filter", schema.name),
            "OR as the only key",
        ));
    }
    let Value::Array(items) = or else {
        return Err(ValidationError::invalid_shape(
            format!("{} filter OR", schema.name),
            "array",
        ));
    };
    if items.is_empty() {
        return Err(ValidationError::EmptyFilter {
            entity: schema.name.to_owned(),
        });
    }
    let branches = items
        .iter()
        .map(|item| match item {
            Value::Object(branch) => build_field_filter(schema, branch),
            _ => Err(ValidationError::invalid_shape(
                format!("{} filter OR branch", schema.name),
                "object",
            )),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FilterInput::Filter(EntityFilter::Any(branches)))
}

fn build_field_filter(
    schema: &EntitySchema,
    map: &Map<String, Value>,
) -> Result<FieldFilter, ValidationError> {
    if map.is_empty() {
        return Err(ValidationError::EmptyFilter {
            entity: schema.name.to_owned(),
        });
    }
    let mut conditions = Vec::with_capacity(map.len());
    for (key, raw) in map {
        if key == OR_KEY {
            return Err(ValidationError::invalid_shape(
                format!("{} filter OR branch", schema.name),
                "field map without nested OR",
            ));
        }
        let field = schema
            .field(key)
            .ok_or_else(|| ValidationError::UnknownField {
                entity: schema.name.to_owned(),
                field: key.clone(),
            })?;
        conditions.push((field, compile_condition(field, Some(raw))?));
    }
    Ok(FieldFilter { conditions })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::value::{FieldType, FieldValue};
    use serde_json::json;

    static FIELDS: [FieldSpec; 3] = [
        FieldSpec::new("id", FieldType::Int).readonly(),
        FieldSpec::new("name", FieldType::String),
        FieldSpec::new("price", FieldType::Float),
    ];
    static ITEM: EntitySchema = EntitySchema::new("item", &FIELDS, &[]);

    fn build(raw: &Value) -> Result<FilterInput, ValidationError> {
        build_filter(&ITEM, Some(raw))
    }

    #[test]
    fn zero_field_filter_is_empty() {
        assert_eq!(
            build(&json!({})),
            Err(ValidationError::EmptyFilter {
                entity: "item".into()
            })
        );
    }

    #[test]
    fn zero_branch_or_is_empty() {
        assert_eq!(
            build(&json!({"OR": []})),
            Err(ValidationError::EmptyFilter {
                entity: "item".into()
            })
        );
        assert!(matches!(
            build(&json!({"OR": [{}]})),
            Err(ValidationError::EmptyFilter { .. })
        ));
    }

    #[test]
    fn null_and_absent_are_distinct() {
        assert_eq!(build_filter(&ITEM, None), Ok(FilterInput::Absent));
        assert_eq!(build(&Value::Null), Ok(FilterInput::Null));
        assert!(matches!(
            FilterInput::Null.non_null("item"),
            Err(ValidationError::NullNotAllowed { .. })
        ));
        assert_eq!(FilterInput::Absent.non_null("item"), Ok(None));
    }

    #[test]
    fn field_map_compiles_each_condition() {
        let input = build(&json!({"name": "desk", "price": {"lt": 100}})).unwrap();
        let FilterInput::Filter(EntityFilter::All(filter)) = input else {
            panic!("expected a conjunction");
        };
        assert_eq!(filter.conditions.len(), 2);
        assert_eq!(
            filter.conditions[0].1,
            FieldCondition::Equals(FieldValue::from("desk"))
        );
    }

    #[test]
    fn or_branches_are_validated_independently() {
        let input = build(&json!({"OR": [{"name": "desk"}, {"price": {"gte": 10}}]})).unwrap();
        let FilterInput::Filter(filter) = input else {
            panic!("expected a filter");
        };
        assert_eq!(filter.branches().len(), 2);

        assert!(matches!(
            build(&json!({"OR": [{"name": "desk"}, {"price": {"in": []}}]})),
            Err(ValidationError::EmptyInList { .. })
        ));
    }

    #[test]
    fn malformed_shapes_are_rejected() {
        assert!(matches!(
            build(&json!(["name"])),
            Err(ValidationError::InvalidShape { .. })
        ));
        assert!(matches!(
            build(&json!({"OR": [{"name": "a"}], "price": 1})),
            Err(ValidationError::InvalidShape { .. })
        ));
        assert!(matches!(
            build(&json!({"OR": {"name": "a"}})),
            Err(ValidationError::InvalidShape { .. })
        ));
        assert!(matches!(
            build(&json!({"colour": "red"})),
            Err(ValidationError::UnknownField { field, .. }) if field == "colour"
        ));
    }

    #[test]
    fn renders_or_groups() {
        let raw = json!({"OR": [{"name": "desk"}, {"price": {"gte": 10.0}}]});
        let FilterInput::Filter(filter) = build(&raw).unwrap() else {
            panic!("expected a filter");
        };
        assert_eq!(filter.to_json(), raw);
    }
}
