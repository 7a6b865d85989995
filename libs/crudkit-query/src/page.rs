//! Pagination and relation-include resolution.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::schema::EntitySchema;
use crate::value::integral;

/// Page-size bounds applied to every listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PageLimits {
    pub default_size: u64,
    pub max_size: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_size: 20,
            max_size: 100,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// A validated page request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    /// 1-based page number.
    pub number: u64,
    pub size: u64,
    pub order: Order,
    /// Always a sortable field of the entity the page was resolved for.
    pub order_by: Option<&'static str>,
}

impl Page {
    #[must_use]
    pub fn first(limits: &PageLimits) -> Self {
        Self {
            number: 1,
            size: limits.default_size,
            order: Order::Asc,
            order_by: None,
        }
    }

    /// Records to skip before this page.
    #[must_use]
    pub fn skip(&self) -> u64 {
        self.number.saturating_sub(1).saturating_mul(self.size)
    }

    #[inline]
    #[must_use]
    pub fn take(&self) -> u64 {
        self.size
    }
}

pub mod params {
    pub const NUMBER: &str = "number";
    pub const SIZE: &str = "size";
    pub const ORDER: &str = "order";
    pub const ORDER_BY: &str = "orderBy";
}

fn positive(param: &str, raw: &Value) -> Result<u64, ValidationError> {
    match integral(raw).and_then(|n| u64::try_from(n).ok()) {
        Some(n) if n >= 1 => Ok(n),
        _ => Err(ValidationError::invalid_page(
            param,
            "expected a positive integer",
        )),
    }
}

/// Resolve a raw page object against `schema` and `limits`.
///
/// Missing members take their defaults: page 1, the default size and
/// ascending order. Numbers may be given as strings.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidPage`] for out-of-range numbers or an
/// unknown order, and [`ValidationError::InvalidSortField`] when `orderBy`
/// is not a sortable field.
pub fn resolve_page(
    schema: &EntitySchema,
    raw: Option<&Value>,
    limits: &PageLimits,
) -> Result<Page, ValidationError> {
    let mut page = Page::first(limits);
    let map = match raw {
        None | Some(Value::Null) => return Ok(page),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(ValidationError::invalid_shape("page", "object")),
    };

    for (key, raw) in map {
        match key.as_str() {
            params::NUMBER => page.number = positive(params::NUMBER, raw)?,
            params::SIZE => {
                let size = positive(params::SIZE, raw)?;
                if size > limits.max_size {
                    return Err(ValidationError::invalid_page(
                        params::SIZE,
                        format!("must not exceed {}", limits.max_size),
                    ));
                }
                page.size = size;
            }
            params::ORDER => {
                page.order = match raw.as_str() {
                    Some("asc") => Order::Asc,
                    Some("desc") => Order::Desc,
                    _ => {
                        return Err(ValidationError::invalid_page(
                            params::ORDER,
                            "expected \"asc\" or \"desc\"",
                        ));
                    }
                };
            }
            params::ORDER_BY => {
                let field = raw
                    .as_str()
                    .and_then(|name| schema.field(name))
                    .filter(|f| f.sortable)
                    .ok_or_else(|| ValidationError::InvalidSortField {
                        entity: schema.name.to_owned(),
                        field: raw.as_str().map_or_else(|| raw.to_string(), str::to_owned),
                    })?;
                page.order_by = Some(field.name);
            }
            other => {
                return Err(ValidationError::invalid_page(other, "unknown parameter"));
            }
        }
    }
    Ok(page)
}

/// Order-irrelevant set of relation names to attach. Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncludeSet(BTreeSet<&'static str>);

impl IncludeSet {
    #[must_use]
    pub fn contains(&self, relation: &str) -> bool {
        self.0.contains(relation)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Resolve a raw include request: a single relation name or a list of them.
///
/// # Errors
///
/// Returns [`ValidationError::EmptyInclude`] for `[]` and
/// [`ValidationError::InvalidInclude`] for names that are not relations of
/// `schema`.
pub fn resolve_includes(
    schema: &EntitySchema,
    raw: Option<&Value>,
) -> Result<Option<IncludeSet>, ValidationError> {
    let names: Vec<&Value> = match raw {
        None | Some(Value::Null) => return Ok(None),
        Some(single @ Value::String(_)) => vec![single],
        Some(Value::Array(items)) if items.is_empty() => {
            return Err(ValidationError::EmptyInclude {
                entity: schema.name.to_owned(),
            });
        }
        Some(Value::Array(items)) => items.iter().collect(),
        Some(_) => {
            return Err(ValidationError::invalid_shape(
                "include",
                "relation name or list of names",
            ));
        }
    };

    let mut set = BTreeSet::new();
    for raw in names {
        let Some(name) = raw.as_str() else {
            return Err(ValidationError::invalid_shape("include", "relation name"));
        };
        let relation = schema
            .relation(name)
            .ok_or_else(|| ValidationError::InvalidInclude {
                entity: schema.name.to_owned(),
                relation: name.to_owned(),
            })?;
        set.insert(relation.name);
    }
    Ok(Some(IncludeSet(set)))
}
