//! Query arguments handed to the persistence layer.
//!
//! [`QueryArgs`] bundles a validated own-entity filter, relation filters, a
//! page and an include set, and renders them as the persistence layer's JSON
//! query document:
//!
//! ```json
//! { "where": { ... }, "skip": 0, "take": 20, "orderBy": { "name": "asc" }, "include": { "user": true } }
//! ```

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::filter::{FilterInput, OR_KEY};
use crate::page::{IncludeSet, Page};
use crate::schema::{Cardinality, EntitySchema, RelationSpec};

/// Keys of the rendered relation constraints.
pub mod relation_ops {
    pub const IS: &str = "is";
    pub const SOME: &str = "some";
    pub const NONE: &str = "none";
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueryArgs {
    schema: &'static EntitySchema,
    filter: FilterInput,
    relations: Vec<(&'static RelationSpec, FilterInput)>,
    page: Option<Page>,
    include: Option<IncludeSet>,
}

impl QueryArgs {
    #[must_use]
    pub fn new(schema: &'static EntitySchema) -> Self {
        Self {
            schema,
            filter: FilterInput::Absent,
            relations: Vec::new(),
            page: None,
            include: None,
        }
    }

    #[must_use]
    pub fn with_filter(mut self, filter: FilterInput) -> Self {
        self.filter = filter;
        self
    }

    /// Constrain the query by a filter on a related entity.
    ///
    /// An absent filter adds nothing. Setting the same relation twice keeps
    /// the last filter.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownField`] if `relation` is not declared
    /// on the entity.
    pub fn with_relation_filter(
        mut self,
        relation: &str,
        filter: FilterInput,
    ) -> Result<Self, ValidationError> {
        let declared = self
            .schema
            .relation(relation)
            .ok_or_else(|| ValidationError::UnknownField {
                entity: self.schema.name.to_owned(),
                field: relation.to_owned(),
            })?;
        if filter.is_absent() {
            return Ok(self);
        }
        self.relations.retain(|(r, _)| r.name != declared.name);
        self.relations.push((declared, filter));
        Ok(self)
    }

    #[must_use]
    pub fn with_page(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn with_includes(mut self, include: Option<IncludeSet>) -> Self {
        self.include = include;
        self
    }

    #[must_use]
    pub fn schema(&self) -> &'static EntitySchema {
        self.schema
    }

    #[must_use]
    pub fn filter(&self) -> &FilterInput {
        &self.filter
    }

    #[must_use]
    pub fn relations(&self) -> &[(&'static RelationSpec, FilterInput)] {
        &self.relations
    }

    #[must_use]
    pub fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    #[must_use]
    pub fn include(&self) -> Option<&IncludeSet> {
        self.include.as_ref()
    }

    /// The `where` document, or `None` when nothing constrains the query.
    #[must_use]
    pub fn where_json(&self) -> Option<Value> {
        let mut out = match &self.filter {
            FilterInput::Absent => Map::new(),
            // matches nothing
            FilterInput::Null => {
                let mut m = Map::new();
                m.insert(OR_KEY.to_owned(), Value::Array(Vec::new()));
                m
            }
            FilterInput::Filter(f) => match f.to_json() {
                Value::Object(m) => m,
                _ => Map::new(),
            },
        };
        for (relation, filter) in &self.relations {
            if let Some(rendered) = relation_constraint(relation, filter) {
                out.insert(relation.name.to_owned(), rendered);
            }
        }
        (!out.is_empty()).then_some(Value::Object(out))
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        if let Some(w) = self.where_json() {
            out.insert("where".to_owned(), w);
        }
        if let Some(page) = &self.page {
            out.insert("skip".to_owned(), Value::from(page.skip()));
            out.insert("take".to_owned(), Value::from(page.take()));
            if let Some(field) = page.order_by {
                let mut order = Map::new();
                order.insert(field.to_owned(), Value::from(page.order.as_str()));
                out.insert("orderBy".to_owned(), Value::Object(order));
            }
        }
        if let Some(include) = &self.include {
            let rels: Map<String, Value> = include
                .iter()
                .map(|name| (name.to_owned(), Value::Bool(true)))
                .collect();
            out.insert("include".to_owned(), Value::Object(rels));
        }
        Value::Object(out)
    }
}

/// Render one relation constraint.
///
/// | relation | filter   | rendered                 |
/// |----------|----------|--------------------------|
/// | to-one   | `f`      | `{"is": f}`              |
/// | to-one   | `null`   | `{"is": null}`           |
/// | to-many  | `f`      | `{"some": f}`            |
/// | to-many  | `null`   | `{"none": {}}`           |
/// | any      | absent   | nothing                  |
#[must_use]
pub fn relation_constraint(relation: &RelationSpec, filter: &FilterInput) -> Option<Value> {
    let (key, value) = match (relation.cardinality, filter) {
        (_, FilterInput::Absent) => return None,
        (Cardinality::One, FilterInput::Filter(f)) => (relation_ops::IS, f.to_json()),
        (Cardinality::One, FilterInput::Null) => (relation_ops::IS, Value::Null),
        (Cardinality::Many, FilterInput::Filter(f)) => (relation_ops::SOME, f.to_json()),
        (Cardinality::Many, FilterInput::Null) => (relation_ops::NONE, Value::Object(Map::new())),
    };
    let mut out = Map::new();
    out.insert(key.to_owned(), value);
    Some(Value::Object(out))
}
