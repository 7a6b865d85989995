#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Declarative query DSL for crudkit entities.
//!
//! Untrusted request bodies are compiled against static [`EntitySchema`]
//! descriptors into validated filters, updates, pages and include sets,
//! then rendered for the persistence layer:
//!
//! - [`condition`]: per-field conditions (`{"gte": 5}`, `{"in": [..]}`, ...)
//! - [`filter`] / [`update`]: whole-entity filters with `OR` groups and
//!   update-operation objects
//! - [`page`]: paging parameters and relation includes
//! - [`args`]: the JSON query document handed to persistence
//! - [`sea`]: `SeaORM` conditions, relation subqueries and paging

pub mod args;
pub mod condition;
pub mod error;
pub mod filter;
pub mod page;
pub mod schema;
pub mod sea;
pub mod update;
pub mod value;

pub use args::QueryArgs;
pub use condition::{FieldCondition, compile_condition};
pub use error::ValidationError;
pub use filter::{EntityFilter, FilterInput, build_filter};
pub use page::{IncludeSet, Order, Page, PageLimits, resolve_includes, resolve_page};
pub use schema::{Cardinality, EntitySchema, FieldSpec, RelationSpec};
pub use update::{EntityUpdate, UpdateValue, build_update, compile_update_value};
pub use value::{FieldType, FieldValue, integral};
