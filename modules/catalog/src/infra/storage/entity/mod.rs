//! Table rows of the catalog database.
//!
//! Each entity maps the declared JSON field names of its schema to columns
//! through [`FilterableEntity`](crudkit_query::sea::FilterableEntity).

pub mod item;
pub mod profile;
pub mod role;
pub mod user;
pub mod user_role;
