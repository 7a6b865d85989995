//! Entity descriptors of the catalog.
//!
//! Field names are the JSON names used in request bodies and stored records.
//! Ids, foreign keys and timestamps are readonly; every field is sortable.

use crudkit_query::{EntitySchema, FieldSpec, FieldType, RelationSpec};

pub mod names {
    pub const USER: &str = "user";
    pub const PROFILE: &str = "profile";
    pub const ROLE: &str = "role";
    pub const ITEM: &str = "item";
}

static USER_FIELDS: [FieldSpec; 5] = [
    FieldSpec::new("id", FieldType::Int).readonly(),
    FieldSpec::new("username", FieldType::String).readonly(),
    FieldSpec::new("email", FieldType::String),
    FieldSpec::new("createdAt", FieldType::DateTime).readonly(),
    FieldSpec::new("updatedAt", FieldType::DateTime).readonly(),
];
static USER_RELATIONS: [RelationSpec; 3] = [
    RelationSpec::to_one("profile", names::PROFILE),
    RelationSpec::to_many("roles", names::ROLE),
    RelationSpec::to_many("items", names::ITEM),
];
/// Passwords are never exposed, so they are not declared.
pub static USER: EntitySchema = EntitySchema::new(names::USER, &USER_FIELDS, &USER_RELATIONS);

static PROFILE_FIELDS: [FieldSpec; 5] = [
    FieldSpec::new("id", FieldType::Int).readonly(),
    FieldSpec::new("username", FieldType::String).readonly(),
    FieldSpec::new("name", FieldType::String).nullable(),
    FieldSpec::new("createdAt", FieldType::DateTime).readonly(),
    FieldSpec::new("updatedAt", FieldType::DateTime).readonly(),
];
static PROFILE_RELATIONS: [RelationSpec; 1] = [RelationSpec::to_one("user", names::USER)];
pub static PROFILE: EntitySchema =
    EntitySchema::new(names::PROFILE, &PROFILE_FIELDS, &PROFILE_RELATIONS);

static ROLE_FIELDS: [FieldSpec; 4] = [
    FieldSpec::new("id", FieldType::Int).readonly(),
    FieldSpec::new("name", FieldType::String),
    FieldSpec::new("createdAt", FieldType::DateTime).readonly(),
    FieldSpec::new("updatedAt", FieldType::DateTime).readonly(),
];
static ROLE_RELATIONS: [RelationSpec; 1] = [RelationSpec::to_many("users", names::USER)];
pub static ROLE: EntitySchema = EntitySchema::new(names::ROLE, &ROLE_FIELDS, &ROLE_RELATIONS);

static ITEM_FIELDS: [FieldSpec; 6] = [
    FieldSpec::new("id", FieldType::Int).readonly(),
    FieldSpec::new("username", FieldType::String).readonly(),
    FieldSpec::new("name", FieldType::String),
    FieldSpec::new("price", FieldType::Float),
    FieldSpec::new("createdAt", FieldType::DateTime).readonly(),
    FieldSpec::new("updatedAt", FieldType::DateTime).readonly(),
];
static ITEM_RELATIONS: [RelationSpec; 1] = [RelationSpec::to_one("user", names::USER)];
pub static ITEM: EntitySchema = EntitySchema::new(names::ITEM, &ITEM_FIELDS, &ITEM_RELATIONS);

pub static ALL: [&EntitySchema; 4] = [&USER, &PROFILE, &ROLE, &ITEM];

#[must_use]
pub fn by_name(name: &str) -> Option<&'static EntitySchema> {
    ALL.iter().copied().find(|s| s.name == name)
}
