//! Tagged request shapes of the catalog endpoints and their parsers.
//!
//! Every parser takes the raw JSON body (path and query parameters merged in
//! by the caller) and returns a fully validated request.

use std::fmt;

use crudkit_query::{
    EntityFilter, EntitySchema, FieldType, FieldValue, FilterInput, IncludeSet, Page, PageLimits,
    ValidationError, build_filter, integral, resolve_includes, resolve_page,
};
use serde_json::{Map, Value};

pub mod items;
pub mod roles;
pub mod users;

pub use items::ItemRequest;
pub use roles::RoleRequest;
pub use users::UserRequest;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Endpoint {
    SearchItems,
    GetItem,
    GetItemByName,
    ItemsByUser,
    CreateItem,
    UpdateItem,
    RemoveItem,
    UpdateItems,
    RemoveItems,
    SearchUsers,
    GetUser,
    GetUserByName,
    CreateUser,
    SetUserRoles,
    ResetPassword,
    RemoveUser,
    RemoveUsers,
    SearchRoles,
    GetRole,
    GetRoleByName,
}

impl Endpoint {
    pub const ALL: [Self; 20] = [
        Self::SearchItems,
        Self::GetItem,
        Self::GetItemByName,
        Self::ItemsByUser,
        Self::CreateItem,
        Self::UpdateItem,
        Self::RemoveItem,
        Self::UpdateItems,
        Self::RemoveItems,
        Self::SearchUsers,
        Self::GetUser,
        Self::GetUserByName,
        Self::CreateUser,
        Self::SetUserRoles,
        Self::ResetPassword,
        Self::RemoveUser,
        Self::RemoveUsers,
        Self::SearchRoles,
        Self::GetRole,
        Self::GetRoleByName,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SearchItems => "items.search",
            Self::GetItem => "items.get",
            Self::GetItemByName => "items.get_by_name",
            Self::ItemsByUser => "items.by_user",
            Self::CreateItem => "items.create",
            Self::UpdateItem => "items.update",
            Self::RemoveItem => "items.remove",
            Self::UpdateItems => "items.update_bulk",
            Self::RemoveItems => "items.remove_bulk",
            Self::SearchUsers => "users.search",
            Self::GetUser => "users.get",
            Self::GetUserByName => "users.get_by_name",
            Self::CreateUser => "users.create",
            Self::SetUserRoles => "users.set_roles",
            Self::ResetPassword => "users.reset_password",
            Self::RemoveUser => "users.remove",
            Self::RemoveUsers => "users.remove_bulk",
            Self::SearchRoles => "roles.search",
            Self::GetRole => "roles.get",
            Self::GetRoleByName => "roles.get_by_name",
        }
    }

    /// Look an endpoint up by its dotted name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.as_str() == name)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated request of any catalog endpoint.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    Items(ItemRequest),
    Users(UserRequest),
    Roles(RoleRequest),
}

impl Request {
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::Items(req) => req.endpoint(),
            Self::Users(req) => req.endpoint(),
            Self::Roles(req) => req.endpoint(),
        }
    }
}

/// Whether a listing is paged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Listing {
    All,
    Paged(Page),
}

mod keys {
    pub const INCLUDES: &str = "includes";
    pub const PAGE: &str = "page";
    pub const ID: &str = "id";
}

/// Accept only an object body whose keys are all in `allowed`.
fn body<'a>(
    endpoint: Endpoint,
    raw: &'a Value,
    allowed: &[&str],
) -> Result<&'a Map<String, Value>, ValidationError> {
    let Value::Object(map) = raw else {
        return Err(ValidationError::InvalidShape {
            target: format!("{endpoint} body"),
            expected: "object",
        });
    };
    if let Some(key) = map.keys().find(|k| !allowed.contains(&k.as_str())) {
        return Err(ValidationError::UnknownField {
            entity: endpoint.as_str().to_owned(),
            field: key.clone(),
        });
    }
    Ok(map)
}

/// Filter on the endpoint's own entity. Must not be `null`.
fn own_filter(
    schema: &EntitySchema,
    map: &Map<String, Value>,
    key: &str,
) -> Result<Option<EntityFilter>, ValidationError> {
    build_filter(schema, map.get(key))?.non_null(key)
}

/// Filter on a related entity. `null` means "no related record".
fn relation_filter(
    schema: &EntitySchema,
    map: &Map<String, Value>,
    key: &str,
) -> Result<FilterInput, ValidationError> {
    build_filter(schema, map.get(key))
}

fn includes(
    schema: &EntitySchema,
    map: &Map<String, Value>,
) -> Result<Option<IncludeSet>, ValidationError> {
    resolve_includes(schema, map.get(keys::INCLUDES))
}

fn listing(
    schema: &EntitySchema,
    map: &Map<String, Value>,
    limits: &PageLimits,
) -> Result<Listing, ValidationError> {
    match map.get(keys::PAGE) {
        None | Some(Value::Null) => Ok(Listing::All),
        raw => resolve_page(schema, raw, limits).map(Listing::Paged),
    }
}

/// A positive id, given as a whole number or a numeric string.
fn id(map: &Map<String, Value>, key: &str) -> Result<i64, ValidationError> {
    let raw = map.get(key).ok_or_else(|| ValidationError::RequiredValue {
        field: key.to_owned(),
    })?;
    match integral(raw) {
        Some(n) if n >= 1 => Ok(n),
        _ => Err(ValidationError::TypeMismatch {
            field: key.to_owned(),
            expected: "positive integer",
        }),
    }
}

fn required(
    map: &Map<String, Value>,
    key: &str,
    ty: FieldType,
) -> Result<FieldValue, ValidationError> {
    let raw = map.get(key).ok_or_else(|| ValidationError::RequiredValue {
        field: key.to_owned(),
    })?;
    match FieldValue::coerce(ty, raw) {
        Some(v) if !v.is_null() => Ok(v),
        _ => Err(ValidationError::TypeMismatch {
            field: key.to_owned(),
            expected: ty.name(),
        }),
    }
}

fn non_empty_string(map: &Map<String, Value>, key: &str) -> Result<String, ValidationError> {
    match required(map, key, FieldType::String)? {
        FieldValue::String(s) if !s.trim().is_empty() => Ok(s),
        _ => Err(ValidationError::TypeMismatch {
            field: key.to_owned(),
            expected: "non-empty string",
        }),
    }
}
