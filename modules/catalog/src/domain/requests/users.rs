use crudkit_query::{EntityFilter, FilterInput, IncludeSet, PageLimits, ValidationError};
use crudkit_security::RoleName;
use serde_json::{Map, Value};

use super::{
    Endpoint, Listing, body, id, includes, keys, listing, non_empty_string, own_filter,
    relation_filter,
};
use crate::domain::entities::{ITEM, PROFILE, ROLE, USER};
use crate::domain::models::{NewProfile, NewUser, RoleKey, RoleOp};

/// Users search: own filter plus `profiles`, `roles` and `items` relation
/// filters.
#[derive(Clone, Debug, PartialEq)]
pub struct SearchUsers {
    pub users: Option<EntityFilter>,
    pub profiles: FilterInput,
    pub roles: FilterInput,
    pub items: FilterInput,
    pub includes: Option<IncludeSet>,
    pub listing: Listing,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GetUser {
    pub id: i64,
    pub includes: Option<IncludeSet>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GetUserByName {
    pub username: String,
    pub includes: Option<IncludeSet>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateUser {
    pub user: NewUser,
    pub profile: Option<NewProfile>,
    pub roles: Vec<RoleKey>,
    pub includes: Option<IncludeSet>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SetUserRoles {
    pub id: i64,
    pub op: RoleOp,
    pub roles: Vec<RoleKey>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResetPassword {
    pub id: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemoveUser {
    pub id: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemoveUsers {
    pub users: Option<EntityFilter>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum UserRequest {
    Search(SearchUsers),
    Get(GetUser),
    GetByName(GetUserByName),
    Create(CreateUser),
    SetRoles(SetUserRoles),
    ResetPassword(ResetPassword),
    Remove(RemoveUser),
    RemoveBulk(RemoveUsers),
}

impl UserRequest {
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::Search(_) => Endpoint::SearchUsers,
            Self::Get(_) => Endpoint::GetUser,
            Self::GetByName(_) => Endpoint::GetUserByName,
            Self::Create(_) => Endpoint::CreateUser,
            Self::SetRoles(_) => Endpoint::SetUserRoles,
            Self::ResetPassword(_) => Endpoint::ResetPassword,
            Self::Remove(_) => Endpoint::RemoveUser,
            Self::RemoveBulk(_) => Endpoint::RemoveUsers,
        }
    }
}

const USERS: &str = "users";
const PROFILES: &str = "profiles";
const ROLES: &str = "roles";
const ITEMS: &str = "items";
const USER_KEY: &str = "user";
const PROFILE_KEY: &str = "profile";
const USERNAME: &str = "username";
const EMAIL: &str = "email";
const PASSWORD: &str = "password";
const NAME: &str = "name";
const OP: &str = "op";

const PASSWORD_LEN: std::ops::RangeInclusive<usize> = 6..=30;

fn email(map: &Map<String, Value>) -> Result<String, ValidationError> {
    let value = non_empty_string(map, EMAIL)?;
    match value.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(value)
        }
        _ => Err(ValidationError::TypeMismatch {
            field: EMAIL.to_owned(),
            expected: "email address",
        }),
    }
}

/// 6 to 30 characters with at least one letter and one digit.
fn password(map: &Map<String, Value>) -> Result<String, ValidationError> {
    let value = non_empty_string(map, PASSWORD)?;
    let len = value.chars().count();
    let letter = value.chars().any(char::is_alphabetic);
    let digit = value.chars().any(|c| c.is_ascii_digit());
    if PASSWORD_LEN.contains(&len) && letter && digit {
        Ok(value)
    } else {
        Err(ValidationError::TypeMismatch {
            field: PASSWORD.to_owned(),
            expected: "6 to 30 characters with letters and digits",
        })
    }
}

fn new_user(raw: Option<&Value>) -> Result<NewUser, ValidationError> {
    let Some(raw) = raw else {
        return Err(ValidationError::RequiredValue {
            field: USER_KEY.to_owned(),
        });
    };
    let map = body(Endpoint::CreateUser, raw, &[USERNAME, EMAIL, PASSWORD])?;
    Ok(NewUser {
        username: non_empty_string(map, USERNAME)?,
        email: email(map)?,
        password: password(map)?,
    })
}

fn new_profile(raw: Option<&Value>) -> Result<Option<NewProfile>, ValidationError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let map = body(Endpoint::CreateUser, raw, &[NAME])?;
    let name = match map.get(NAME) {
        None | Some(Value::Null) => None,
        Some(_) => Some(non_empty_string(map, NAME)?),
    };
    Ok(Some(NewProfile { name }))
}

/// `{"id": 1}` or `{"name": "admin"}`.
fn role_key(raw: &Value) -> Result<RoleKey, ValidationError> {
    let shape = || ValidationError::InvalidShape {
        target: "role key".to_owned(),
        expected: "object with exactly one of id or name",
    };
    let Value::Object(map) = raw else {
        return Err(shape());
    };
    if map.len() != 1 {
        return Err(shape());
    }
    if map.contains_key(keys::ID) {
        return id(map, keys::ID).map(RoleKey::Id);
    }
    if map.contains_key(NAME) {
        let name = non_empty_string(map, NAME)?;
        return name
            .parse::<RoleName>()
            .map(RoleKey::Name)
            .map_err(|_| ValidationError::TypeMismatch {
                field: NAME.to_owned(),
                expected: "role name",
            });
    }
    Err(shape())
}

/// A role list. Required lists must not be empty.
fn role_keys(raw: Option<&Value>, required: bool) -> Result<Vec<RoleKey>, ValidationError> {
    let items = match raw {
        None | Some(Value::Null) if !required => return Ok(Vec::new()),
        None | Some(Value::Null) => {
            return Err(ValidationError::RequiredValue {
                field: ROLES.to_owned(),
            });
        }
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(ValidationError::InvalidShape {
                target: ROLES.to_owned(),
                expected: "list of role keys",
            });
        }
    };
    if required && items.is_empty() {
        return Err(ValidationError::InvalidShape {
            target: ROLES.to_owned(),
            expected: "non-empty list of role keys",
        });
    }
    items.iter().map(role_key).collect()
}

fn role_op(raw: Option<&Value>) -> Result<RoleOp, ValidationError> {
    match raw {
        None | Some(Value::Null) => Ok(RoleOp::default()),
        Some(Value::String(s)) if s == "set" => Ok(RoleOp::Set),
        Some(Value::String(s)) if s == "add" => Ok(RoleOp::Add),
        Some(Value::String(s)) if s == "remove" => Ok(RoleOp::Remove),
        Some(_) => Err(ValidationError::TypeMismatch {
            field: OP.to_owned(),
            expected: "set, add or remove",
        }),
    }
}

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body.
pub fn parse_search(raw: &Value, limits: &PageLimits) -> Result<UserRequest, ValidationError> {
    let map = body(
        Endpoint::SearchUsers,
        raw,
        &[USERS, PROFILES, ROLES, ITEMS, keys::INCLUDES, keys::PAGE],
    )?;
    Ok(UserRequest::Search(SearchUsers {
        users: own_filter(&USER, map, USERS)?,
        profiles: relation_filter(&PROFILE, map, PROFILES)?,
        roles: relation_filter(&ROLE, map, ROLES)?,
        items: relation_filter(&ITEM, map, ITEMS)?,
        includes: includes(&USER, map)?,
        listing: listing(&USER, map, limits)?,
    }))
}

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body.
pub fn parse_get(raw: &Value) -> Result<UserRequest, ValidationError> {
    let map = body(Endpoint::GetUser, raw, &[keys::ID, keys::INCLUDES])?;
    Ok(UserRequest::Get(GetUser {
        id: id(map, keys::ID)?,
        includes: includes(&USER, map)?,
    }))
}

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body.
pub fn parse_get_by_name(raw: &Value) -> Result<UserRequest, ValidationError> {
    let map = body(Endpoint::GetUserByName, raw, &[USERNAME, keys::INCLUDES])?;
    Ok(UserRequest::GetByName(GetUserByName {
        username: non_empty_string(map, USERNAME)?,
        includes: includes(&USER, map)?,
    }))
}

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body.
pub fn parse_create(raw: &Value) -> Result<UserRequest, ValidationError> {
    let map = body(
        Endpoint::CreateUser,
        raw,
        &[USER_KEY, PROFILE_KEY, ROLES, keys::INCLUDES],
    )?;
    Ok(UserRequest::Create(CreateUser {
        user: new_user(map.get(USER_KEY))?,
        profile: new_profile(map.get(PROFILE_KEY))?,
        roles: role_keys(map.get(ROLES), false)?,
        includes: includes(&USER, map)?,
    }))
}

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body.
pub fn parse_set_roles(raw: &Value) -> Result<UserRequest, ValidationError> {
    let map = body(Endpoint::SetUserRoles, raw, &[keys::ID, ROLES, OP])?;
    Ok(UserRequest::SetRoles(SetUserRoles {
        id: id(map, keys::ID)?,
        op: role_op(map.get(OP))?,
        roles: role_keys(map.get(ROLES), true)?,
    }))
}

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body.
pub fn parse_reset_password(raw: &Value) -> Result<UserRequest, ValidationError> {
    let map = body(Endpoint::ResetPassword, raw, &[keys::ID])?;
    Ok(UserRequest::ResetPassword(ResetPassword {
        id: id(map, keys::ID)?,
    }))
}

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body.
pub fn parse_remove(raw: &Value) -> Result<UserRequest, ValidationError> {
    let map = body(Endpoint::RemoveUser, raw, &[keys::ID])?;
    Ok(UserRequest::Remove(RemoveUser {
        id: id(map, keys::ID)?,
    }))
}

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body.
pub fn parse_remove_bulk(raw: &Value) -> Result<UserRequest, ValidationError> {
    let map = body(Endpoint::RemoveUsers, raw, &[USERS])?;
    Ok(UserRequest::RemoveBulk(RemoveUsers {
        users: own_filter(&USER, map, USERS)?,
    }))
}
