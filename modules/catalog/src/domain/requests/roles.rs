use crudkit_query::{EntityFilter, FilterInput, IncludeSet, PageLimits, ValidationError};
use crudkit_security::RoleName;
use serde_json::Value;

use super::{
    Endpoint, Listing, body, id, includes, keys, listing, non_empty_string, own_filter,
    relation_filter,
};
use crate::domain::entities::{ROLE, USER};

#[derive(Clone, Debug, PartialEq)]
pub struct SearchRoles {
    pub roles: Option<EntityFilter>,
    pub users: FilterInput,
    pub includes: Option<IncludeSet>,
    pub listing: Listing,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GetRole {
    pub id: i64,
    pub includes: Option<IncludeSet>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GetRoleByName {
    pub name: RoleName,
    pub includes: Option<IncludeSet>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum RoleRequest {
    Search(SearchRoles),
    Get(GetRole),
    GetByName(GetRoleByName),
}

impl RoleRequest {
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::Search(_) => Endpoint::SearchRoles,
            Self::Get(_) => Endpoint::GetRole,
            Self::GetByName(_) => Endpoint::GetRoleByName,
        }
    }
}

const ROLES: &str = "roles";
const USERS: &str = "users";
const NAME: &str = "name";

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body.
pub fn parse_search(raw: &Value, limits: &PageLimits) -> Result<RoleRequest, ValidationError> {
    let map = body(
        Endpoint::SearchRoles,
        raw,
        &[ROLES, USERS, keys::INCLUDES, keys::PAGE],
    )?;
    Ok(RoleRequest::Search(SearchRoles {
        roles: own_filter(&ROLE, map, ROLES)?,
        users: relation_filter(&USER, map, USERS)?,
        includes: includes(&ROLE, map)?,
        listing: listing(&ROLE, map, limits)?,
    }))
}

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body.
pub fn parse_get(raw: &Value) -> Result<RoleRequest, ValidationError> {
    let map = body(Endpoint::GetRole, raw, &[keys::ID, keys::INCLUDES])?;
    Ok(RoleRequest::Get(GetRole {
        id: id(map, keys::ID)?,
        includes: includes(&ROLE, map)?,
    }))
}

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body; unknown role
/// names are a type mismatch.
pub fn parse_get_by_name(raw: &Value) -> Result<RoleRequest, ValidationError> {
    let map = body(Endpoint::GetRoleByName, raw, &[NAME, keys::INCLUDES])?;
    let name = non_empty_string(map, NAME)?
        .parse::<RoleName>()
        .map_err(|_| ValidationError::TypeMismatch {
            field: NAME.to_owned(),
            expected: "role name",
        })?;
    Ok(RoleRequest::GetByName(GetRoleByName {
        name,
        includes: includes(&ROLE, map)?,
    }))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_filters_by_members() {
        let req = parse_search(
            &json!({"users": {"username": "ann"}, "includes": "users", "page": {}}),
            &PageLimits::default(),
        )
        .unwrap();
        let RoleRequest::Search(search) = req else {
            panic!("expected a search");
        };
        assert!(search.roles.is_none());
        assert!(matches!(search.users, FilterInput::Filter(_)));
        assert!(search.includes.is_some_and(|i| i.contains("users")));
        assert!(matches!(search.listing, Listing::Paged(_)));
    }

    #[test]
    fn get_by_name_parses_role_names() {
        assert_eq!(
            parse_get_by_name(&json!({"name": "guest"})),
            Ok(RoleRequest::GetByName(GetRoleByName {
                name: RoleName::Guest,
                includes: None,
            }))
        );
        assert!(matches!(
            parse_get_by_name(&json!({"name": "owner"})),
            Err(ValidationError::TypeMismatch { .. })
        ));
        assert!(matches!(
            parse_get(&json!({"id": 1, "includes": "items"})),
            Err(ValidationError::InvalidInclude { .. })
        ));
    }
}
