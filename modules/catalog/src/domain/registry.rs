use std::collections::HashMap;

use crudkit_query::{PageLimits, ValidationError};
use serde_json::Value;

use super::requests::{Endpoint, Request, items, roles, users};

pub type Validator = fn(&Value, &PageLimits) -> Result<Request, ValidationError>;

/// Request validators keyed by endpoint, built once at startup.
#[derive(Clone, Debug)]
pub struct ValidatorRegistry {
    limits: PageLimits,
    validators: HashMap<Endpoint, Validator>,
}

impl ValidatorRegistry {
    #[must_use]
    pub fn new(limits: PageLimits) -> Self {
        Self {
            limits,
            validators: HashMap::new(),
        }
    }

    /// Registry with a validator for every item endpoint.
    #[must_use]
    pub fn items(limits: PageLimits) -> Self {
        Self::new(limits)
            .register(Endpoint::SearchItems, |raw, l| {
                items::parse_search(raw, l).map(Request::Items)
            })
            .register(Endpoint::GetItem, |raw, _| {
                items::parse_get(raw).map(Request::Items)
            })
            .register(Endpoint::GetItemByName, |raw, _| {
                items::parse_get_by_name(raw).map(Request::Items)
            })
            .register(Endpoint::ItemsByUser, |raw, l| {
                items::parse_by_user(raw, l).map(Request::Items)
            })
            .register(Endpoint::CreateItem, |raw, _| {
                items::parse_create(raw).map(Request::Items)
            })
            .register(Endpoint::UpdateItem, |raw, _| {
                items::parse_update(raw).map(Request::Items)
            })
            .register(Endpoint::RemoveItem, |raw, _| {
                items::parse_remove(raw).map(Request::Items)
            })
            .register(Endpoint::UpdateItems, |raw, _| {
                items::parse_update_bulk(raw).map(Request::Items)
            })
            .register(Endpoint::RemoveItems, |raw, _| {
                items::parse_remove_bulk(raw).map(Request::Items)
            })
    }

    /// Registry with a validator for every catalog endpoint.
    #[must_use]
    pub fn catalog(limits: PageLimits) -> Self {
        Self::items(limits)
            .register(Endpoint::SearchUsers, |raw, l| {
                users::parse_search(raw, l).map(Request::Users)
            })
            .register(Endpoint::GetUser, |raw, _| {
                users::parse_get(raw).map(Request::Users)
            })
            .register(Endpoint::GetUserByName, |raw, _| {
                users::parse_get_by_name(raw).map(Request::Users)
            })
            .register(Endpoint::CreateUser, |raw, _| {
                users::parse_create(raw).map(Request::Users)
            })
            .register(Endpoint::SetUserRoles, |raw, _| {
                users::parse_set_roles(raw).map(Request::Users)
            })
            .register(Endpoint::ResetPassword, |raw, _| {
                users::parse_reset_password(raw).map(Request::Users)
            })
            .register(Endpoint::RemoveUser, |raw, _| {
                users::parse_remove(raw).map(Request::Users)
            })
            .register(Endpoint::RemoveUsers, |raw, _| {
                users::parse_remove_bulk(raw).map(Request::Users)
            })
            .register(Endpoint::SearchRoles, |raw, l| {
                roles::parse_search(raw, l).map(Request::Roles)
            })
            .register(Endpoint::GetRole, |raw, _| {
                roles::parse_get(raw).map(Request::Roles)
            })
            .register(Endpoint::GetRoleByName, |raw, _| {
                roles::parse_get_by_name(raw).map(Request::Roles)
            })
    }

    #[must_use]
    pub fn register(mut self, endpoint: Endpoint, validator: Validator) -> Self {
        self.validators.insert(endpoint, validator);
        self
    }

    #[must_use]
    pub fn limits(&self) -> &PageLimits {
        &self.limits
    }

    #[must_use]
    pub fn contains(&self, endpoint: Endpoint) -> bool {
        self.validators.contains_key(&endpoint)
    }

    /// Parse `raw` into the request shape of `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidShape`] for an endpoint without a
    /// registered validator, otherwise whatever the validator reports.
    pub fn validate(&self, endpoint: Endpoint, raw: &Value) -> Result<Request, ValidationError> {
        let validator = self
            .validators
            .get(&endpoint)
            .ok_or_else(|| ValidationError::InvalidShape {
                target: endpoint.to_string(),
                expected: "registered endpoint",
            })?;
        validator(raw, &self.limits)
    }
}
