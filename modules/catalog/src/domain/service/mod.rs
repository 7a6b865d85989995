//! Catalog use cases. Every call is checked against the caller's ability
//! before it reaches a repository.

use std::sync::Arc;

use crudkit_query::{EntityFilter, FilterInput, PageLimits};
use crudkit_security::{Attributes, PermissionError, SecurityContext};
use serde::Serialize;
use serde_json::Value;

use super::error::DomainError;
use super::registry::ValidatorRegistry;
use super::repo::{ItemsRepository, RolesRepository, UsersRepository};
use super::requests::{Endpoint, Request};

mod items;
mod roles;
mod users;

pub use items::{ItemResponse, ItemsService, bulk_args};
pub use roles::{RoleResponse, RolesService};
pub use users::{UserResponse, UsersService};

fn filter_input(filter: Option<EntityFilter>) -> FilterInput {
    filter.map_or(FilterInput::Absent, FilterInput::Filter)
}

fn caller(ctx: &SecurityContext) -> Result<&str, PermissionError> {
    ctx.ability()?;
    ctx.username().ok_or(PermissionError::NoAbilityComputed)
}

/// Ownership attributes `{username: <username>}`.
fn owned_by(username: &str) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert("username".to_owned(), Value::from(username));
    attrs
}

/// Result of any catalog request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Items(ItemResponse),
    Users(UserResponse),
    Roles(RoleResponse),
}

/// All catalog services over one repository, with the validators that feed
/// them.
pub struct Catalog<R>
where
    R: ItemsRepository + UsersRepository + RolesRepository,
{
    items: ItemsService<R>,
    users: UsersService<R>,
    roles: RolesService<R>,
    registry: ValidatorRegistry,
}

impl<R> Catalog<R>
where
    R: ItemsRepository + UsersRepository + RolesRepository,
{
    #[must_use]
    pub fn new(repo: &Arc<R>, limits: PageLimits) -> Self {
        Self {
            items: ItemsService::new(Arc::clone(repo)),
            users: UsersService::new(Arc::clone(repo)),
            roles: RolesService::new(Arc::clone(repo)),
            registry: ValidatorRegistry::catalog(limits),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ValidatorRegistry {
        &self.registry
    }

    #[must_use]
    pub fn items(&self) -> &ItemsService<R> {
        &self.items
    }

    #[must_use]
    pub fn users(&self) -> &UsersService<R> {
        &self.users
    }

    #[must_use]
    pub fn roles(&self) -> &RolesService<R> {
        &self.roles
    }

    /// Run a validated request on the service that owns it.
    ///
    /// # Errors
    ///
    /// Whatever the service reports.
    pub async fn handle(
        &self,
        ctx: &SecurityContext,
        request: Request,
    ) -> Result<Response, DomainError> {
        match request {
            Request::Items(req) => self.items.handle(ctx, req).await.map(Response::Items),
            Request::Users(req) => self.users.handle(ctx, req).await.map(Response::Users),
            Request::Roles(req) => self.roles.handle(ctx, req).await.map(Response::Roles),
        }
    }

    /// Validate `raw` for `endpoint`, then run it.
    ///
    /// # Errors
    ///
    /// [`DomainError::Validation`] before anything else is checked, then
    /// whatever [`Catalog::handle`] reports.
    pub async fn dispatch(
        &self,
        ctx: &SecurityContext,
        endpoint: Endpoint,
        raw: &Value,
    ) -> Result<Response, DomainError> {
        let request = self.registry.validate(endpoint, raw)?;
        self.handle(ctx, request).await
    }
}
