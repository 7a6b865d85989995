use std::sync::Arc;

use crudkit_query::{IncludeSet, QueryArgs};
use crudkit_security::{Action, SecurityContext, Subject};
use serde::Serialize;

use super::filter_input;
use crate::domain::entities::{self, ROLE};
use crate::domain::error::DomainError;
use crate::domain::models::{RoleList, RoleRes, to_record};
use crate::domain::repo::RolesRepository;
use crate::domain::requests::Listing;
use crate::domain::requests::roles::{GetRole, GetRoleByName, RoleRequest, SearchRoles};

const USERS_RELATION: &str = "users";

/// Result of a role request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RoleResponse {
    Role(RoleRes),
    Roles(RoleList),
}

/// Read-only access to the seeded roles.
pub struct RolesService<R: RolesRepository> {
    repo: Arc<R>,
}

impl<R: RolesRepository> RolesService<R> {
    #[must_use]
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// # Errors
    ///
    /// Returns [`DomainError::Permission`] unless the caller may read roles,
    /// plus whatever the individual operation reports.
    pub async fn handle(
        &self,
        ctx: &SecurityContext,
        request: RoleRequest,
    ) -> Result<RoleResponse, DomainError> {
        tracing::debug!(endpoint = %request.endpoint(), "handling role request");
        match request {
            RoleRequest::Search(req) => self.search(ctx, req).await.map(RoleResponse::Roles),
            RoleRequest::Get(req) => self.get(ctx, req).await.map(RoleResponse::Role),
            RoleRequest::GetByName(req) => self.get_by_name(ctx, req).await.map(RoleResponse::Role),
        }
    }

    /// # Errors
    ///
    /// [`DomainError::Permission`] if the caller may not read roles.
    pub async fn search(
        &self,
        ctx: &SecurityContext,
        req: SearchRoles,
    ) -> Result<RoleList, DomainError> {
        authorize_read(ctx, req.includes.as_ref())?;
        let args = QueryArgs::new(&ROLE)
            .with_filter(filter_input(req.roles))
            .with_relation_filter(USERS_RELATION, req.users)?
            .with_includes(req.includes);
        match req.listing {
            Listing::All => {
                tracing::debug!(query = %args.to_json(), "listing roles");
                Ok(RoleList::All(self.repo.find(&args).await?))
            }
            Listing::Paged(page) => {
                let args = args.with_page(page);
                let roles = self.repo.find(&args).await?;
                let total = self.repo.count(&args).await?;
                Ok(RoleList::Paged(roles, total))
            }
        }
    }

    /// # Errors
    ///
    /// [`DomainError::NotFound`] for an unknown id.
    pub async fn get(&self, ctx: &SecurityContext, req: GetRole) -> Result<RoleRes, DomainError> {
        authorize_read(ctx, req.includes.as_ref())?;
        let found = self
            .repo
            .find_by_id(req.id, req.includes.as_ref())
            .await?
            .ok_or_else(|| DomainError::not_found(entities::names::ROLE))?;
        ctx.authorize(Action::Read, Subject::Role, Some(&to_record(&found.role)))?;
        Ok(found)
    }

    /// # Errors
    ///
    /// [`DomainError::NotFound`] when the role was never seeded.
    pub async fn get_by_name(
        &self,
        ctx: &SecurityContext,
        req: GetRoleByName,
    ) -> Result<RoleRes, DomainError> {
        authorize_read(ctx, req.includes.as_ref())?;
        let found = self
            .repo
            .find_by_name(req.name.as_str(), req.includes.as_ref())
            .await?
            .ok_or_else(|| DomainError::not_found(entities::names::ROLE))?;
        ctx.authorize(Action::Read, Subject::Role, Some(&to_record(&found.role)))?;
        Ok(found)
    }
}

/// Reading roles, and users when they are included.
fn authorize_read(ctx: &SecurityContext, includes: Option<&IncludeSet>) -> Result<(), DomainError> {
    ctx.authorize(Action::Read, Subject::Role, None)?;
    if includes.is_some_and(|i| i.contains(USERS_RELATION)) {
        ctx.authorize(Action::Read, Subject::User, None)?;
    }
    Ok(())
}
