use std::sync::Arc;

use crudkit_query::{IncludeSet, QueryArgs};
use crudkit_security::{Action, SecurityContext, Subject};
use serde::Serialize;
use serde_json::Value;

use super::filter_input;
use crate::domain::entities::{self, USER};
use crate::domain::error::DomainError;
use crate::domain::models::{BatchPayload, User, UserList, UserRes, to_record};
use crate::domain::repo::UsersRepository;
use crate::domain::requests::Listing;
use crate::domain::requests::users::{
    CreateUser, GetUser, GetUserByName, RemoveUser, RemoveUsers, ResetPassword, SearchUsers,
    SetUserRoles, UserRequest,
};

mod relations {
    pub const PROFILE: &str = "profile";
    pub const ROLES: &str = "roles";
    pub const ITEMS: &str = "items";
}

/// Result of a user request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UserResponse {
    User(UserRes),
    Users(UserList),
    Batch(BatchPayload),
    Empty,
}

/// Users use case, including the administrative operations.
pub struct UsersService<R: UsersRepository> {
    repo: Arc<R>,
}

impl<R: UsersRepository> UsersService<R> {
    #[must_use]
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Run a validated request.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Permission`] when the caller is anonymous or not
    /// allowed, plus whatever the individual operation reports.
    pub async fn handle(
        &self,
        ctx: &SecurityContext,
        request: UserRequest,
    ) -> Result<UserResponse, DomainError> {
        tracing::debug!(endpoint = %request.endpoint(), "handling user request");
        match request {
            UserRequest::Search(req) => self.search(ctx, req).await.map(UserResponse::Users),
            UserRequest::Get(req) => self.get(ctx, req).await.map(UserResponse::User),
            UserRequest::GetByName(req) => self.get_by_name(ctx, req).await.map(UserResponse::User),
            UserRequest::Create(req) => self.create(ctx, req).await.map(UserResponse::User),
            UserRequest::SetRoles(req) => {
                self.set_roles(ctx, req).await.map(|()| UserResponse::Empty)
            }
            UserRequest::ResetPassword(req) => {
                self.reset_password(ctx, req).await.map(|()| UserResponse::Empty)
            }
            UserRequest::Remove(req) => self.remove(ctx, req).await.map(|()| UserResponse::Empty),
            UserRequest::RemoveBulk(req) => {
                self.remove_bulk(ctx, req).await.map(UserResponse::Batch)
            }
        }
    }

    /// # Errors
    ///
    /// [`DomainError::Permission`] if the caller may not read users.
    pub async fn search(
        &self,
        ctx: &SecurityContext,
        req: SearchUsers,
    ) -> Result<UserList, DomainError> {
        authorize_read(ctx, req.includes.as_ref())?;
        let args = QueryArgs::new(&USER)
            .with_filter(filter_input(req.users))
            .with_relation_filter(relations::PROFILE, req.profiles)?
            .with_relation_filter(relations::ROLES, req.roles)?
            .with_relation_filter(relations::ITEMS, req.items)?
            .with_includes(req.includes);
        match req.listing {
            Listing::All => {
                tracing::debug!(query = %args.to_json(), "listing users");
                Ok(UserList::All(self.repo.find(&args).await?))
            }
            Listing::Paged(page) => {
                let args = args.with_page(page);
                tracing::debug!(query = %args.to_json(), "listing user page");
                let users = self.repo.find(&args).await?;
                let total = self.repo.count(&args).await?;
                Ok(UserList::Paged(users, total))
            }
        }
    }

    /// # Errors
    ///
    /// [`DomainError::NotFound`] for an unknown id, [`DomainError::Permission`]
    /// if the caller may not read it.
    pub async fn get(&self, ctx: &SecurityContext, req: GetUser) -> Result<UserRes, DomainError> {
        authorize_read(ctx, req.includes.as_ref())?;
        let found = self
            .repo
            .find_by_id(req.id, req.includes.as_ref())
            .await?
            .ok_or_else(|| DomainError::not_found(entities::names::USER))?;
        ctx.authorize(Action::Read, Subject::User, Some(&to_record(&found.user)))?;
        Ok(found)
    }

    /// # Errors
    ///
    /// [`DomainError::NotFound`] for an unknown username,
    /// [`DomainError::Permission`] if the caller may not read it.
    pub async fn get_by_name(
        &self,
        ctx: &SecurityContext,
        req: GetUserByName,
    ) -> Result<UserRes, DomainError> {
        authorize_read(ctx, req.includes.as_ref())?;
        let found = self
            .repo
            .find_by_name(&req.username, req.includes.as_ref())
            .await?
            .ok_or_else(|| DomainError::not_found(entities::names::USER))?;
        ctx.authorize(Action::Read, Subject::User, Some(&to_record(&found.user)))?;
        Ok(found)
    }

    /// Create a user with an optional profile and roles.
    ///
    /// # Errors
    ///
    /// [`DomainError::Permission`] unless the caller may create users, and
    /// set roles when any are given; [`DomainError::Conflict`] for a taken
    /// username; [`DomainError::NotFound`] for an unknown role.
    pub async fn create(
        &self,
        ctx: &SecurityContext,
        req: CreateUser,
    ) -> Result<UserRes, DomainError> {
        let mut instance = crudkit_security::Attributes::new();
        instance.insert("username".to_owned(), Value::from(req.user.username.as_str()));
        instance.insert("email".to_owned(), Value::from(req.user.email.as_str()));
        ctx.authorize(Action::Create, Subject::User, Some(&instance))?;
        if !req.roles.is_empty() {
            ctx.authorize(Action::SetRole, Subject::User, Some(&instance))?;
        }
        if req.includes.is_some() {
            authorize_read(ctx, req.includes.as_ref())?;
        }

        let created = self.repo.create(req.user, req.profile, &req.roles).await?;
        tracing::info!(id = created.id, username = %created.username, "user created");
        if req.includes.is_none() {
            return Ok(UserRes::bare(created));
        }
        self.repo
            .find_by_id(created.id, req.includes.as_ref())
            .await?
            .ok_or_else(|| DomainError::not_found(entities::names::USER))
    }

    /// Replace, extend or shrink a user's roles.
    ///
    /// # Errors
    ///
    /// [`DomainError::NotFound`] for an unknown user or role,
    /// [`DomainError::Permission`] unless the caller may set roles.
    pub async fn set_roles(
        &self,
        ctx: &SecurityContext,
        req: SetUserRoles,
    ) -> Result<(), DomainError> {
        let current = self.existing(ctx, req.id).await?;
        ctx.authorize(Action::SetRole, Subject::User, Some(&to_record(&current)))?;
        self.repo.set_roles(req.id, req.op, &req.roles).await?;
        tracing::info!(id = req.id, op = ?req.op, "user roles changed");
        Ok(())
    }

    /// Put the configured default password back on a user.
    ///
    /// # Errors
    ///
    /// [`DomainError::NotFound`] for an unknown user,
    /// [`DomainError::Permission`] unless the caller may reset passwords.
    pub async fn reset_password(
        &self,
        ctx: &SecurityContext,
        req: ResetPassword,
    ) -> Result<(), DomainError> {
        let current = self.existing(ctx, req.id).await?;
        ctx.authorize(
            Action::ResetPassword,
            Subject::User,
            Some(&to_record(&current)),
        )?;
        self.repo.reset_password(req.id).await?;
        tracing::info!(id = req.id, "password reset");
        Ok(())
    }

    /// # Errors
    ///
    /// [`DomainError::NotFound`] for an unknown id, [`DomainError::Permission`]
    /// unless the caller may delete this user.
    pub async fn remove(&self, ctx: &SecurityContext, req: RemoveUser) -> Result<(), DomainError> {
        let current = self.existing(ctx, req.id).await?;
        ctx.authorize(Action::Delete, Subject::User, Some(&to_record(&current)))?;
        self.repo.remove(req.id).await?;
        tracing::info!(id = req.id, "user removed");
        Ok(())
    }

    /// # Errors
    ///
    /// [`DomainError::Permission`] without an unconditional grant to delete
    /// users.
    pub async fn remove_bulk(
        &self,
        ctx: &SecurityContext,
        req: RemoveUsers,
    ) -> Result<BatchPayload, DomainError> {
        ctx.authorize(Action::Delete, Subject::User, None)?;
        let args = QueryArgs::new(&USER).with_filter(filter_input(req.users));
        tracing::debug!(query = %args.to_json(), "bulk user removal");
        let count = self.repo.remove_many(&args).await?;
        Ok(BatchPayload { count })
    }

    async fn existing(&self, ctx: &SecurityContext, id: i64) -> Result<User, DomainError> {
        ctx.ability()?;
        self.repo
            .find_by_id(id, None)
            .await?
            .map(|found| found.user)
            .ok_or_else(|| DomainError::not_found(entities::names::USER))
    }
}

/// Reading users, and items when they are included.
fn authorize_read(ctx: &SecurityContext, includes: Option<&IncludeSet>) -> Result<(), DomainError> {
    ctx.authorize(Action::Read, Subject::User, None)?;
    if includes.is_some_and(|i| i.contains(relations::ITEMS)) {
        ctx.authorize(Action::Read, Subject::Item, None)?;
    }
    Ok(())
}
