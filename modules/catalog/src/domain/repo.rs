use async_trait::async_trait;
use crudkit_query::{EntityUpdate, IncludeSet, QueryArgs};

use super::error::DomainError;
use super::models::{
    Item, ItemRes, NewItem, NewProfile, NewUser, RoleKey, RoleOp, RoleRes, User, UserRes,
};

/// Persistence port for items.
///
/// `QueryArgs` passed in are always built on the item schema; a `user`
/// relation filter constrains the owning user.
#[async_trait]
pub trait ItemsRepository: Send + Sync {
    async fn find(&self, args: &QueryArgs) -> Result<Vec<ItemRes>, DomainError>;

    /// Number of items matching `args`, ignoring its page.
    async fn count(&self, args: &QueryArgs) -> Result<u64, DomainError>;

    async fn find_by_id(
        &self,
        id: i64,
        include: Option<&IncludeSet>,
    ) -> Result<Option<ItemRes>, DomainError>;

    async fn find_by_name(
        &self,
        username: &str,
        name: &str,
        include: Option<&IncludeSet>,
    ) -> Result<Option<ItemRes>, DomainError>;

    async fn find_user(&self, id: i64) -> Result<Option<User>, DomainError>;

    /// Fails with [`DomainError::Conflict`] if `username` already owns an
    /// item named `item.name`.
    async fn create(&self, username: &str, item: NewItem) -> Result<Item, DomainError>;

    async fn update(&self, id: i64, update: &EntityUpdate) -> Result<Item, DomainError>;

    async fn remove(&self, id: i64) -> Result<(), DomainError>;

    /// Applies `update` to every matching item, all or nothing.
    async fn update_many(&self, args: &QueryArgs, update: &EntityUpdate)
    -> Result<u64, DomainError>;

    async fn remove_many(&self, args: &QueryArgs) -> Result<u64, DomainError>;
}

/// Persistence port for users.
///
/// `QueryArgs` are built on the user schema with `profile`, `roles` and
/// `items` relation filters.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn find(&self, args: &QueryArgs) -> Result<Vec<UserRes>, DomainError>;

    async fn count(&self, args: &QueryArgs) -> Result<u64, DomainError>;

    async fn find_by_id(
        &self,
        id: i64,
        include: Option<&IncludeSet>,
    ) -> Result<Option<UserRes>, DomainError>;

    async fn find_by_name(
        &self,
        username: &str,
        include: Option<&IncludeSet>,
    ) -> Result<Option<UserRes>, DomainError>;

    /// Creates the user, its profile when given and its role links in one
    /// transaction.
    ///
    /// Fails with [`DomainError::Conflict`] for a taken username and
    /// [`DomainError::NotFound`] for an unknown role.
    async fn create(
        &self,
        user: NewUser,
        profile: Option<NewProfile>,
        roles: &[RoleKey],
    ) -> Result<User, DomainError>;

    async fn set_roles(&self, id: i64, op: RoleOp, roles: &[RoleKey]) -> Result<(), DomainError>;

    /// Replace the password with the configured default.
    async fn reset_password(&self, id: i64) -> Result<(), DomainError>;

    /// Removes the user with its profile, items and role links.
    async fn remove(&self, id: i64) -> Result<(), DomainError>;

    async fn remove_many(&self, args: &QueryArgs) -> Result<u64, DomainError>;
}

/// Persistence port for roles. Roles are seeded, never written by callers.
#[async_trait]
pub trait RolesRepository: Send + Sync {
    async fn find(&self, args: &QueryArgs) -> Result<Vec<RoleRes>, DomainError>;

    async fn count(&self, args: &QueryArgs) -> Result<u64, DomainError>;

    async fn find_by_id(
        &self,
        id: i64,
        include: Option<&IncludeSet>,
    ) -> Result<Option<RoleRes>, DomainError>;

    async fn find_by_name(
        &self,
        name: &str,
        include: Option<&IncludeSet>,
    ) -> Result<Option<RoleRes>, DomainError>;
}
