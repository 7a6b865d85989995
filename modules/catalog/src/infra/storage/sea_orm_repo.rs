use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use crudkit_query::sea::{
    FilterableEntity, apply_page, build_filter_condition, deny_all, linked_condition,
    linked_through,
};
use crudkit_query::{EntityUpdate, IncludeSet, QueryArgs};
use crudkit_security::RoleName;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};
use serde_json::Value;

use crate::config::{CatalogConfig, PasswordConfig, SeedConfig};
use crate::domain::entities::names;
use crate::domain::error::DomainError;
use crate::domain::models::{
    Item, ItemRes, NewItem, NewProfile, NewUser, Profile, Role, RoleKey, RoleOp, RoleRes, User,
    UserRes, to_record,
};
use crate::domain::repo::{ItemsRepository, RolesRepository, UsersRepository};
use crate::infra::password::PasswordHasher;

use super::db::{Db, db_err, write_err};
use super::entity::{item, profile, role, user, user_role};

impl From<user::Model> for User {
    fn from(m: user::Model) -> Self {
        Self {
            id: m.id,
            username: m.username,
            email: m.email,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<profile::Model> for Profile {
    fn from(m: profile::Model) -> Self {
        Self {
            id: m.id,
            username: m.username,
            name: m.name,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl From<item::Model> for Item {
    fn from(m: item::Model) -> Self {
        Self {
            id: m.id,
            username: m.username,
            name: m.name,
            price: m.price,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}

impl TryFrom<role::Model> for Role {
    type Error = DomainError;

    fn try_from(m: role::Model) -> Result<Self, DomainError> {
        let name = m
            .name
            .parse::<RoleName>()
            .map_err(|e| DomainError::internal(format!("stored role: {e}")))?;
        Ok(Self {
            id: m.id,
            name,
            created_at: m.created_at,
            updated_at: m.updated_at,
        })
    }
}

fn unmapped(relation: &str) -> Condition {
    tracing::warn!(relation, "relation has no storage mapping; query denied");
    deny_all()
}

fn item_condition(args: &QueryArgs) -> Condition {
    let own = build_filter_condition::<item::Entity>(args.filter());
    args.relations()
        .iter()
        .fold(Condition::all().add(own), |cond, (relation, filter)| {
            cond.add(match relation.name {
                "user" => linked_condition::<user::Entity, _>(
                    item::Column::Username,
                    user::Column::Username,
                    filter,
                ),
                other => unmapped(other),
            })
        })
}

fn user_condition(args: &QueryArgs) -> Condition {
    let own = build_filter_condition::<user::Entity>(args.filter());
    args.relations()
        .iter()
        .fold(Condition::all().add(own), |cond, (relation, filter)| {
            cond.add(match relation.name {
                "profile" => linked_condition::<profile::Entity, _>(
                    user::Column::Username,
                    profile::Column::Username,
                    filter,
                ),
                "items" => linked_condition::<item::Entity, _>(
                    user::Column::Username,
                    item::Column::Username,
                    filter,
                ),
                "roles" => linked_through::<user_role::Entity, role::Entity, _>(
                    user::Column::Id,
                    user_role::Column::UserId,
                    user_role::Column::RoleId,
                    role::Column::Id,
                    filter,
                ),
                other => unmapped(other),
            })
        })
}

fn role_condition(args: &QueryArgs) -> Condition {
    let own = build_filter_condition::<role::Entity>(args.filter());
    args.relations()
        .iter()
        .fold(Condition::all().add(own), |cond, (relation, filter)| {
            cond.add(match relation.name {
                "users" => linked_through::<user_role::Entity, user::Entity, _>(
                    role::Column::Id,
                    user_role::Column::RoleId,
                    user_role::Column::UserId,
                    user::Column::Id,
                    filter,
                ),
                other => unmapped(other),
            })
        })
}

/// Page `select` when `args` has a page, otherwise order it by id.
fn ordered<E>(select: Select<E>, args: &QueryArgs) -> Select<E>
where
    E: FilterableEntity,
    E::Column: ColumnTrait + Copy,
{
    match (args.page(), E::resolve_field("id")) {
        (Some(page), _) => apply_page(select, page),
        (None, Some(id)) => select.order_by_asc(id),
        (None, None) => select,
    }
}

fn wants(include: Option<&IncludeSet>, relation: &str) -> bool {
    include.is_some_and(|i| i.contains(relation))
}

async fn item_results<C: ConnectionTrait>(
    conn: &C,
    models: Vec<item::Model>,
    include: Option<&IncludeSet>,
) -> Result<Vec<ItemRes>, DomainError> {
    let owners: Option<HashMap<String, User>> = if wants(include, "user") {
        let usernames: Vec<String> = models.iter().map(|m| m.username.clone()).collect();
        let users = user::Entity::find()
            .filter(user::Column::Username.is_in(usernames))
            .all(conn)
            .await
            .map_err(db_err)?;
        Some(
            users
                .into_iter()
                .map(|u| (u.username.clone(), User::from(u)))
                .collect(),
        )
    } else {
        None
    };
    Ok(models
        .into_iter()
        .map(|m| {
            let user = owners.as_ref().and_then(|o| o.get(&m.username).cloned());
            ItemRes {
                item: m.into(),
                user,
            }
        })
        .collect())
}

/// Roles of each user id, ordered by role id.
async fn roles_by_user<C: ConnectionTrait>(
    conn: &C,
    user_ids: &[i64],
) -> Result<HashMap<i64, Vec<Role>>, DomainError> {
    let links = user_role::Entity::find()
        .filter(user_role::Column::UserId.is_in(user_ids.iter().copied()))
        .order_by_asc(user_role::Column::RoleId)
        .find_also_related(role::Entity)
        .all(conn)
        .await
        .map_err(db_err)?;
    let mut out: HashMap<i64, Vec<Role>> = HashMap::new();
    for (link, found) in links {
        if let Some(found) = found {
            out.entry(link.user_id)
                .or_default()
                .push(Role::try_from(found)?);
        }
    }
    Ok(out)
}

/// Users of each role id, ordered by user id.
async fn users_by_role<C: ConnectionTrait>(
    conn: &C,
    role_ids: &[i64],
) -> Result<HashMap<i64, Vec<User>>, DomainError> {
    let links = user_role::Entity::find()
        .filter(user_role::Column::RoleId.is_in(role_ids.iter().copied()))
        .order_by_asc(user_role::Column::UserId)
        .find_also_related(user::Entity)
        .all(conn)
        .await
        .map_err(db_err)?;
    let mut out: HashMap<i64, Vec<User>> = HashMap::new();
    for (link, found) in links {
        if let Some(found) = found {
            out.entry(link.role_id).or_default().push(found.into());
        }
    }
    Ok(out)
}

async fn user_results<C: ConnectionTrait>(
    conn: &C,
    models: Vec<user::Model>,
    include: Option<&IncludeSet>,
) -> Result<Vec<UserRes>, DomainError> {
    let usernames: Vec<String> = models.iter().map(|m| m.username.clone()).collect();

    let mut profiles: Option<HashMap<String, Profile>> = if wants(include, "profile") {
        let found = profile::Entity::find()
            .filter(profile::Column::Username.is_in(usernames.clone()))
            .all(conn)
            .await
            .map_err(db_err)?;
        Some(
            found
                .into_iter()
                .map(|p| (p.username.clone(), Profile::from(p)))
                .collect(),
        )
    } else {
        None
    };

    let mut roles = if wants(include, "roles") {
        let ids: Vec<i64> = models.iter().map(|m| m.id).collect();
        Some(roles_by_user(conn, &ids).await?)
    } else {
        None
    };

    let mut items: Option<HashMap<String, Vec<Item>>> = if wants(include, "items") {
        let found = item::Entity::find()
            .filter(item::Column::Username.is_in(usernames))
            .order_by_asc(item::Column::Id)
            .all(conn)
            .await
            .map_err(db_err)?;
        let mut grouped: HashMap<String, Vec<Item>> = HashMap::new();
        for m in found {
            grouped.entry(m.username.clone()).or_default().push(m.into());
        }
        Some(grouped)
    } else {
        None
    };

    Ok(models
        .into_iter()
        .map(|m| UserRes {
            profile: profiles.as_mut().map(|p| p.remove(&m.username)),
            roles: roles
                .as_mut()
                .map(|r| r.remove(&m.id).unwrap_or_default()),
            items: items
                .as_mut()
                .map(|i| i.remove(&m.username).unwrap_or_default()),
            user: m.into(),
        })
        .collect())
}

async fn role_results<C: ConnectionTrait>(
    conn: &C,
    models: Vec<role::Model>,
    include: Option<&IncludeSet>,
) -> Result<Vec<RoleRes>, DomainError> {
    let mut users = if wants(include, "users") {
        let ids: Vec<i64> = models.iter().map(|m| m.id).collect();
        Some(users_by_role(conn, &ids).await?)
    } else {
        None
    };
    models
        .into_iter()
        .map(|m| {
            let members = users
                .as_mut()
                .map(|u| u.remove(&m.id).unwrap_or_default());
            Ok(RoleRes {
                role: Role::try_from(m)?,
                users: members,
            })
        })
        .collect()
}

/// Resolve role keys to distinct role ids, in request order.
async fn role_ids<C: ConnectionTrait>(conn: &C, keys: &[RoleKey]) -> Result<Vec<i64>, DomainError> {
    let mut ids = Vec::with_capacity(keys.len());
    for key in keys {
        let found = match key {
            RoleKey::Id(id) => role::Entity::find_by_id(*id).one(conn).await,
            RoleKey::Name(name) => {
                role::Entity::find()
                    .filter(role::Column::Name.eq(name.as_str()))
                    .one(conn)
                    .await
            }
        }
        .map_err(db_err)?
        .ok_or_else(|| DomainError::not_found(names::ROLE))?;
        if !ids.contains(&found.id) {
            ids.push(found.id);
        }
    }
    Ok(ids)
}

async fn link_roles<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    role_ids: impl IntoIterator<Item = i64>,
) -> Result<(), DomainError> {
    let links: Vec<user_role::ActiveModel> = role_ids
        .into_iter()
        .map(|role_id| user_role::ActiveModel {
            user_id: Set(user_id),
            role_id: Set(role_id),
        })
        .collect();
    if links.is_empty() {
        return Ok(());
    }
    user_role::Entity::insert_many(links)
        .exec_without_returning(conn)
        .await
        .map_err(db_err)?;
    Ok(())
}

/// Next state of a stored item under `update`, with a fresh `updated_at`.
fn apply_update(model: &item::Model, update: &EntityUpdate) -> Result<item::ActiveModel, DomainError> {
    let mut record = to_record(&Item::from(model.clone()));
    update.apply_to(&mut record)?;
    let next: Item = serde_json::from_value(Value::Object(record))?;
    let mut active: item::ActiveModel = model.clone().into();
    active.name = Set(next.name);
    active.price = Set(next.price);
    active.updated_at = Set(Utc::now());
    Ok(active)
}

/// `SQLite` implementation of the catalog repositories.
pub struct SeaOrmCatalogRepository {
    db: Arc<Db>,
    hasher: PasswordHasher,
}

impl SeaOrmCatalogRepository {
    /// # Errors
    ///
    /// Returns [`DomainError::Internal`] for unusable password parameters.
    pub fn new(db: Arc<Db>, password: &PasswordConfig) -> Result<Self, DomainError> {
        Ok(Self {
            db,
            hasher: PasswordHasher::new(password)?,
        })
    }

    /// Connect, migrate and seed the database described by `config`.
    ///
    /// # Errors
    ///
    /// Propagates connection, migration and seeding failures.
    pub async fn open(config: &CatalogConfig) -> Result<Self, DomainError> {
        let db = Arc::new(Db::new());
        db.open(&config.database).await?;
        let repo = Self::new(db, &config.password)?;
        repo.seed(&config.seed).await?;
        Ok(repo)
    }

    #[must_use]
    pub fn db(&self) -> &Arc<Db> {
        &self.db
    }

    /// Create the missing roles and the admin user. Existing rows are kept.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Internal`] on database failure.
    pub async fn seed(&self, seed: &SeedConfig) -> Result<(), DomainError> {
        let conn = self.db.conn()?;
        let txn = conn.begin().await.map_err(db_err)?;
        let now = Utc::now();
        for name in RoleName::ALL {
            let exists = role::Entity::find()
                .filter(role::Column::Name.eq(name.as_str()))
                .one(&txn)
                .await
                .map_err(db_err)?
                .is_some();
            if !exists {
                role::ActiveModel {
                    name: Set(name.as_str().to_owned()),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(&txn)
                .await
                .map_err(db_err)?;
            }
        }

        let admin = user::Entity::find()
            .filter(user::Column::Username.eq(seed.admin_username.as_str()))
            .one(&txn)
            .await
            .map_err(db_err)?;
        if admin.is_none() {
            let created = user::ActiveModel {
                username: Set(seed.admin_username.clone()),
                email: Set(seed.admin_email.clone()),
                password: Set(self.hasher.hash_default()?),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(db_err)?;
            let ids = role_ids(&txn, &[RoleKey::Name(RoleName::Admin)]).await?;
            link_roles(&txn, created.id, ids).await?;
            tracing::info!(username = %seed.admin_username, "seeded admin user");
        }
        txn.commit().await.map_err(db_err)
    }

    /// Role names of a stored user, sorted.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotFound`] for an unknown user.
    pub async fn roles_of(&self, username: &str) -> Result<Vec<RoleName>, DomainError> {
        let conn = self.db.conn()?;
        let found = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&conn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found(names::USER))?;
        let mut roles: Vec<RoleName> = roles_by_user(&conn, &[found.id])
            .await?
            .remove(&found.id)
            .unwrap_or_default()
            .into_iter()
            .map(|r| r.name)
            .collect();
        roles.sort();
        Ok(roles)
    }
}

#[async_trait]
impl ItemsRepository for SeaOrmCatalogRepository {
    async fn find(&self, args: &QueryArgs) -> Result<Vec<ItemRes>, DomainError> {
        let conn = self.db.conn()?;
        let models = ordered(item::Entity::find().filter(item_condition(args)), args)
            .all(&conn)
            .await
            .map_err(db_err)?;
        item_results(&conn, models, args.include()).await
    }

    async fn count(&self, args: &QueryArgs) -> Result<u64, DomainError> {
        let conn = self.db.conn()?;
        item::Entity::find()
            .filter(item_condition(args))
            .count(&conn)
            .await
            .map_err(db_err)
    }

    async fn find_by_id(
        &self,
        id: i64,
        include: Option<&IncludeSet>,
    ) -> Result<Option<ItemRes>, DomainError> {
        let conn = self.db.conn()?;
        let found = item::Entity::find_by_id(id)
            .one(&conn)
            .await
            .map_err(db_err)?;
        Ok(item_results(&conn, found.into_iter().collect(), include)
            .await?
            .pop())
    }

    async fn find_by_name(
        &self,
        username: &str,
        name: &str,
        include: Option<&IncludeSet>,
    ) -> Result<Option<ItemRes>, DomainError> {
        let conn = self.db.conn()?;
        let found = item::Entity::find()
            .filter(item::Column::Username.eq(username))
            .filter(item::Column::Name.eq(name))
            .one(&conn)
            .await
            .map_err(db_err)?;
        Ok(item_results(&conn, found.into_iter().collect(), include)
            .await?
            .pop())
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, DomainError> {
        let conn = self.db.conn()?;
        let found = user::Entity::find_by_id(id)
            .one(&conn)
            .await
            .map_err(db_err)?;
        Ok(found.map(Into::into))
    }

    async fn create(&self, username: &str, item: NewItem) -> Result<Item, DomainError> {
        let conn = self.db.conn()?;
        let now = Utc::now();
        let created = item::ActiveModel {
            username: Set(username.to_owned()),
            name: Set(item.name),
            price: Set(item.price),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&conn)
        .await
        .map_err(write_err(names::ITEM))?;
        Ok(created.into())
    }

    async fn update(&self, id: i64, update: &EntityUpdate) -> Result<Item, DomainError> {
        let conn = self.db.conn()?;
        let txn = conn.begin().await.map_err(db_err)?;
        let current = item::Entity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found(names::ITEM))?;
        let updated = apply_update(&current, update)?
            .update(&txn)
            .await
            .map_err(write_err(names::ITEM))?;
        txn.commit().await.map_err(db_err)?;
        Ok(updated.into())
    }

    async fn remove(&self, id: i64) -> Result<(), DomainError> {
        let conn = self.db.conn()?;
        let res = item::Entity::delete_by_id(id)
            .exec(&conn)
            .await
            .map_err(db_err)?;
        if res.rows_affected == 0 {
            return Err(DomainError::not_found(names::ITEM));
        }
        Ok(())
    }

    async fn update_many(
        &self,
        args: &QueryArgs,
        update: &EntityUpdate,
    ) -> Result<u64, DomainError> {
        let conn = self.db.conn()?;
        let txn = conn.begin().await.map_err(db_err)?;
        let matching = item::Entity::find()
            .filter(item_condition(args))
            .all(&txn)
            .await
            .map_err(db_err)?;
        let mut count = 0;
        for model in &matching {
            apply_update(model, update)?
                .update(&txn)
                .await
                .map_err(write_err(names::ITEM))?;
            count += 1;
        }
        txn.commit().await.map_err(db_err)?;
        Ok(count)
    }

    async fn remove_many(&self, args: &QueryArgs) -> Result<u64, DomainError> {
        let conn = self.db.conn()?;
        let res = item::Entity::delete_many()
            .filter(item_condition(args))
            .exec(&conn)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected)
    }
}

#[async_trait]
impl UsersRepository for SeaOrmCatalogRepository {
    async fn find(&self, args: &QueryArgs) -> Result<Vec<UserRes>, DomainError> {
        let conn = self.db.conn()?;
        let models = ordered(user::Entity::find().filter(user_condition(args)), args)
            .all(&conn)
            .await
            .map_err(db_err)?;
        user_results(&conn, models, args.include()).await
    }

    async fn count(&self, args: &QueryArgs) -> Result<u64, DomainError> {
        let conn = self.db.conn()?;
        user::Entity::find()
            .filter(user_condition(args))
            .count(&conn)
            .await
            .map_err(db_err)
    }

    async fn find_by_id(
        &self,
        id: i64,
        include: Option<&IncludeSet>,
    ) -> Result<Option<UserRes>, DomainError> {
        let conn = self.db.conn()?;
        let found = user::Entity::find_by_id(id)
            .one(&conn)
            .await
            .map_err(db_err)?;
        Ok(user_results(&conn, found.into_iter().collect(), include)
            .await?
            .pop())
    }

    async fn find_by_name(
        &self,
        username: &str,
        include: Option<&IncludeSet>,
    ) -> Result<Option<UserRes>, DomainError> {
        let conn = self.db.conn()?;
        let found = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&conn)
            .await
            .map_err(db_err)?;
        Ok(user_results(&conn, found.into_iter().collect(), include)
            .await?
            .pop())
    }

    async fn create(
        &self,
        user: NewUser,
        profile: Option<NewProfile>,
        roles: &[RoleKey],
    ) -> Result<User, DomainError> {
        let password = self.hasher.hash(&user.password)?;
        let conn = self.db.conn()?;
        let txn = conn.begin().await.map_err(db_err)?;
        let now = Utc::now();
        let created = user::ActiveModel {
            username: Set(user.username),
            email: Set(user.email),
            password: Set(password),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(write_err(names::USER))?;
        if let Some(profile) = profile {
            profile::ActiveModel {
                username: Set(created.username.clone()),
                name: Set(profile.name),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .map_err(write_err(names::PROFILE))?;
        }
        let ids = role_ids(&txn, roles).await?;
        link_roles(&txn, created.id, ids).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(created.into())
    }

    async fn set_roles(&self, id: i64, op: RoleOp, roles: &[RoleKey]) -> Result<(), DomainError> {
        let conn = self.db.conn()?;
        let txn = conn.begin().await.map_err(db_err)?;
        if user::Entity::find_by_id(id)
            .one(&txn)
            .await
            .map_err(db_err)?
            .is_none()
        {
            return Err(DomainError::not_found(names::USER));
        }
        let wanted = role_ids(&txn, roles).await?;
        let current: Vec<i64> = user_role::Entity::find()
            .filter(user_role::Column::UserId.eq(id))
            .all(&txn)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|link| link.role_id)
            .collect();

        let stale = match op {
            RoleOp::Set => Some(user_role::Column::RoleId.is_not_in(wanted.clone())),
            RoleOp::Remove => Some(user_role::Column::RoleId.is_in(wanted.clone())),
            RoleOp::Add => None,
        };
        if let Some(stale) = stale {
            user_role::Entity::delete_many()
                .filter(user_role::Column::UserId.eq(id))
                .filter(stale)
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }
        if matches!(op, RoleOp::Set | RoleOp::Add) {
            let missing = wanted.into_iter().filter(|r| !current.contains(r));
            link_roles(&txn, id, missing).await?;
        }
        txn.commit().await.map_err(db_err)
    }

    async fn reset_password(&self, id: i64) -> Result<(), DomainError> {
        let hash = self.hasher.hash_default()?;
        let conn = self.db.conn()?;
        let res = user::Entity::update_many()
            .col_expr(user::Column::Password, Expr::value(hash))
            .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(user::Column::Id.eq(id))
            .exec(&conn)
            .await
            .map_err(db_err)?;
        if res.rows_affected == 0 {
            return Err(DomainError::not_found(names::USER));
        }
        Ok(())
    }

    async fn remove(&self, id: i64) -> Result<(), DomainError> {
        let conn = self.db.conn()?;
        let res = user::Entity::delete_by_id(id)
            .exec(&conn)
            .await
            .map_err(db_err)?;
        if res.rows_affected == 0 {
            return Err(DomainError::not_found(names::USER));
        }
        Ok(())
    }

    async fn remove_many(&self, args: &QueryArgs) -> Result<u64, DomainError> {
        let conn = self.db.conn()?;
        let res = user::Entity::delete_many()
            .filter(user_condition(args))
            .exec(&conn)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected)
    }
}

#[async_trait]
impl RolesRepository for SeaOrmCatalogRepository {
    async fn find(&self, args: &QueryArgs) -> Result<Vec<RoleRes>, DomainError> {
        let conn = self.db.conn()?;
        let models = ordered(role::Entity::find().filter(role_condition(args)), args)
            .all(&conn)
            .await
            .map_err(db_err)?;
        role_results(&conn, models, args.include()).await
    }

    async fn count(&self, args: &QueryArgs) -> Result<u64, DomainError> {
        let conn = self.db.conn()?;
        role::Entity::find()
            .filter(role_condition(args))
            .count(&conn)
            .await
            .map_err(db_err)
    }

    async fn find_by_id(
        &self,
        id: i64,
        include: Option<&IncludeSet>,
    ) -> Result<Option<RoleRes>, DomainError> {
        let conn = self.db.conn()?;
        let found = role::Entity::find_by_id(id)
            .one(&conn)
            .await
            .map_err(db_err)?;
        Ok(role_results(&conn, found.into_iter().collect(), include)
            .await?
            .pop())
    }

    async fn find_by_name(
        &self,
        name: &str,
        include: Option<&IncludeSet>,
    ) -> Result<Option<RoleRes>, DomainError> {
        let conn = self.db.conn()?;
        let found = role::Entity::find()
            .filter(role::Column::Name.eq(name))
            .one(&conn)
            .await
            .map_err(db_err)?;
        Ok(role_results(&conn, found.into_iter().collect(), include)
            .await?
            .pop())
    }
}
