use std::sync::Arc;

use crudkit_query::{EntityFilter, FilterInput, IncludeSet, QueryArgs, build_filter};
use crudkit_security::{Action, SecurityContext, Subject};
use serde::Serialize;
use serde_json::{Value, json};

use super::{caller, filter_input, owned_by};
use crate::domain::entities::{self, ITEM, USER};
use crate::domain::error::DomainError;
use crate::domain::models::{BatchPayload, Item, ItemList, ItemRes, to_record};
use crate::domain::repo::ItemsRepository;
use crate::domain::requests::Listing;
use crate::domain::requests::items::{
    CreateItem, GetItem, GetItemByName, ItemRequest, ItemsByUser, RemoveItem, RemoveItems,
    SearchItems, UpdateItem, UpdateItems,
};

const USER_RELATION: &str = "user";

/// Result of an item request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ItemResponse {
    Item(ItemRes),
    Items(ItemList),
    Batch(BatchPayload),
    Empty,
}

/// Items use case.
pub struct ItemsService<R: ItemsRepository> {
    repo: Arc<R>,
}

impl<R: ItemsRepository> ItemsService<R> {
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
        request: ItemRequest,
    ) -> Result<ItemResponse, DomainError> {
        tracing::debug!(endpoint = %request.endpoint(), "handling item request");
        match request {
            ItemRequest::Search(req) => self.search(ctx, req).await.map(ItemResponse::Items),
            ItemRequest::Get(req) => self.get(ctx, req).await.map(ItemResponse::Item),
            ItemRequest::GetByName(req) => self.get_by_name(ctx, req).await.map(ItemResponse::Item),
            ItemRequest::ByUser(req) => self.by_user(ctx, req).await.map(ItemResponse::Items),
            ItemRequest::Create(req) => self.create(ctx, req).await.map(ItemResponse::Item),
            ItemRequest::Update(req) => self.update(ctx, req).await.map(ItemResponse::Item),
            ItemRequest::Remove(req) => self.remove(ctx, req).await.map(|()| ItemResponse::Empty),
            ItemRequest::UpdateBulk(req) => {
                self.update_bulk(ctx, req).await.map(ItemResponse::Batch)
            }
            ItemRequest::RemoveBulk(req) => {
                self.remove_bulk(ctx, req).await.map(ItemResponse::Batch)
            }
        }
    }

    /// # Errors
    ///
    /// [`DomainError::Permission`] if the caller may not read items.
    pub async fn search(
        &self,
        ctx: &SecurityContext,
        req: SearchItems,
    ) -> Result<ItemList, DomainError> {
        authorize_read(ctx, req.includes.as_ref())?;
        let args = QueryArgs::new(&ITEM)
            .with_filter(filter_input(req.items))
            .with_relation_filter(USER_RELATION, filter_input(req.users))?
            .with_includes(req.includes);
        self.list(args, req.listing).await
    }

    /// # Errors
    ///
    /// [`DomainError::NotFound`] for an unknown id, [`DomainError::Permission`]
    /// if the caller may not read it.
    pub async fn get(&self, ctx: &SecurityContext, req: GetItem) -> Result<ItemRes, DomainError> {
        authorize_read(ctx, req.includes.as_ref())?;
        let found = self
            .repo
            .find_by_id(req.id, req.includes.as_ref())
            .await?
            .ok_or_else(|| DomainError::not_found(entities::names::ITEM))?;
        ctx.authorize(Action::Read, Subject::Item, Some(&to_record(&found.item)))?;
        Ok(found)
    }

    /// # Errors
    ///
    /// [`DomainError::NotFound`] when the owner has no such item,
    /// [`DomainError::Permission`] if the caller may not read it.
    pub async fn get_by_name(
        &self,
        ctx: &SecurityContext,
        req: GetItemByName,
    ) -> Result<ItemRes, DomainError> {
        authorize_read(ctx, req.includes.as_ref())?;
        let found = self
            .repo
            .find_by_name(&req.username, &req.name, req.includes.as_ref())
            .await?
            .ok_or_else(|| DomainError::not_found(entities::names::ITEM))?;
        ctx.authorize(Action::Read, Subject::Item, Some(&to_record(&found.item)))?;
        Ok(found)
    }

    /// Items owned by the user with the given id. Needs read access to items
    /// only; the owner is looked up to tell an unknown user apart.
    ///
    /// # Errors
    ///
    /// [`DomainError::NotFound`] for an unknown user, [`DomainError::Permission`]
    /// if the caller may not read items.
    pub async fn by_user(
        &self,
        ctx: &SecurityContext,
        req: ItemsByUser,
    ) -> Result<ItemList, DomainError> {
        authorize_read(ctx, req.includes.as_ref())?;
        let owner = self
            .repo
            .find_user(req.user_id)
            .await?
            .ok_or_else(|| DomainError::not_found(entities::names::USER))?;
        let users = build_filter(&USER, Some(&json!({ "id": owner.id })))?;
        let args = QueryArgs::new(&ITEM)
            .with_relation_filter(USER_RELATION, users)?
            .with_includes(req.includes);
        self.list(args, req.listing).await
    }

    /// Create an item owned by the caller.
    ///
    /// # Errors
    ///
    /// [`DomainError::Permission`] if the caller may not create items,
    /// [`DomainError::Conflict`] if the caller already owns an item of that name.
    pub async fn create(
        &self,
        ctx: &SecurityContext,
        req: CreateItem,
    ) -> Result<ItemRes, DomainError> {
        let username = caller(ctx)?;
        let mut instance = owned_by(username);
        instance.insert("name".to_owned(), Value::from(req.item.name.as_str()));
        instance.insert("price".to_owned(), Value::from(req.item.price));
        ctx.authorize(Action::Create, Subject::Item, Some(&instance))?;
        if req.includes.is_some() {
            authorize_read(ctx, req.includes.as_ref())?;
        }

        let created = self.repo.create(username, req.item).await?;
        tracing::info!(id = created.id, owner = %created.username, "item created");
        self.reload(created, req.includes.as_ref()).await
    }

    /// # Errors
    ///
    /// [`DomainError::NotFound`] for an unknown id, [`DomainError::Permission`]
    /// unless the caller may update this item, plus repository errors.
    pub async fn update(
        &self,
        ctx: &SecurityContext,
        req: UpdateItem,
    ) -> Result<ItemRes, DomainError> {
        let current = self.existing(ctx, req.id).await?;
        ctx.authorize(Action::Update, Subject::Item, Some(&to_record(&current)))?;
        if req.includes.is_some() {
            authorize_read(ctx, req.includes.as_ref())?;
        }
        tracing::debug!(id = req.id, update = %req.update.to_json(), "updating item");
        let updated = self.repo.update(req.id, &req.update).await?;
        self.reload(updated, req.includes.as_ref()).await
    }

    /// # Errors
    ///
    /// [`DomainError::NotFound`] for an unknown id, [`DomainError::Permission`]
    /// unless the caller may delete this item.
    pub async fn remove(&self, ctx: &SecurityContext, req: RemoveItem) -> Result<(), DomainError> {
        let current = self.existing(ctx, req.id).await?;
        ctx.authorize(Action::Delete, Subject::Item, Some(&to_record(&current)))?;
        self.repo.remove(req.id).await?;
        tracing::info!(id = req.id, "item removed");
        Ok(())
    }

    /// # Errors
    ///
    /// See [`bulk_args`]; repository errors are propagated.
    pub async fn update_bulk(
        &self,
        ctx: &SecurityContext,
        req: UpdateItems,
    ) -> Result<BatchPayload, DomainError> {
        let args = bulk_args(ctx, Action::Update, req.items, req.users)?;
        tracing::debug!(query = %args.to_json(), update = %req.update.to_json(), "bulk item update");
        let count = self.repo.update_many(&args, &req.update).await?;
        Ok(BatchPayload { count })
    }

    /// # Errors
    ///
    /// See [`bulk_args`]; repository errors are propagated.
    pub async fn remove_bulk(
        &self,
        ctx: &SecurityContext,
        req: RemoveItems,
    ) -> Result<BatchPayload, DomainError> {
        let args = bulk_args(ctx, Action::Delete, req.items, req.users)?;
        tracing::debug!(query = %args.to_json(), "bulk item removal");
        let count = self.repo.remove_many(&args).await?;
        Ok(BatchPayload { count })
    }

    async fn list(&self, args: QueryArgs, listing: Listing) -> Result<ItemList, DomainError> {
        match listing {
            Listing::All => {
                tracing::debug!(query = %args.to_json(), "listing items");
                Ok(ItemList::All(self.repo.find(&args).await?))
            }
            Listing::Paged(page) => {
                let args = args.with_page(page);
                tracing::debug!(query = %args.to_json(), "listing item page");
                let items = self.repo.find(&args).await?;
                let total = self.repo.count(&args).await?;
                Ok(ItemList::Paged(items, total))
            }
        }
    }

    async fn existing(&self, ctx: &SecurityContext, id: i64) -> Result<Item, DomainError> {
        ctx.ability()?;
        self.repo
            .find_by_id(id, None)
            .await?
            .map(|found| found.item)
            .ok_or_else(|| DomainError::not_found(entities::names::ITEM))
    }

    async fn reload(
        &self,
        item: Item,
        includes: Option<&IncludeSet>,
    ) -> Result<ItemRes, DomainError> {
        if includes.is_none() {
            return Ok(ItemRes { item, user: None });
        }
        self.repo
            .find_by_id(item.id, includes)
            .await?
            .ok_or_else(|| DomainError::not_found(entities::names::ITEM))
    }
}

/// Reading items, and users when they are included.
fn authorize_read(ctx: &SecurityContext, includes: Option<&IncludeSet>) -> Result<(), DomainError> {
    ctx.authorize(Action::Read, Subject::Item, None)?;
    if includes.is_some_and(|i| i.contains(USER_RELATION)) {
        ctx.authorize(Action::Read, Subject::User, None)?;
    }
    Ok(())
}

/// Scope of a bulk operation on items.
///
/// # Errors
///
/// An explicit `users` filter needs an unconditional grant for `action`.
/// Without one, the caller must be allowed `action` on their own items and the
/// operation is limited to them.
pub fn bulk_args(
    ctx: &SecurityContext,
    action: Action,
    items: Option<EntityFilter>,
    users: Option<EntityFilter>,
) -> Result<QueryArgs, DomainError> {
    let username = caller(ctx)?;
    let users = match users {
        Some(users) => {
            ctx.authorize(action, Subject::Item, None)?;
            FilterInput::Filter(users)
        }
        None => {
            ctx.authorize(action, Subject::Item, Some(&owned_by(username)))?;
            build_filter(&USER, Some(&json!({ "username": username })))?
        }
    };
    Ok(QueryArgs::new(&ITEM)
        .with_filter(filter_input(items))
        .with_relation_filter(USER_RELATION, users)?)
}
