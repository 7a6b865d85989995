use crudkit_query::{
    EntityFilter, EntityUpdate, FieldType, FieldValue, IncludeSet, PageLimits, ValidationError,
    build_update,
};
use serde_json::{Map, Value};

use super::{Endpoint, Listing, body, id, includes, keys, listing, non_empty_string, required};
use crate::domain::entities::{ITEM, USER};
use crate::domain::models::NewItem;

#[derive(Clone, Debug, PartialEq)]
pub struct SearchItems {
    pub items: Option<EntityFilter>,
    pub users: Option<EntityFilter>,
    pub includes: Option<IncludeSet>,
    pub listing: Listing,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GetItem {
    pub id: i64,
    pub includes: Option<IncludeSet>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GetItemByName {
    pub username: String,
    pub name: String,
    pub includes: Option<IncludeSet>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ItemsByUser {
    pub user_id: i64,
    pub includes: Option<IncludeSet>,
    pub listing: Listing,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateItem {
    pub item: NewItem,
    pub includes: Option<IncludeSet>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpdateItem {
    pub id: i64,
    pub update: EntityUpdate,
    pub includes: Option<IncludeSet>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemoveItem {
    pub id: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpdateItems {
    pub items: Option<EntityFilter>,
    pub users: Option<EntityFilter>,
    pub update: EntityUpdate,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemoveItems {
    pub items: Option<EntityFilter>,
    pub users: Option<EntityFilter>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ItemRequest {
    Search(SearchItems),
    Get(GetItem),
    GetByName(GetItemByName),
    ByUser(ItemsByUser),
    Create(CreateItem),
    Update(UpdateItem),
    Remove(RemoveItem),
    UpdateBulk(UpdateItems),
    RemoveBulk(RemoveItems),
}

impl ItemRequest {
    #[must_use]
    pub fn endpoint(&self) -> Endpoint {
        match self {
            Self::Search(_) => Endpoint::SearchItems,
            Self::Get(_) => Endpoint::GetItem,
            Self::GetByName(_) => Endpoint::GetItemByName,
            Self::ByUser(_) => Endpoint::ItemsByUser,
            Self::Create(_) => Endpoint::CreateItem,
            Self::Update(_) => Endpoint::UpdateItem,
            Self::Remove(_) => Endpoint::RemoveItem,
            Self::UpdateBulk(_) => Endpoint::UpdateItems,
            Self::RemoveBulk(_) => Endpoint::RemoveItems,
        }
    }
}

const ITEMS: &str = "items";
const USERS: &str = "users";
const ITEM_KEY: &str = "item";
const USERNAME: &str = "username";
const NAME: &str = "name";
const PRICE: &str = "price";

fn item_filter(map: &Map<String, Value>) -> Result<Option<EntityFilter>, ValidationError> {
    super::own_filter(&ITEM, map, ITEMS)
}

/// The `users` filter of item endpoints scopes by owner and must not be
/// `null`: every item has one.
fn user_filter(map: &Map<String, Value>) -> Result<Option<EntityFilter>, ValidationError> {
    super::own_filter(&USER, map, USERS)
}

fn new_item(raw: Option<&Value>) -> Result<NewItem, ValidationError> {
    let Some(raw) = raw else {
        return Err(ValidationError::RequiredValue {
            field: ITEM_KEY.to_owned(),
        });
    };
    let map = body(Endpoint::CreateItem, raw, &[NAME, PRICE])?;
    let name = non_empty_string(map, NAME)?;
    let price = match required(map, PRICE, FieldType::Float)? {
        FieldValue::Float(p) if p.is_finite() => p,
        _ => {
            return Err(ValidationError::TypeMismatch {
                field: PRICE.to_owned(),
                expected: "number",
            });
        }
    };
    Ok(NewItem { name, price })
}

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body.
pub fn parse_search(raw: &Value, limits: &PageLimits) -> Result<ItemRequest, ValidationError> {
    let map = body(
        Endpoint::SearchItems,
        raw,
        &[ITEMS, USERS, keys::INCLUDES, keys::PAGE],
    )?;
    Ok(ItemRequest::Search(SearchItems {
        items: item_filter(map)?,
        users: user_filter(map)?,
        includes: includes(&ITEM, map)?,
        listing: listing(&ITEM, map, limits)?,
    }))
}

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body.
pub fn parse_get(raw: &Value) -> Result<ItemRequest, ValidationError> {
    let map = body(Endpoint::GetItem, raw, &[keys::ID, keys::INCLUDES])?;
    Ok(ItemRequest::Get(GetItem {
        id: id(map, keys::ID)?,
        includes: includes(&ITEM, map)?,
    }))
}

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body.
pub fn parse_get_by_name(raw: &Value) -> Result<ItemRequest, ValidationError> {
    let map = body(
        Endpoint::GetItemByName,
        raw,
        &[USERNAME, NAME, keys::INCLUDES],
    )?;
    Ok(ItemRequest::GetByName(GetItemByName {
        username: non_empty_string(map, USERNAME)?,
        name: non_empty_string(map, NAME)?,
        includes: includes(&ITEM, map)?,
    }))
}

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body.
pub fn parse_by_user(raw: &Value, limits: &PageLimits) -> Result<ItemRequest, ValidationError> {
    let map = body(
        Endpoint::ItemsByUser,
        raw,
        &[keys::ID, keys::INCLUDES, keys::PAGE],
    )?;
    Ok(ItemRequest::ByUser(ItemsByUser {
        user_id: id(map, keys::ID)?,
        includes: includes(&ITEM, map)?,
        listing: listing(&ITEM, map, limits)?,
    }))
}

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body.
pub fn parse_create(raw: &Value) -> Result<ItemRequest, ValidationError> {
    let map = body(Endpoint::CreateItem, raw, &[ITEM_KEY, keys::INCLUDES])?;
    Ok(ItemRequest::Create(CreateItem {
        item: new_item(map.get(ITEM_KEY))?,
        includes: includes(&ITEM, map)?,
    }))
}

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body.
pub fn parse_update(raw: &Value) -> Result<ItemRequest, ValidationError> {
    let map = body(
        Endpoint::UpdateItem,
        raw,
        &[keys::ID, ITEM_KEY, keys::INCLUDES],
    )?;
    Ok(ItemRequest::Update(UpdateItem {
        id: id(map, keys::ID)?,
        update: build_update(&ITEM, map.get(ITEM_KEY))?,
        includes: includes(&ITEM, map)?,
    }))
}

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body.
pub fn parse_remove(raw: &Value) -> Result<ItemRequest, ValidationError> {
    let map = body(Endpoint::RemoveItem, raw, &[keys::ID])?;
    Ok(ItemRequest::Remove(RemoveItem {
        id: id(map, keys::ID)?,
    }))
}

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body.
pub fn parse_update_bulk(raw: &Value) -> Result<ItemRequest, ValidationError> {
    let map = body(Endpoint::UpdateItems, raw, &[ITEMS, USERS, ITEM_KEY])?;
    Ok(ItemRequest::UpdateBulk(UpdateItems {
        items: item_filter(map)?,
        users: user_filter(map)?,
        update: build_update(&ITEM, map.get(ITEM_KEY))?,
    }))
}

/// # Errors
///
/// Returns the first [`ValidationError`] found in the body.
pub fn parse_remove_bulk(raw: &Value) -> Result<ItemRequest, ValidationError> {
    let map = body(Endpoint::RemoveItems, raw, &[ITEMS, USERS])?;
    Ok(ItemRequest::RemoveBulk(RemoveItems {
        items: item_filter(map)?,
        users: user_filter(map)?,
    }))
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crudkit_query::Order;
    use serde_json::json;

    fn limits() -> PageLimits {
        PageLimits::default()
    }

    #[test]
    fn search_without_page_lists_everything() {
        let req = parse_search(&json!({"items": {"name": {"contains": "de"}}}), &limits()).unwrap();
        let ItemRequest::Search(search) = req else {
            panic!("expected a search");
        };
        assert!(search.items.is_some());
        assert!(search.users.is_none());
        assert_eq!(search.listing, Listing::All);
    }

    #[test]
    fn search_with_nested_page() {
        let req = parse_search(
            &json!({"page": {"number": 2.0, "size": 10, "order": "desc", "orderBy": "name"}}),
            &limits(),
        )
        .unwrap();
        let ItemRequest::Search(SearchItems {
            listing: Listing::Paged(page),
            ..
        }) = req
        else {
            panic!("expected a paged search");
        };
        assert_eq!((page.number, page.size, page.order), (2, 10, Order::Desc));
        assert_eq!(page.order_by, Some("name"));
    }

    #[test]
    fn own_filter_rejects_null() {
        assert!(matches!(
            parse_search(&json!({"items": null}), &limits()),
            Err(ValidationError::NullNotAllowed { target }) if target == "items"
        ));
        assert!(matches!(
            parse_remove_bulk(&json!({"users": null})),
            Err(ValidationError::NullNotAllowed { target }) if target == "users"
        ));
    }

    #[test]
    fn ids_accept_numeric_strings_and_whole_floats() {
        assert_eq!(
            parse_remove(&json!({"id": "42"})),
            Ok(ItemRequest::Remove(RemoveItem { id: 42 }))
        );
        assert_eq!(
            parse_remove(&json!({"id": 2.0})),
            Ok(ItemRequest::Remove(RemoveItem { id: 2 }))
        );
        assert!(matches!(
            parse_remove(&json!({"id": 0})),
            Err(ValidationError::TypeMismatch { .. })
        ));
        assert!(matches!(
            parse_remove(&json!({})),
            Err(ValidationError::RequiredValue { .. })
        ));
    }

    #[test]
    fn create_requires_name_and_price() {
        let req = parse_create(&json!({"item": {"name": "lamp", "price": 15}, "includes": "user"}))
            .unwrap();
        let ItemRequest::Create(create) = req else {
            panic!("expected a create");
        };
        assert_eq!(
            create.item,
            NewItem {
                name: "lamp".into(),
                price: 15.0
            }
        );
        assert!(create.includes.is_some_and(|i| i.contains("user")));

        assert!(matches!(
            parse_create(&json!({"item": {"name": "lamp"}})),
            Err(ValidationError::RequiredValue { field }) if field == "price"
        ));
        assert!(matches!(
            parse_create(&json!({"item": {"name": " ", "price": 1}})),
            Err(ValidationError::TypeMismatch { .. })
        ));
        assert!(matches!(
            parse_create(&json!({"item": {"name": "x", "price": 1, "username": "eve"}})),
            Err(ValidationError::UnknownField { field, .. }) if field == "username"
        ));
    }

    #[test]
    fn update_rejects_double_operators_and_empty_bodies() {
        assert!(matches!(
            parse_update(&json!({"id": 1, "item": {"price": {"increment": 5, "decrement": 2}}})),
            Err(ValidationError::MultipleUpdateOps { .. })
        ));
        assert!(matches!(
            parse_update(&json!({"id": 1})),
            Err(ValidationError::EmptyUpdate { .. })
        ));
    }

    #[test]
    fn request_reports_its_endpoint() {
        let req = parse_by_user(&json!({"id": 3, "page": {}}), &limits()).unwrap();
        assert_eq!(req.endpoint(), Endpoint::ItemsByUser);
        assert_eq!(Endpoint::ItemsByUser.to_string(), "items.by_user");
    }
}
