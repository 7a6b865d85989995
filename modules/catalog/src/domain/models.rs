use chrono::{DateTime, Utc};
use crudkit_security::{Attributes, RoleName};
use serde::{Deserialize, Serialize};

/// A user as exposed to callers. The password hash never leaves the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: i64,
    pub username: String,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: i64,
    pub name: RoleName,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An item owned by a user. `(username, name)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub username: String,
    pub name: String,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Creation data of an item; the owner comes from the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub price: f64,
}

/// Creation data of a user. The password is plain text until the store
/// hashes it.
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewProfile {
    pub name: Option<String>,
}

/// Reference to a stored role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleKey {
    Id(i64),
    Name(RoleName),
}

/// How a role list is applied to a user's current roles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoleOp {
    #[default]
    Set,
    Add,
    Remove,
}

/// An item with its optionally included relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRes {
    #[serde(flatten)]
    pub item: Item,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// A user with its optionally included relations.
///
/// An included `profile` is `null` when the user has none.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRes {
    #[serde(flatten)]
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Option<Profile>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Role>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Item>>,
}

impl UserRes {
    #[must_use]
    pub fn bare(user: User) -> Self {
        Self {
            user,
            profile: None,
            roles: None,
            items: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleRes {
    #[serde(flatten)]
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<User>>,
}

/// Result of a listing: a plain list, or a page with the total match count.
///
/// Serialized as `[...]` or `[[...], total]` respectively.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ListRes<T> {
    All(Vec<T>),
    Paged(Vec<T>, u64),
}

impl<T> ListRes<T> {
    #[must_use]
    pub fn items(&self) -> &[T] {
        match self {
            Self::All(items) | Self::Paged(items, _) => items,
        }
    }
}

pub type ItemList = ListRes<ItemRes>;
pub type UserList = ListRes<UserRes>;
pub type RoleList = ListRes<RoleRes>;

/// Number of records touched by a bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchPayload {
    pub count: u64,
}

/// Serialize a model into the attribute form used for ability checks and
/// updates.
///
/// Returns an empty map if the model does not serialize to an object.
pub fn to_record<T: Serialize>(model: &T) -> Attributes {
    match serde_json::to_value(model) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => Attributes::new(),
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn desk() -> Item {
        Item {
            id: 7,
            username: "ann".into(),
            name: "desk".into(),
            price: 120.5,
            created_at: ts(),
            updated_at: ts(),
        }
    }

    #[test]
    fn item_record_uses_declared_field_names() {
        let record = to_record(&desk());
        let mut keys: Vec<_> = record.keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            ["createdAt", "id", "name", "price", "updatedAt", "username"]
        );
        assert_eq!(record["createdAt"], json!("2024-05-01T12:00:00Z"));
    }

    #[test]
    fn listing_shapes() {
        let item = ItemRes {
            item: desk(),
            user: None,
        };
        let all = serde_json::to_value(ItemList::All(vec![item.clone()])).unwrap();
        assert!(all.is_array());
        assert_eq!(all[0]["name"], json!("desk"));
        assert!(all[0].get("user").is_none());

        let paged = serde_json::to_value(ItemList::Paged(vec![item], 9)).unwrap();
        assert_eq!(paged[1], json!(9));
        assert_eq!(paged[0][0]["id"], json!(7));
    }

    #[test]
    fn user_includes_serialize_only_when_loaded() {
        let user = User {
            id: 1,
            username: "ann".into(),
            email: "ann@domain".into(),
            created_at: ts(),
            updated_at: ts(),
        };
        let bare = serde_json::to_value(UserRes::bare(user.clone())).unwrap();
        assert!(bare.get("profile").is_none());
        assert!(bare.get("password").is_none());

        let with_profile = UserRes {
            profile: Some(None),
            roles: Some(Vec::new()),
            ..UserRes::bare(user)
        };
        let value = serde_json::to_value(with_profile).unwrap();
        assert_eq!(value["profile"], json!(null));
        assert_eq!(value["roles"], json!([]));
        assert!(value.get("items").is_none());
    }

    #[test]
    fn new_user_debug_hides_password() {
        let user = NewUser {
            username: "ann".into(),
            email: "ann@domain".into(),
            password: "secret12".into(),
        };
        assert!(!format!("{user:?}").contains("secret12"));
    }
}
