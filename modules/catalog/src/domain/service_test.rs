//! Service tests over an in-memory `SQLite` catalog.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use argon2::password_hash::{PasswordHash, PasswordVerifier};
    use argon2::Argon2;
    use crudkit_query::PageLimits;
    use crudkit_security::{
        Ability, Action, Grant, PermissionError, RoleName, SecurityContext, Subject,
    };
    use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
    use serde_json::{Value, json};

    use crate::config::{CatalogConfig, PasswordConfig};
    use crate::domain::error::DomainError;
    use crate::domain::models::{
        BatchPayload, ItemList, ItemRes, NewUser, RoleKey, RoleList, User, UserList, UserRes,
    };
    use crate::domain::repo::UsersRepository;
    use crate::domain::requests::Endpoint;
    use crate::domain::service::{Catalog, ItemResponse, Response, RoleResponse, UserResponse};
    use crate::infra::storage::entity::user;
    use crate::infra::storage::sea_orm_repo::SeaOrmCatalogRepository;

    fn config() -> CatalogConfig {
        CatalogConfig {
            password: PasswordConfig {
                memory_kib: 256,
                iterations: 1,
                ..PasswordConfig::default()
            },
            ..CatalogConfig::default()
        }
    }

    struct Fixture {
        repo: Arc<SeaOrmCatalogRepository>,
        catalog: Catalog<SeaOrmCatalogRepository>,
    }

    impl Fixture {
        async fn new() -> Self {
            let repo = Arc::new(SeaOrmCatalogRepository::open(&config()).await.unwrap());
            let f = Self {
                catalog: Catalog::new(&repo, PageLimits::default()),
                repo,
            };
            f.add_user("ann", RoleName::User).await;
            f.add_user("bob", RoleName::User).await;
            f.add_user("gus", RoleName::Guest).await;
            f
        }

        async fn add_user(&self, username: &str, role: RoleName) -> User {
            let user = NewUser {
                username: username.to_owned(),
                email: format!("{username}@domain"),
                password: "abc123".to_owned(),
            };
            UsersRepository::create(&*self.repo, user, None, &[RoleKey::Name(role)])
                .await
                .unwrap()
        }

        async fn ctx(&self, username: &str) -> SecurityContext {
            SecurityContext::builder()
                .username(username)
                .roles(self.repo.roles_of(username).await.unwrap())
                .build()
        }

        async fn call(
            &self,
            username: Option<&str>,
            endpoint: Endpoint,
            body: Value,
        ) -> Result<Response, DomainError> {
            let ctx = match username {
                Some(u) => self.ctx(u).await,
                None => SecurityContext::anonymous(),
            };
            self.catalog.dispatch(&ctx, endpoint, &body).await
        }

        async fn create(&self, username: &str, name: &str, price: f64) -> ItemRes {
            let res = self
                .call(
                    Some(username),
                    Endpoint::CreateItem,
                    json!({"item": {"name": name, "price": price}}),
                )
                .await
                .unwrap();
            let Response::Items(ItemResponse::Item(item)) = res else {
                panic!("expected an item, got {res:?}");
            };
            item
        }

        async fn stored_password(&self, username: &str) -> String {
            let conn = self.repo.db().conn().unwrap();
            user::Entity::find()
                .filter(user::Column::Username.eq(username))
                .one(&conn)
                .await
                .unwrap()
                .unwrap()
                .password
        }
    }

    fn items(res: Response) -> ItemList {
        match res {
            Response::Items(ItemResponse::Items(list)) => list,
            other => panic!("expected an item list, got {other:?}"),
        }
    }

    fn users(res: Response) -> UserList {
        match res {
            Response::Users(UserResponse::Users(list)) => list,
            other => panic!("expected a user list, got {other:?}"),
        }
    }

    fn one_user(res: Response) -> UserRes {
        match res {
            Response::Users(UserResponse::User(found)) => found,
            other => panic!("expected a user, got {other:?}"),
        }
    }

    fn batch(res: Response) -> u64 {
        match res {
            Response::Items(ItemResponse::Batch(BatchPayload { count }))
            | Response::Users(UserResponse::Batch(BatchPayload { count })) => count,
            other => panic!("expected a batch, got {other:?}"),
        }
    }

    fn usernames(list: &UserList) -> Vec<&str> {
        list.items().iter().map(|u| u.user.username.as_str()).collect()
    }

    fn verifies(hash: &str, password: &str) -> bool {
        let parsed = PasswordHash::new(hash).unwrap();
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    #[tokio::test]
    async fn user_updates_own_item_but_not_others() {
        let f = Fixture::new().await;
        let desk = f.create("ann", "desk", 10.0).await;

        let res = f
            .call(
                Some("ann"),
                Endpoint::UpdateItem,
                json!({"id": desk.item.id, "item": {"price": {"increment": 5}}}),
            )
            .await
            .unwrap();
        let Response::Items(ItemResponse::Item(updated)) = res else {
            panic!("expected an item");
        };
        assert!((updated.item.price - 15.0).abs() < f64::EPSILON);

        let denied = f
            .call(
                Some("bob"),
                Endpoint::UpdateItem,
                json!({"id": desk.item.id, "item": {"name": "mine"}}),
            )
            .await;
        assert!(matches!(
            denied,
            Err(DomainError::Permission(PermissionError::Denied { .. }))
        ));
    }

    #[tokio::test]
    async fn admin_removes_any_item() {
        let f = Fixture::new().await;
        let desk = f.create("ann", "desk", 10.0).await;
        assert!(matches!(
            f.call(Some("bob"), Endpoint::RemoveItem, json!({"id": desk.item.id}))
                .await,
            Err(DomainError::Permission(_))
        ));
        let res = f
            .call(Some("admin"), Endpoint::RemoveItem, json!({"id": desk.item.id}))
            .await
            .unwrap();
        assert_eq!(res, Response::Items(ItemResponse::Empty));
        assert!(matches!(
            f.call(Some("admin"), Endpoint::GetItem, json!({"id": desk.item.id}))
                .await,
            Err(DomainError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn guests_and_anonymous_callers_are_refused() {
        let f = Fixture::new().await;
        assert!(matches!(
            f.call(Some("gus"), Endpoint::SearchItems, json!({})).await,
            Err(DomainError::Permission(PermissionError::Denied { .. }))
        ));
        assert!(matches!(
            f.call(None, Endpoint::SearchItems, json!({})).await,
            Err(DomainError::Permission(PermissionError::NoAbilityComputed))
        ));
        assert!(matches!(
            f.call(None, Endpoint::CreateItem, json!({"item": {"name": "x", "price": 1}}))
                .await,
            Err(DomainError::Permission(PermissionError::NoAbilityComputed))
        ));
    }

    #[tokio::test]
    async fn search_pages_and_counts() {
        let f = Fixture::new().await;
        for (name, price) in [("a", 1.0), ("b", 2.0), ("c", 3.0)] {
            f.create("ann", name, price).await;
        }
        f.create("bob", "d", 4.0).await;

        let list = items(
            f.call(
                Some("bob"),
                Endpoint::SearchItems,
                json!({
                    "users": {"username": "ann"},
                    "page": {"size": 2, "order": "desc", "orderBy": "price"}
                }),
            )
            .await
            .unwrap(),
        );
        let ItemList::Paged(page, total) = list else {
            panic!("expected a page");
        };
        assert_eq!(total, 3);
        let names: Vec<_> = page.iter().map(|r| r.item.name.as_str()).collect();
        assert_eq!(names, ["c", "b"]);

        let all = items(
            f.call(
                Some("bob"),
                Endpoint::SearchItems,
                json!({"items": {"price": {"gte": 2}}}),
            )
            .await
            .unwrap(),
        );
        assert!(matches!(all, ItemList::All(ref v) if v.len() == 3));
    }

    #[tokio::test]
    async fn includes_attach_the_owner() {
        let f = Fixture::new().await;
        let desk = f.create("ann", "desk", 10.0).await;
        assert!(desk.user.is_none());

        let res = f
            .call(
                Some("bob"),
                Endpoint::GetItemByName,
                json!({"username": "ann", "name": "desk", "includes": ["user"]}),
            )
            .await
            .unwrap();
        let Response::Items(ItemResponse::Item(found)) = res else {
            panic!("expected an item");
        };
        assert_eq!(found.user.map(|u| u.email), Some("ann@domain".to_owned()));
    }

    #[tokio::test]
    async fn items_by_user_id() {
        let f = Fixture::new().await;
        f.create("ann", "desk", 10.0).await;
        f.create("bob", "lamp", 3.0).await;
        let bob = one_user(
            f.call(Some("ann"), Endpoint::GetUserByName, json!({"username": "bob"}))
                .await
                .unwrap(),
        );

        let list = items(
            f.call(Some("ann"), Endpoint::ItemsByUser, json!({"id": bob.user.id}))
                .await
                .unwrap(),
        );
        assert_eq!(list.items().len(), 1);
        assert_eq!(list.items()[0].item.username, "bob");

        assert!(matches!(
            f.call(Some("ann"), Endpoint::ItemsByUser, json!({"id": 9999}))
                .await,
            Err(DomainError::NotFound { entity: "user" })
        ));
    }

    #[tokio::test]
    async fn items_by_user_needs_only_item_read_access() {
        let f = Fixture::new().await;
        f.create("bob", "lamp", 3.0).await;
        let bob = one_user(
            f.call(Some("ann"), Endpoint::GetUserByName, json!({"username": "bob"}))
                .await
                .unwrap(),
        );
        let reader = SecurityContext::builder()
            .username("reader")
            .ability(Ability::new(vec![Grant::new(Action::Read, Subject::Item)]))
            .build();
        assert!(!reader.can(Action::Read, Subject::User, None));

        let res = f
            .catalog
            .dispatch(&reader, Endpoint::ItemsByUser, &json!({"id": bob.user.id}))
            .await
            .unwrap();
        assert_eq!(items(res).items().len(), 1);

        assert!(matches!(
            f.catalog
                .dispatch(
                    &reader,
                    Endpoint::ItemsByUser,
                    &json!({"id": bob.user.id, "includes": "user"})
                )
                .await,
            Err(DomainError::Permission(PermissionError::Denied { .. }))
        ));
    }

    #[tokio::test]
    async fn duplicate_names_conflict_per_owner() {
        let f = Fixture::new().await;
        f.create("ann", "desk", 10.0).await;
        f.create("bob", "desk", 10.0).await;
        assert!(matches!(
            f.call(
                Some("ann"),
                Endpoint::CreateItem,
                json!({"item": {"name": "desk", "price": 2}})
            )
            .await,
            Err(DomainError::Conflict { entity: "item", .. })
        ));
    }

    #[tokio::test]
    async fn bulk_without_users_is_limited_to_own_items() {
        let f = Fixture::new().await;
        f.create("ann", "desk", 10.0).await;
        f.create("ann", "lamp", 5.0).await;
        f.create("bob", "desk", 10.0).await;

        let count = batch(
            f.call(
                Some("ann"),
                Endpoint::UpdateItems,
                json!({"item": {"price": {"multiply": 2}}}),
            )
            .await
            .unwrap(),
        );
        assert_eq!(count, 2);

        let removed = batch(
            f.call(
                Some("bob"),
                Endpoint::RemoveItems,
                json!({"items": {"name": "desk"}}),
            )
            .await
            .unwrap(),
        );
        assert_eq!(removed, 1);

        let left = items(
            f.call(Some("ann"), Endpoint::SearchItems, json!({}))
                .await
                .unwrap(),
        );
        let prices: Vec<_> = left
            .items()
            .iter()
            .map(|r| r.item.price.to_string())
            .collect();
        assert_eq!(prices, ["20", "10"]);
    }

    #[tokio::test]
    async fn bulk_update_is_all_or_nothing() {
        let f = Fixture::new().await;
        f.create("ann", "desk", 10.0).await;
        f.create("ann", "lamp", 5.0).await;

        assert!(matches!(
            f.call(
                Some("ann"),
                Endpoint::UpdateItems,
                json!({"item": {"name": "same"}})
            )
            .await,
            Err(DomainError::Conflict { .. })
        ));
        let names: Vec<_> = items(
            f.call(Some("ann"), Endpoint::SearchItems, json!({}))
                .await
                .unwrap(),
        )
        .items()
        .iter()
        .map(|r| r.item.name.clone())
        .collect();
        assert_eq!(names, ["desk", "lamp"]);
    }

    #[tokio::test]
    async fn bulk_with_users_filter_needs_unconditional_grant() {
        let f = Fixture::new().await;
        f.create("ann", "desk", 10.0).await;
        f.create("bob", "desk", 10.0).await;

        let body = json!({"users": {"username": {"in": ["ann", "bob"]}}});
        assert!(matches!(
            f.call(Some("ann"), Endpoint::RemoveItems, body.clone()).await,
            Err(DomainError::Permission(PermissionError::Denied { .. }))
        ));
        assert_eq!(
            batch(
                f.call(Some("admin"), Endpoint::RemoveItems, body)
                    .await
                    .unwrap()
            ),
            2
        );
    }

    #[tokio::test]
    async fn validation_errors_surface_before_authorization() {
        let f = Fixture::new().await;
        assert!(matches!(
            f.call(None, Endpoint::SearchItems, json!({"items": {}})).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn users_search_by_relations() {
        let f = Fixture::new().await;
        f.create("ann", "desk", 10.0).await;
        f.create("bob", "lamp", 3.0).await;

        let by_role = users(
            f.call(
                Some("ann"),
                Endpoint::SearchUsers,
                json!({"roles": {"name": "user"}, "includes": ["roles", "profile"]}),
            )
            .await
            .unwrap(),
        );
        assert_eq!(usernames(&by_role), ["ann", "bob"]);
        let ann = &by_role.items()[0];
        assert_eq!(ann.profile, Some(None));
        assert_eq!(
            ann.roles.as_deref().map(|r| r[0].name),
            Some(RoleName::User)
        );

        let with_lamp = users(
            f.call(
                Some("ann"),
                Endpoint::SearchUsers,
                json!({"items": {"name": {"startsWith": "la"}}, "includes": "items"}),
            )
            .await
            .unwrap(),
        );
        assert_eq!(usernames(&with_lamp), ["bob"]);
        assert_eq!(with_lamp.items()[0].items.as_ref().map(Vec::len), Some(1));

        let without_items = users(
            f.call(
                Some("ann"),
                Endpoint::SearchUsers,
                json!({"items": null, "page": {"size": 10}}),
            )
            .await
            .unwrap(),
        );
        assert_eq!(usernames(&without_items), ["admin", "gus"]);
        assert!(matches!(without_items, UserList::Paged(_, 2)));
    }

    #[tokio::test]
    async fn users_read_requires_read_user() {
        let f = Fixture::new().await;
        assert!(matches!(
            f.call(Some("gus"), Endpoint::GetUser, json!({"id": 1})).await,
            Err(DomainError::Permission(PermissionError::Denied { .. }))
        ));
        let admin = one_user(
            f.call(Some("ann"), Endpoint::GetUser, json!({"id": 1.0}))
                .await
                .unwrap(),
        );
        assert_eq!(admin.user.username, "admin");
        assert!(matches!(
            f.call(Some("ann"), Endpoint::GetUserByName, json!({"username": "zed"}))
                .await,
            Err(DomainError::NotFound { entity: "user" })
        ));
    }

    #[tokio::test]
    async fn admin_creates_users_with_profile_and_roles() {
        let f = Fixture::new().await;
        let body = json!({
            "user": {"username": "cat", "email": "cat@domain", "password": "meow12"},
            "profile": {"name": "Cat"},
            "roles": [{"name": "admin"}],
            "includes": ["profile", "roles"]
        });
        assert!(matches!(
            f.call(Some("ann"), Endpoint::CreateUser, body.clone()).await,
            Err(DomainError::Permission(PermissionError::Denied { .. }))
        ));

        let cat = one_user(
            f.call(Some("admin"), Endpoint::CreateUser, body.clone())
                .await
                .unwrap(),
        );
        assert_eq!(
            cat.profile
                .flatten()
                .and_then(|p| p.name),
            Some("Cat".to_owned())
        );
        assert_eq!(f.repo.roles_of("cat").await.unwrap(), [RoleName::Admin]);
        assert!(verifies(&f.stored_password("cat").await, "meow12"));

        assert!(matches!(
            f.call(Some("admin"), Endpoint::CreateUser, body).await,
            Err(DomainError::Conflict { entity: "user", .. })
        ));
    }

    #[tokio::test]
    async fn set_roles_replaces_adds_and_removes() {
        let f = Fixture::new().await;
        let ann = one_user(
            f.call(Some("ann"), Endpoint::GetUserByName, json!({"username": "ann"}))
                .await
                .unwrap(),
        );
        let id = ann.user.id;

        assert!(matches!(
            f.call(
                Some("ann"),
                Endpoint::SetUserRoles,
                json!({"id": id, "roles": [{"name": "admin"}]})
            )
            .await,
            Err(DomainError::Permission(PermissionError::Denied { .. }))
        ));

        f.call(
            Some("admin"),
            Endpoint::SetUserRoles,
            json!({"id": id, "op": "add", "roles": [{"name": "guest"}]}),
        )
        .await
        .unwrap();
        assert_eq!(
            f.repo.roles_of("ann").await.unwrap(),
            [RoleName::User, RoleName::Guest]
        );

        f.call(
            Some("admin"),
            Endpoint::SetUserRoles,
            json!({"id": id, "op": "remove", "roles": [{"name": "user"}]}),
        )
        .await
        .unwrap();
        assert_eq!(f.repo.roles_of("ann").await.unwrap(), [RoleName::Guest]);

        f.call(
            Some("admin"),
            Endpoint::SetUserRoles,
            json!({"id": id, "roles": [{"name": "admin"}]}),
        )
        .await
        .unwrap();
        assert_eq!(f.repo.roles_of("ann").await.unwrap(), [RoleName::Admin]);

        assert!(matches!(
            f.call(
                Some("admin"),
                Endpoint::SetUserRoles,
                json!({"id": id, "roles": [{"id": 999}]})
            )
            .await,
            Err(DomainError::NotFound { entity: "role" })
        ));
    }

    #[tokio::test]
    async fn reset_password_restores_the_default() {
        let f = Fixture::new().await;
        let bob = one_user(
            f.call(Some("ann"), Endpoint::GetUserByName, json!({"username": "bob"}))
                .await
                .unwrap(),
        );
        assert!(verifies(&f.stored_password("bob").await, "abc123"));

        assert!(matches!(
            f.call(Some("ann"), Endpoint::ResetPassword, json!({"id": bob.user.id}))
                .await,
            Err(DomainError::Permission(PermissionError::Denied { .. }))
        ));
        let res = f
            .call(Some("admin"), Endpoint::ResetPassword, json!({"id": bob.user.id}))
            .await
            .unwrap();
        assert_eq!(res, Response::Users(UserResponse::Empty));
        let stored = f.stored_password("bob").await;
        assert!(verifies(&stored, &PasswordConfig::default().default_password));
        assert!(!verifies(&stored, "abc123"));

        assert!(matches!(
            f.call(Some("admin"), Endpoint::ResetPassword, json!({"id": 999}))
                .await,
            Err(DomainError::NotFound { entity: "user" })
        ));
    }

    #[tokio::test]
    async fn removing_a_user_cascades_to_items_and_links() {
        let f = Fixture::new().await;
        f.create("bob", "lamp", 3.0).await;
        let bob = one_user(
            f.call(Some("ann"), Endpoint::GetUserByName, json!({"username": "bob"}))
                .await
                .unwrap(),
        );
        assert!(matches!(
            f.call(Some("ann"), Endpoint::RemoveUser, json!({"id": bob.user.id}))
                .await,
            Err(DomainError::Permission(_))
        ));
        f.call(Some("admin"), Endpoint::RemoveUser, json!({"id": bob.user.id}))
            .await
            .unwrap();

        let left = items(
            f.call(Some("ann"), Endpoint::SearchItems, json!({}))
                .await
                .unwrap(),
        );
        assert!(left.items().is_empty());
        let members = f
            .call(
                Some("admin"),
                Endpoint::GetRoleByName,
                json!({"name": "user", "includes": "users"}),
            )
            .await
            .unwrap();
        let Response::Roles(RoleResponse::Role(role)) = members else {
            panic!("expected a role");
        };
        let names: Vec<_> = role
            .users
            .unwrap_or_default()
            .into_iter()
            .map(|u| u.username)
            .collect();
        assert_eq!(names, ["ann"]);
    }

    #[tokio::test]
    async fn remove_users_in_bulk_needs_unconditional_delete() {
        let f = Fixture::new().await;
        let body = json!({"users": {"email": {"endsWith": "@domain"}}});
        assert!(matches!(
            f.call(Some("ann"), Endpoint::RemoveUsers, body.clone()).await,
            Err(DomainError::Permission(PermissionError::Denied { .. }))
        ));
        assert_eq!(
            batch(
                f.call(Some("admin"), Endpoint::RemoveUsers, body)
                    .await
                    .unwrap()
            ),
            4
        );
    }

    #[tokio::test]
    async fn roles_are_visible_to_admins_only() {
        let f = Fixture::new().await;
        assert!(matches!(
            f.call(Some("ann"), Endpoint::SearchRoles, json!({})).await,
            Err(DomainError::Permission(PermissionError::Denied { .. }))
        ));

        let res = f
            .call(
                Some("admin"),
                Endpoint::SearchRoles,
                json!({"users": {"username": "gus"}, "page": {}}),
            )
            .await
            .unwrap();
        let Response::Roles(RoleResponse::Roles(RoleList::Paged(roles, total))) = res else {
            panic!("expected a role page");
        };
        assert_eq!(total, 1);
        assert_eq!(roles[0].role.name, RoleName::Guest);

        let unused = f
            .call(Some("admin"), Endpoint::SearchRoles, json!({"users": null}))
            .await
            .unwrap();
        let Response::Roles(RoleResponse::Roles(list)) = unused else {
            panic!("expected roles");
        };
        assert!(list.items().is_empty());

        let admin = f
            .call(Some("admin"), Endpoint::GetRole, json!({"id": 1}))
            .await
            .unwrap();
        let Response::Roles(RoleResponse::Role(admin)) = admin else {
            panic!("expected a role");
        };
        assert_eq!(admin.role.name, RoleName::Admin);
    }

    #[tokio::test]
    async fn closed_database_reports_internal_errors() {
        let f = Fixture::new().await;
        let admin = f.ctx("admin").await;
        f.repo.db().close().await.unwrap();
        assert!(!f.repo.db().is_open());
        assert!(matches!(
            f.catalog
                .dispatch(&admin, Endpoint::SearchItems, &json!({}))
                .await,
            Err(DomainError::Internal(_))
        ));
    }
}
