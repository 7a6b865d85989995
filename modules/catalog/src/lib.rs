#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Catalog module: users, profiles, roles and items.
//!
//! Request bodies are parsed by the [`domain::registry::ValidatorRegistry`]
//! into tagged [`domain::requests::Request`]s, checked against the caller's
//! ability by the item, user and role services and executed over the
//! repository ports in [`domain::repo`]. [`domain::service::Catalog`] bundles
//! the three services; [`infra::storage::sea_orm_repo::SeaOrmCatalogRepository`]
//! implements the ports over `SQLite`.

pub mod api;
pub mod config;
pub mod domain;
pub mod infra;

pub use api::rest::error::{Problem, domain_error_to_problem};
pub use config::{CatalogConfig, DatabaseConfig, PasswordConfig, SeedConfig};
pub use domain::error::DomainError;
pub use domain::registry::ValidatorRegistry;
pub use domain::requests::{Endpoint, ItemRequest, Request, RoleRequest, UserRequest};
pub use domain::service::{
    Catalog, ItemResponse, ItemsService, Response, RoleResponse, RolesService, UserResponse,
    UsersService,
};
pub use infra::storage::db::Db;
pub use infra::storage::sea_orm_repo::SeaOrmCatalogRepository;
