use crudkit_query::PageLimits;
use serde::{Deserialize, Serialize};

/// Configuration for the catalog module
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    pub page: PageLimits,
    pub seed: SeedConfig,
    pub database: DatabaseConfig,
    pub password: PasswordConfig,
}

/// Data created when the database is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedConfig {
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    #[serde(default = "default_admin_email")]
    pub admin_email: String,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            admin_username: default_admin_username(),
            admin_email: default_admin_email(),
        }
    }
}

/// Connection settings. `SQLite` only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// e.g. `sqlite::memory:` or `sqlite://catalog.db?mode=rwc`
    pub url: String,
    /// An in-memory database lives in a single connection, keep this at 1
    /// for `sqlite::memory:`.
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".to_owned(),
            max_connections: 1,
        }
    }
}

/// Password hashing and the password given to seeded and reset accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordConfig {
    pub default_password: String,
    /// Argon2id memory cost in KiB.
    pub memory_kib: u32,
    pub iterations: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            default_password: "888888".to_owned(),
            memory_kib: 19 * 1024,
            iterations: 2,
        }
    }
}

fn default_admin_username() -> String {
    "admin".to_owned()
}

fn default_admin_email() -> String {
    "admin@domain".to_owned()
}
