use std::sync::Arc;

use anyhow::Context;
use catalog::{Catalog, CatalogConfig, SeaOrmCatalogRepository};
use tracing::info;

/// Everything the process serves from, alive from startup until shutdown.
pub struct AppState {
    repo: Arc<SeaOrmCatalogRepository>,
    catalog: Catalog<SeaOrmCatalogRepository>,
}

impl AppState {
    /// Open and seed the database, then build the services over it.
    ///
    /// # Errors
    ///
    /// Fails if the database cannot be opened, migrated or seeded.
    pub async fn start(config: &CatalogConfig) -> anyhow::Result<Self> {
        let repo = SeaOrmCatalogRepository::open(config)
            .await
            .context("failed to open catalog database")?;
        let repo = Arc::new(repo);
        let catalog = Catalog::new(&repo, config.page);
        Ok(Self { repo, catalog })
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog<SeaOrmCatalogRepository> {
        &self.catalog
    }

    #[must_use]
    pub fn repo(&self) -> &Arc<SeaOrmCatalogRepository> {
        &self.repo
    }

    /// Drop the services, then close the database.
    ///
    /// # Errors
    ///
    /// Fails if the connection pool does not shut down cleanly.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        let Self { repo, catalog } = self;
        drop(catalog);
        repo.db()
            .close()
            .await
            .context("failed to close catalog database")?;
        info!("catalog stopped");
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use catalog::{DomainError, Endpoint, PasswordConfig};
    use crudkit_security::SecurityContext;
    use serde_json::json;

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

    #[tokio::test]
    async fn state_serves_until_shutdown() {
        let state = AppState::start(&config()).await.unwrap();
        let admin = SecurityContext::builder()
            .username("admin")
            .roles(state.repo().roles_of("admin").await.unwrap())
            .build();
        let roles = state
            .catalog()
            .dispatch(&admin, Endpoint::SearchRoles, &json!({}))
            .await
            .unwrap();
        assert_eq!(serde_json::to_value(roles).unwrap().as_array().map(Vec::len), Some(3));

        let db = Arc::clone(state.repo().db());
        state.shutdown().await.unwrap();
        assert!(!db.is_open());
        assert!(matches!(db.conn(), Err(DomainError::Internal(_))));
    }

    #[tokio::test]
    async fn unreachable_database_fails_startup() {
        let mut config = config();
        config.database.url = "postgres://nowhere".to_owned();
        assert!(AppState::start(&config).await.is_err());
    }
}
