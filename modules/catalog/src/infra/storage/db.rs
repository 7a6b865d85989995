//! Connection handle of the catalog database.

use parking_lot::RwLock;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr, SqlErr};
use sea_orm_migration::MigratorTrait;

use crate::config::DatabaseConfig;
use crate::domain::error::DomainError;

use super::migrations::Migrator;

/// Map a database error to an internal domain error.
pub fn db_err(e: DbErr) -> DomainError {
    DomainError::internal(format!("database error: {e}"))
}

/// Like [`db_err`], but unique-constraint violations become
/// [`DomainError::Conflict`] on `entity`.
pub fn write_err(entity: &'static str) -> impl Fn(DbErr) -> DomainError {
    move |e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => DomainError::conflict(entity, detail),
        _ => db_err(e),
    }
}

/// Shared database handle.
///
/// Created closed. [`Db::open`] connects and migrates, [`Db::close`] drops
/// the pool; every query on a closed handle fails with
/// [`DomainError::Internal`].
#[derive(Debug, Default)]
pub struct Db {
    conn: RwLock<Option<DatabaseConnection>>,
}

impl Db {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect and bring the schema up to date. Opening an open handle
    /// replaces its connection.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Internal`] when the connection or a migration
    /// fails.
    pub async fn open(&self, config: &DatabaseConfig) -> Result<(), DomainError> {
        let mut opts = ConnectOptions::new(config.url.clone());
        opts.max_connections(config.max_connections)
            .min_connections(1)
            .sqlx_logging(false);
        let conn = Database::connect(opts).await.map_err(db_err)?;
        Migrator::up(&conn, None).await.map_err(db_err)?;
        let previous = self.conn.write().replace(conn);
        if let Some(previous) = previous {
            previous.close().await.map_err(db_err)?;
        }
        tracing::info!(url = %config.url, "database opened");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`DomainError::Internal`] if the pool fails to shut down.
    pub async fn close(&self) -> Result<(), DomainError> {
        let conn = self.conn.write().take();
        if let Some(conn) = conn {
            conn.close().await.map_err(db_err)?;
            tracing::info!("database closed");
        }
        Ok(())
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.conn.read().is_some()
    }

    /// A handle on the open pool.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::Internal`] when the database is closed.
    pub fn conn(&self) -> Result<DatabaseConnection, DomainError> {
        self.conn
            .read()
            .clone()
            .ok_or_else(|| DomainError::internal("database is closed"))
    }
}
