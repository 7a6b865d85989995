use std::path::{Path, PathBuf};

use anyhow::{Context, ensure};
use catalog::{CatalogConfig, DatabaseConfig, PasswordConfig, SeedConfig};
use clap::Parser;
use crudkit_query::PageLimits;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};

/// Environment variables with this prefix override file settings,
/// `__` separating nested keys (`CRUDKIT__PAGE__MAX_SIZE=50`).
pub const ENV_PREFIX: &str = "CRUDKIT__";

#[derive(Parser, Debug)]
#[command(name = "crudkit-server", version, about = "crudkit catalog host")]
pub struct Args {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set; overrides `logging.level`
    #[arg(long)]
    pub log_level: Option<String>,

    /// Validate the configuration and exit
    #[arg(long)]
    pub check: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub page: PageLimits,
    pub seed: SeedConfig,
    pub database: DatabaseConfig,
    pub password: PasswordConfig,
}

impl AppConfig {
    /// Defaults, then the YAML file, then `CRUDKIT__*` variables.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// # Errors
    ///
    /// Fails if the file is missing or malformed, carries unknown keys, or
    /// the resulting limits are inconsistent.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = path {
            ensure!(path.is_file(), "config file not found: {}", path.display());
        }
        let config: Self = Self::figment(path)
            .extract()
            .context("failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Fails on zero or inverted page sizes, an empty admin name or database
    /// url, a pool without connections, or a password cost Argon2 refuses.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.page.default_size >= 1, "page.default_size must be at least 1");
        ensure!(
            self.page.default_size <= self.page.max_size,
            "page.default_size ({}) exceeds page.max_size ({})",
            self.page.default_size,
            self.page.max_size
        );
        ensure!(
            !self.seed.admin_username.trim().is_empty(),
            "seed.admin_username must not be empty"
        );
        ensure!(
            !self.database.url.trim().is_empty(),
            "database.url must not be empty"
        );
        ensure!(
            self.database.max_connections >= 1,
            "database.max_connections must be at least 1"
        );
        ensure!(
            self.password.memory_kib >= 8 && self.password.iterations >= 1,
            "password.memory_kib must be at least 8 and password.iterations at least 1"
        );
        Ok(())
    }

    #[must_use]
    pub fn catalog(&self) -> CatalogConfig {
        CatalogConfig {
            page: self.page,
            seed: self.seed.clone(),
            database: self.database.clone(),
            password: self.password.clone(),
        }
    }
}
