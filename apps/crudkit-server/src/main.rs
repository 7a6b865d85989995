#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod config;
mod state;

use anyhow::Context;
use catalog::Endpoint;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{AppConfig, Args, LoggingConfig};
use state::AppState;

fn init_logging(logging: &LoggingConfig, level: Option<&str>) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level.unwrap_or(&logging.level))
            .context("invalid log filter")?,
    };
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let res = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    res.map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;
    init_logging(&config.logging, args.log_level.as_deref())?;

    if args.check {
        info!("configuration is valid");
        return Ok(());
    }

    let state = AppState::start(&config.catalog()).await?;
    let registry = state.catalog().registry();
    info!(
        endpoints = Endpoint::ALL.iter().filter(|e| registry.contains(**e)).count(),
        default_page_size = registry.limits().default_size,
        max_page_size = registry.limits().max_size,
        database_open = state.repo().db().is_open(),
        "catalog ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("shutdown signal received");
    state.shutdown().await
}
