//! CLI command implementations.

pub mod admin;
pub mod migrate;
pub mod orders;
pub mod seed;

use thiserror::Error;

use clubmart_storefront::config::{ClubmartConfig, ConfigError, StoreConfig};
use clubmart_storefront::db::{self, PgStore};

/// Errors shared by every command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// `CLUBMART_STORE=memory` leaves nothing for the CLI to manage.
    #[error("CLUBMART_STORE is memory; CLI commands need a PostgreSQL store")]
    NoDatabase,

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Load configuration from the environment and connect to `PostgreSQL`.
pub async fn connect() -> Result<(ClubmartConfig, PgStore), CliError> {
    let config = ClubmartConfig::from_env()?;
    let StoreConfig::Postgres { database_url } = &config.store else {
        return Err(CliError::NoDatabase);
    };

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(database_url).await?;
    Ok((config, PgStore::new(pool)))
}
