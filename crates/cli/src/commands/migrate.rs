//! Database migration command.
//!
//! Applies `crates/storefront/migrations/` (embedded at build time) to the
//! configured database. Already-applied migrations are skipped.

use thiserror::Error;

use clubmart_storefront::db;

use super::{CliError, connect};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] CliError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Run all pending migrations.
pub async fn run() -> Result<(), MigrationError> {
    let (_, store) = connect().await?;

    tracing::info!("Running migrations...");
    db::migrate(store.pool()).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
