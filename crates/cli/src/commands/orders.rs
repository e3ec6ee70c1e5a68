//! Order maintenance.

use chrono::Utc;
use thiserror::Error;

use clubmart_storefront::services::{OrderError, OrderService};

use super::{CliError, connect};

#[derive(Debug, Error)]
pub enum OrdersError {
    #[error(transparent)]
    Connect(#[from] CliError),

    #[error("Reconciliation failed: {0}")]
    Order(#[from] OrderError),
}

/// Expire every pending order whose payment window has passed.
///
/// The server does this every minute; this covers a server that is down.
pub async fn reconcile() -> Result<(), OrdersError> {
    let (config, store) = connect().await?;

    let expired = OrderService::new(&store, config.order_ttl)
        .reconcile(Utc::now())
        .await?;

    tracing::info!(expired, "Reconciliation complete");
    Ok(())
}
