//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;

use crate::config::ClubmartConfig;
use crate::db::Store;
use crate::services::{OrderService, UserService};

/// How often stale pending orders are swept.
pub const RECONCILE_INTERVAL: Duration = Duration::from_secs(60);

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// the store and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ClubmartConfig,
    store: Arc<dyn Store>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(config: ClubmartConfig, store: Arc<dyn Store>) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, store }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &ClubmartConfig {
        &self.inner.config
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    /// Checkout service using the configured order TTL.
    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(self.store(), self.inner.config.order_ttl)
    }

    /// Account management, with admin promotion gated like admin signup.
    #[must_use]
    pub fn users(&self) -> UserService<'_> {
        UserService::new(self.store(), self.inner.config.allow_admin_signup)
    }
}

/// Expire stale pending orders now and then every [`RECONCILE_INTERVAL`].
///
/// Sweep failures are logged and retried on the next tick.
pub fn start_order_reconciler(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        // The first tick completes immediately, covering the startup sweep
        let mut interval = tokio::time::interval(RECONCILE_INTERVAL);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = state.orders().reconcile(Utc::now()).await {
                tracing::warn!(error = %e, "Order reconciliation failed");
            }
        }
    })
}
