//! Persistence for the storefront.
//!
//! # Schema: `clubmart`
//!
//! ## Tables
//!
//! - `users` - Accounts (email unique, Argon2 password hash, role)
//! - `products` - Catalog; `created_by` is a weak reference to `users`
//!   (`ON DELETE SET NULL`)
//! - `orders` - Two-phase checkout records with item snapshots (JSONB)
//!
//! # Stores
//!
//! Handlers and services talk to the [`Store`] trait object held in
//! `AppState`. [`PgStore`] is the production implementation;
//! [`MemoryStore`] keeps everything in process and backs the router tests
//! and `CLUBMART_STORE=memory`.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p clubmart-cli -- migrate
//! ```

pub mod memory;
pub mod orders;
pub mod products;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use clubmart_core::{
    CatalogQuery, Email, NewProduct, Order, OrderId, Page, Product, ProductId, ProductPatch,
    PublicUser, UserId,
};

use crate::models::{NewOrder, NewUser, UserCredentials, UserUpdate};

pub use memory::MemoryStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The store cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Whether the error means the store is unreachable rather than the
    /// request being wrong.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_)
                | Self::Database(
                    sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
                )
        )
    }
}

/// Map a unique violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Clamp a page size or offset into the range Postgres accepts.
pub(crate) fn to_i64(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// Account storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user.
    ///
    /// Returns `RepositoryError::Conflict` if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<PublicUser, RepositoryError>;

    /// Get a user by id.
    async fn get_user(&self, id: UserId) -> Result<Option<PublicUser>, RepositoryError>;

    /// Get a user and their password hash by email.
    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<UserCredentials>, RepositoryError>;

    /// All users, newest first.
    async fn list_users(&self, page: u64, limit: u64) -> Result<Page<PublicUser>, RepositoryError>;

    /// Apply a partial update. Returns `None` when the user does not exist.
    ///
    /// Returns `RepositoryError::Conflict` if the new email is taken.
    async fn update_user(
        &self,
        id: UserId,
        update: UserUpdate,
    ) -> Result<Option<PublicUser>, RepositoryError>;

    /// Delete a user, returning what was removed.
    ///
    /// Their products stay in the catalog without a creator; their orders
    /// are deleted with them.
    async fn delete_user(&self, id: UserId) -> Result<Option<PublicUser>, RepositoryError>;
}

/// Catalog storage.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// One page of products matching `query`, creators expanded.
    async fn list_products(&self, query: &CatalogQuery) -> Result<Page<Product>, RepositoryError>;

    /// Get a product by id.
    async fn get_product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Get every listed product that exists; missing ids are skipped.
    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, RepositoryError>;

    /// Insert a product.
    ///
    /// Returns `RepositoryError::Conflict` if the id is taken.
    async fn create_product(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    /// Apply a partial update. Returns `None` when the product does not exist.
    async fn update_product(
        &self,
        id: &ProductId,
        patch: ProductPatch,
    ) -> Result<Option<Product>, RepositoryError>;

    /// Delete a product, returning what was removed.
    async fn delete_product(&self, id: &ProductId) -> Result<Option<Product>, RepositoryError>;
}

/// Checkout order storage.
///
/// Status changes are compare-and-set: they return `None` when the order is
/// missing or not in a state that allows the transition, so two concurrent
/// callers can never both succeed.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert a `pending` order.
    async fn create_order(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    /// Get an order by id.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// A user's orders, newest first.
    async fn list_orders(
        &self,
        user: UserId,
        page: u64,
        limit: u64,
    ) -> Result<Page<Order>, RepositoryError>;

    /// `pending` and unexpired at `now` → `paid`.
    async fn mark_order_paid(
        &self,
        id: OrderId,
        payment_reference: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError>;

    /// `pending` or `paid` → `cancelled`.
    async fn cancel_order(
        &self,
        id: OrderId,
        now: DateTime<Utc>,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Every `pending` order whose expiry is at or before `now` → `expired`.
    /// Returns how many orders changed.
    async fn expire_pending_orders(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

/// Everything the API needs from persistence.
#[async_trait]
pub trait Store: UserStore + ProductStore + OrderStore {
    /// Check that the store is reachable.
    ///
    /// Returns `RepositoryError::Unavailable` otherwise.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

/// `PostgreSQL`-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Wrap an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run the embedded migrations.
///
/// # Errors
///
/// Returns `sqlx::migrate::MigrateError` if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
