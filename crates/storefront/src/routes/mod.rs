//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /api/health                  - Liveness + store connectivity
//!
//! # Products
//! GET    /api/products                - Filtered, sorted, paged listing
//! POST   /api/products                - Create
//! GET    /api/products/user/{userId}  - Products by creator
//! GET    /api/products/{id}           - Fetch one
//! PUT    /api/products/{id}           - Partial update
//! DELETE /api/products/{id}           - Delete
//!
//! # Auth
//! POST   /api/auth/login              - Password login
//! POST   /api/auth/register           - Create account
//!
//! # Users
//! GET    /api/users                   - Paged account listing
//! POST   /api/users                   - Create account (same as register)
//! GET    /api/users/{id}              - Public profile
//! PUT    /api/users/{id}              - Partial profile update
//! DELETE /api/users/{id}              - Delete account
//!
//! # Orders
//! POST   /api/orders                  - Begin checkout (pending order)
//! GET    /api/orders?userId=          - A user's orders, newest first
//! GET    /api/orders/{id}             - Fetch one
//! POST   /api/orders/{id}/confirm     - Record payment
//! POST   /api/orders/{id}/cancel      - Cancel
//! ```

pub mod auth;
pub mod health;
pub mod orders;
pub mod products;
pub mod users;

use axum::{
    Json, Router,
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};

use clubmart_core::ApiResponse;

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index).post(products::create))
        .route("/user/{user_id}", get(products::by_user))
        .route(
            "/{id}",
            get(products::show)
                .put(products::update)
                .delete(products::delete),
        )
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::index).post(auth::register))
        .route(
            "/{id}",
            get(users::show).put(users::update).delete(users::delete),
        )
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::index).post(orders::begin))
        .route("/{id}", get(orders::show))
        .route("/{id}/confirm", post(orders::confirm))
        .route("/{id}/cancel", post(orders::cancel))
}

/// Service banner at `/`.
async fn root() -> Json<Value> {
    Json(json!({
        "message": "Clubmart API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn not_found() -> (StatusCode, Json<ApiResponse<()>>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiResponse::failure("Route not found", Vec::new())),
    )
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health::health))
        .nest("/api/products", product_routes())
        .nest("/api/auth", auth_routes())
        .nest("/api/users", user_routes())
        .nest("/api/orders", order_routes())
        .fallback(not_found)
}
