//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `auth` - Password registration and login (Argon2)
//! - `products` - Catalog reads and product mutations
//! - `orders` - Two-phase checkout and pending-order reconciliation
//! - `users` - Account listing, profile updates and deletion
//!
//! Services borrow the store from `AppState` for the length of one request.

pub mod auth;
pub mod orders;
pub mod products;
pub mod users;

pub use auth::{AuthError, AuthService};
pub use orders::{OrderError, OrderService};
pub use products::{ProductError, ProductService};
pub use users::{UserError, UserService};
