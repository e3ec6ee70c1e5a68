//! Write-side domain types for the storefront.
//!
//! Read models (`Product`, `PublicUser`, `Order`) live in `clubmart-core` so
//! the client can share them. These are the validated inputs handed to the
//! store.

pub mod order;
pub mod user;

pub use order::NewOrder;
pub use user::{NewUser, UserCredentials, UserUpdate};
