//! Clubmart Core - Shared domain types library.
//!
//! This crate provides the types shared by every Clubmart component:
//! - `storefront` - REST API server (catalog, products, auth, orders)
//! - `client` - Client-side cart store, session cache and API client
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. Validation rules and catalog query semantics live
//! here so the Postgres store, the in-memory store and the client agree on
//! them.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, emails, prices, roles and statuses
//! - [`product`] - Product records and creator summaries
//! - [`validation`] - Field-level validation of product input
//! - [`catalog`] - Catalog query parsing, filtering, ordering and paging
//! - [`user`] - Public user profile
//! - [`order`] - Orders, line snapshots and shipping info
//! - [`envelope`] - The `{ success, data, message }` API response shape

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod envelope;
pub mod order;
pub mod product;
pub mod types;
pub mod user;
pub mod validation;

pub use catalog::{
    CatalogParams, CatalogQuery, CreatorFilter, Page, PageInfo, SortField, SortOrder,
};
pub use envelope::ApiResponse;
pub use order::{
    CancelRequest, CartLine, CheckoutRequest, Order, OrderItem, OrderLine, PaymentConfirmation,
    ShippingInfo,
};
pub use product::{CreatorSummary, Product};
pub use types::*;
pub use user::PublicUser;
pub use validation::{FieldError, NewProduct, ProductInput, ProductPatch, ValidationErrors};
