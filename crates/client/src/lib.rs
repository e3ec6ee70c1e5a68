//! Clubmart client library.
//!
//! Client-side state and the REST client for the storefront:
//!
//! - [`storage`] - `LocalStorage` backends (memory, files on disk)
//! - [`events`] - Profiles, tabs and their notification channels
//! - [`cart`] - The persisted shopping cart
//! - [`session`] - The cached logged-in user
//! - [`api`] - `reqwest` client for the REST API
//! - [`checkout`] - Begin/complete flow around the hosted payment widget
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use clubmart_client::{ApiClient, CartStore, FileStorage, Profile, SessionCache};
//!
//! let profile = Profile::new(Arc::new(FileStorage::open("~/.clubmart")?));
//! let tab = profile.open_tab();
//! let api = ApiClient::new("http://localhost:5000")?;
//!
//! let cart = CartStore::new(&tab);
//! let session = SessionCache::new(&tab, Arc::new(api.clone()));
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod error;
pub mod events;
pub mod session;
pub mod storage;

pub use api::{ApiClient, Credentials, DeletedProduct, HealthReport, Registration};
pub use cart::{CartError, CartStore};
pub use checkout::Checkout;
pub use error::ClientError;
pub use events::{AppEvent, Profile, StorageChanges, StorageEvent, Tab, TabId};
pub use session::{AuthBackend, SessionCache};
pub use storage::{FileStorage, LocalStorage, MemoryStorage, StorageError};
