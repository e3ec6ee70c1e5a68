//! The logged-in user, cached in profile storage.
//!
//! Stored under `user` as `{"version": 1, "user": {...}}`; a bare user object
//! from older clients is also accepted. Presence of a readable value means
//! logged in. There is no expiry or refresh: the snapshot stays until
//! [`SessionCache::logout`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use clubmart_core::PublicUser;

use crate::api::{Credentials, Registration};
use crate::error::ClientError;
use crate::events::{AppEvent, Tab};
use crate::storage::StorageError;

/// Storage key of the session snapshot.
pub const USER_KEY: &str = "user";

/// Format version written by this client.
pub const SESSION_VERSION: u32 = 1;

/// Where credentials are checked.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Check credentials and return the account.
    async fn login(&self, credentials: &Credentials) -> Result<PublicUser, ClientError>;

    /// Create an account and return it.
    async fn register(&self, registration: &Registration) -> Result<PublicUser, ClientError>;
}

#[derive(Serialize)]
struct SessionDocument<'a> {
    version: u32,
    user: &'a PublicUser,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StoredSession {
    Versioned { version: u32, user: PublicUser },
    Legacy(PublicUser),
}

/// Session operations for one tab.
#[derive(Clone)]
pub struct SessionCache {
    tab: Tab,
    backend: Arc<dyn AuthBackend>,
}

impl SessionCache {
    #[must_use]
    pub fn new(tab: &Tab, backend: Arc<dyn AuthBackend>) -> Self {
        Self {
            tab: tab.clone(),
            backend,
        }
    }

    /// Log in and cache the returned user.
    ///
    /// # Errors
    ///
    /// Returns the backend's error (nothing is cached), or an error if the
    /// snapshot cannot be saved.
    pub async fn login(&self, credentials: &Credentials) -> Result<PublicUser, ClientError> {
        let user = self.backend.login(credentials).await?;
        self.store(&user)?;
        Ok(user)
    }

    /// Register and cache the new user.
    ///
    /// # Errors
    ///
    /// Returns the backend's error (nothing is cached), or an error if the
    /// snapshot cannot be saved.
    pub async fn register(&self, registration: &Registration) -> Result<PublicUser, ClientError> {
        let user = self.backend.register(registration).await?;
        self.store(&user)?;
        Ok(user)
    }

    /// Forget the cached user. No server call is made.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be written.
    pub fn logout(&self) -> Result<(), StorageError> {
        self.tab.erase(USER_KEY)?;
        self.tab.emit(AppEvent::UserLogout);
        Ok(())
    }

    /// The cached user, if any and readable.
    #[must_use]
    pub fn current(&self) -> Option<PublicUser> {
        let raw = match self.tab.read(USER_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read session");
                return None;
            }
        };
        match serde_json::from_str::<StoredSession>(&raw) {
            Ok(StoredSession::Versioned { version, user }) if version == SESSION_VERSION => {
                Some(user)
            }
            Ok(StoredSession::Versioned { version, .. }) => {
                tracing::warn!(version, "Ignoring session with unsupported version");
                None
            }
            Ok(StoredSession::Legacy(user)) => Some(user),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable session");
                None
            }
        }
    }

    /// Whether the cached user may see admin views.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.current().is_some_and(|user| user.is_admin())
    }

    fn store(&self, user: &PublicUser) -> Result<(), ClientError> {
        let raw = serde_json::to_string(&SessionDocument {
            version: SESSION_VERSION,
            user,
        })?;
        self.tab.write(USER_KEY, raw)?;
        self.tab.emit(AppEvent::UserLogin(user.clone()));
        Ok(())
    }
}
