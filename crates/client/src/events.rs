//! Tabs, profiles and the notifications passed between them.
//!
//! A [`Profile`] is one storage backend shared by any number of [`Tab`]s.
//! Each tab has its own [`AppEvent`] channel for components living in that
//! tab. Writes made through a tab are also announced on the profile's
//! storage-change channel, which every *other* tab observes through
//! [`StorageChanges`].

use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use uuid::Uuid;

use clubmart_core::PublicUser;

use crate::storage::{LocalStorage, MemoryStorage, StorageError};

/// Buffered notifications per channel before slow receivers lag.
pub const EVENT_CAPACITY: usize = 64;

/// Identifies a tab within its profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TabId(Uuid);

/// Same-tab notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    CartUpdated,
    UserLogin(PublicUser),
    UserLogout,
}

/// A value changed in shared storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    /// `None` when the key was removed.
    pub new_value: Option<String>,
    pub origin: TabId,
}

/// Shared storage plus its change channel.
#[derive(Clone)]
pub struct Profile {
    storage: Arc<dyn LocalStorage>,
    changes: broadcast::Sender<StorageEvent>,
}

impl Profile {
    #[must_use]
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        let (changes, _) = broadcast::channel(EVENT_CAPACITY);
        Self { storage, changes }
    }

    /// Profile backed by [`MemoryStorage`].
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Open a new tab over this profile's storage.
    #[must_use]
    pub fn open_tab(&self) -> Tab {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Tab {
            id: TabId(Uuid::new_v4()),
            profile: self.clone(),
            events,
        }
    }
}

/// One independent handle over a profile.
///
/// Cloning a tab yields another handle to the same tab, sharing its id and
/// event channel.
#[derive(Clone)]
pub struct Tab {
    id: TabId,
    profile: Profile,
    events: broadcast::Sender<AppEvent>,
}

impl Tab {
    #[must_use]
    pub const fn id(&self) -> TabId {
        self.id
    }

    /// Receive this tab's [`AppEvent`]s from now on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }

    /// Receive storage changes made by other tabs from now on.
    #[must_use]
    pub fn storage_changes(&self) -> StorageChanges {
        StorageChanges {
            own: self.id,
            rx: self.profile.changes.subscribe(),
        }
    }

    pub(crate) fn emit(&self, event: AppEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub(crate) fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.profile.storage.get(key)
    }

    pub(crate) fn write(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.profile.storage.set(key, &value)?;
        self.announce(key, Some(value));
        Ok(())
    }

    pub(crate) fn erase(&self, key: &str) -> Result<(), StorageError> {
        self.profile.storage.remove(key)?;
        self.announce(key, None);
        Ok(())
    }

    fn announce(&self, key: &str, new_value: Option<String>) {
        let _ = self.profile.changes.send(StorageEvent {
            key: key.to_owned(),
            new_value,
            origin: self.id,
        });
    }
}

/// Storage changes from other tabs of the same profile.
pub struct StorageChanges {
    own: TabId,
    rx: broadcast::Receiver<StorageEvent>,
}

impl StorageChanges {
    /// Next change made by another tab.
    ///
    /// Returns `None` once the profile is gone.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if event.origin == self.own => {}
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Storage change receiver lagged");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next pending change made by another tab, without waiting.
    pub fn try_recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.rx.try_recv() {
                Ok(event) if event.origin == self.own => {}
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Storage change receiver lagged");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}
