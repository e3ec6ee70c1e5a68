//! Public user profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::product::CreatorSummary;
use crate::types::{Email, Role, UserId};

/// The user fields that may leave the server.
///
/// Carries no password or hash, so it can go into any response or client
/// cache as is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub email: Email,
    pub name: String,
    #[serde(rename = "user_type", default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PublicUser {
    /// Whether this user may manage the catalog.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// The subset embedded in product listings.
    #[must_use]
    pub fn summary(&self) -> CreatorSummary {
        CreatorSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}
