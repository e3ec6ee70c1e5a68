//! Product records as returned by the catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Email, Price, ProductId, Role, UserId};

/// Public fields of the user who created a product.
///
/// Only the identity fields are exposed; addresses and credentials never
/// leave the user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatorSummary {
    pub id: UserId,
    pub name: String,
    pub email: Email,
    #[serde(rename = "user_type")]
    pub role: Role,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Price,
    pub image: String,
    pub description: String,
    pub link: String,
    pub developer: String,
    /// Creator, if the product was linked to an existing user.
    #[serde(default)]
    pub created_by: Option<CreatorSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Id of the creating user, if any.
    #[must_use]
    pub fn creator_id(&self) -> Option<UserId> {
        self.created_by.as_ref().map(|c| c.id)
    }
}
