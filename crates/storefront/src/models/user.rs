//! User domain types.

use clubmart_core::{Email, PublicUser, Role};

/// A validated registration, ready to insert.
///
/// The password has already been hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Normalized email address.
    pub email: Email,
    /// Display name (trimmed, non-empty).
    pub name: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Granted role.
    pub role: Role,
    /// Optional free-text address.
    pub address: Option<String>,
}

/// A stored user together with their password hash.
///
/// Only the auth service sees this type; it never reaches a response.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: PublicUser,
    pub password_hash: String,
}

/// A validated partial profile update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub email: Option<Email>,
    pub name: Option<String>,
    /// Argon2 PHC string of the new password.
    pub password_hash: Option<String>,
    pub role: Option<Role>,
    /// `Some(None)` clears the address.
    pub address: Option<Option<String>>,
}

impl UserUpdate {
    /// Whether the update changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.name.is_none()
            && self.password_hash.is_none()
            && self.role.is_none()
            && self.address.is_none()
    }
}
