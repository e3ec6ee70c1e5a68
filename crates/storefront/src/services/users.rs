//! Account management.
//!
//! Listing, profile updates and deletion. Account creation goes through
//! [`AuthService::register`](super::AuthService::register) so both entry
//! points apply the same rules.

use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use clubmart_core::{Email, Page, PublicUser, Role, UserId, ValidationErrors};

use super::auth::{AuthError, hash_password, validate_password};
use crate::db::{RepositoryError, Store};
use crate::models::UserUpdate;

/// Errors from account management.
#[derive(Debug, Error)]
pub enum UserError {
    /// The path id was not a well-formed user id.
    #[error("invalid user id")]
    InvalidId,

    /// No user with that id.
    #[error("user not found")]
    NotFound,

    /// The update named no fields.
    #[error("no data to update")]
    NoUpdates,

    /// One or more fields failed validation.
    #[error("invalid profile update")]
    Validation(ValidationErrors),

    /// Granting the admin role is switched off.
    #[error("admin signup is disabled")]
    AdminSignupDisabled,

    /// Another account already uses the email.
    #[error("email already exists")]
    EmailTaken,

    /// Password hashing failed.
    #[error("password hashing error")]
    PasswordHash,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Body of `PUT /api/users/{id}`.
///
/// Blank fields are ignored, except `address`, where an empty string clears
/// the stored address.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub user_type: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl UpdateUserRequest {
    /// Validate every supplied field, reporting all problems at once.
    ///
    /// The password comes back in plain text for the caller to hash.
    fn validate(self) -> Result<(UserUpdate, Option<String>), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        let mut update = UserUpdate::default();

        if let Some(raw) = non_blank(self.email.as_deref()) {
            match Email::parse(raw) {
                Ok(email) => update.email = Some(email),
                Err(e) => errors.push("email", e.to_string()),
            }
        }
        update.name = non_blank(self.name.as_deref()).map(str::to_owned);

        let password = self.password.filter(|p| !p.is_empty());
        if let Some(password) = &password
            && let Err(AuthError::WeakPassword(message)) = validate_password(password)
        {
            errors.push("password", message);
        }

        if let Some(raw) = non_blank(self.user_type.as_deref()) {
            match raw.parse::<Role>() {
                Ok(role) => update.role = Some(role),
                Err(_) => errors.push("user_type", format!("unknown user type: {raw}")),
            }
        }
        update.address = self
            .address
            .map(|a| Some(a.trim().to_owned()).filter(|a| !a.is_empty()));

        if errors.is_empty() {
            Ok((update, password))
        } else {
            Err(errors)
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Account management over a [`Store`].
pub struct UserService<'a> {
    store: &'a dyn Store,
    allow_admin_signup: bool,
}

impl<'a> UserService<'a> {
    /// `allow_admin_signup` also governs promoting an account to admin.
    #[must_use]
    pub const fn new(store: &'a dyn Store, allow_admin_signup: bool) -> Self {
        Self {
            store,
            allow_admin_signup,
        }
    }

    /// One page of accounts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `UserError::Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn list(&self, page: u64, limit: u64) -> Result<Page<PublicUser>, UserError> {
        Ok(self.store.list_users(page, limit).await?)
    }

    /// Fetch one public profile.
    ///
    /// # Errors
    ///
    /// Returns `UserError::InvalidId` for a malformed id and
    /// `UserError::NotFound` if no such user exists.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<PublicUser, UserError> {
        let id = UserId::parse(id).ok_or(UserError::InvalidId)?;
        self.store.get_user(id).await?.ok_or(UserError::NotFound)
    }

    /// Apply a partial profile update.
    ///
    /// A new email is normalized like at registration and a new password is
    /// re-hashed.
    ///
    /// # Errors
    ///
    /// Returns `UserError::Validation` for bad fields, `UserError::NoUpdates`
    /// when nothing was supplied, `UserError::EmailTaken` when the email
    /// belongs to another account and `UserError::NotFound` if the user does
    /// not exist.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: &str,
        request: UpdateUserRequest,
    ) -> Result<PublicUser, UserError> {
        let id = UserId::parse(id).ok_or(UserError::InvalidId)?;
        self.store.ping().await?;

        let (mut update, password) = request.validate().map_err(UserError::Validation)?;
        if update.is_empty() && password.is_none() {
            return Err(UserError::NoUpdates);
        }
        if update.role.is_some_and(Role::is_admin) && !self.allow_admin_signup {
            return Err(UserError::AdminSignupDisabled);
        }
        if let Some(password) = password {
            update.password_hash =
                Some(hash_password(&password).map_err(|_| UserError::PasswordHash)?);
        }

        let user = self
            .store
            .update_user(id, update)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => UserError::EmailTaken,
                other => UserError::Repository(other),
            })?
            .ok_or(UserError::NotFound)?;

        tracing::info!(user_id = %user.id, "User updated");
        Ok(user)
    }

    /// Delete an account. Their products stay listed without a creator.
    ///
    /// # Errors
    ///
    /// Returns `UserError::InvalidId` for a malformed id and
    /// `UserError::NotFound` if no such user exists.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<PublicUser, UserError> {
        let id = UserId::parse(id).ok_or(UserError::InvalidId)?;
        self.store.ping().await?;

        let user = self
            .store
            .delete_user(id)
            .await?
            .ok_or(UserError::NotFound)?;

        tracing::info!(user_id = %user.id, "User deleted");
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, UserStore};
    use crate::services::AuthService;
    use crate::services::auth::{LoginRequest, RegisterRequest};

    async fn register(store: &MemoryStore, email: &str) -> PublicUser {
        AuthService::new(store, false)
            .register(RegisterRequest {
                email: Some(email.to_owned()),
                name: Some("A".to_owned()),
                password: Some("1234".to_owned()),
                ..RegisterRequest::default()
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_update_normalizes_email_and_rehashes_password() {
        let store = MemoryStore::new();
        let user = register(&store, "a@b.com").await;
        let service = UserService::new(&store, false);

        let updated = service
            .update(
                &user.id.to_string(),
                UpdateUserRequest {
                    email: Some("  New@B.com ".to_owned()),
                    password: Some("s3cret".to_owned()),
                    ..UpdateUserRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email.as_str(), "new@b.com");
        assert_eq!(updated.name, "A");

        let credentials = store
            .find_credentials(&updated.email)
            .await
            .unwrap()
            .unwrap();
        assert!(credentials.password_hash.starts_with("$argon2"));

        let auth = AuthService::new(&store, false);
        let login = |password: &str| LoginRequest {
            email: Some("new@b.com".to_owned()),
            password: Some(password.to_owned()),
        };
        assert!(auth.login(login("s3cret")).await.is_ok());
        assert!(matches!(
            auth.login(login("1234")).await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_update_reports_every_bad_field() {
        let store = MemoryStore::new();
        let user = register(&store, "a@b.com").await;

        let err = UserService::new(&store, false)
            .update(
                &user.id.to_string(),
                UpdateUserRequest {
                    email: Some("not-an-email".to_owned()),
                    password: Some("12".to_owned()),
                    user_type: Some("wizard".to_owned()),
                    ..UpdateUserRequest::default()
                },
            )
            .await
            .unwrap_err();
        let UserError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert_eq!(errors.fields(), vec!["email", "password", "user_type"]);
    }

    #[tokio::test]
    async fn test_update_without_fields() {
        let store = MemoryStore::new();
        let user = register(&store, "a@b.com").await;
        let err = UserService::new(&store, false)
            .update(
                &user.id.to_string(),
                UpdateUserRequest {
                    name: Some("   ".to_owned()),
                    ..UpdateUserRequest::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::NoUpdates));
    }

    #[tokio::test]
    async fn test_update_duplicate_email_and_admin_gate() {
        let store = MemoryStore::new();
        let user = register(&store, "a@b.com").await;
        register(&store, "taken@b.com").await;
        let id = user.id.to_string();

        let err = UserService::new(&store, false)
            .update(
                &id,
                UpdateUserRequest {
                    email: Some("TAKEN@b.com".to_owned()),
                    ..UpdateUserRequest::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::EmailTaken));

        let promote = UpdateUserRequest {
            user_type: Some("admin".to_owned()),
            ..UpdateUserRequest::default()
        };
        let err = UserService::new(&store, false)
            .update(&id, promote.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::AdminSignupDisabled));

        let admin = UserService::new(&store, true)
            .update(&id, promote)
            .await
            .unwrap();
        assert!(admin.is_admin());
    }

    #[tokio::test]
    async fn test_empty_address_clears_it() {
        let store = MemoryStore::new();
        let user = register(&store, "a@b.com").await;
        let service = UserService::new(&store, false);
        let id = user.id.to_string();

        let with_address = service
            .update(
                &id,
                UpdateUserRequest {
                    address: Some("Seoul".to_owned()),
                    ..UpdateUserRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(with_address.address.as_deref(), Some("Seoul"));

        let cleared = service
            .update(
                &id,
                UpdateUserRequest {
                    address: Some(String::new()),
                    ..UpdateUserRequest::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.address.is_none());
    }

    #[tokio::test]
    async fn test_delete_and_bad_ids() {
        let store = MemoryStore::new();
        let user = register(&store, "a@b.com").await;
        let service = UserService::new(&store, false);
        let id = user.id.to_string();

        assert_eq!(service.delete(&id).await.unwrap().id, user.id);
        assert!(matches!(service.delete(&id).await, Err(UserError::NotFound)));
        assert!(matches!(service.get(&id).await, Err(UserError::NotFound)));
        assert!(matches!(
            service.delete("not-a-uuid").await,
            Err(UserError::InvalidId)
        ));
        assert!(matches!(
            service
                .update("not-a-uuid", UpdateUserRequest::default())
                .await,
            Err(UserError::InvalidId)
        ));
    }
}
