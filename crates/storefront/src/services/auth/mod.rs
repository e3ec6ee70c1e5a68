//! Authentication service.
//!
//! Password registration and login. Sessions are not tracked server-side:
//! a successful call returns the public profile and the client caches it.

mod error;

use std::sync::LazyLock;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use tracing::instrument;

use clubmart_core::{Email, PublicUser, Role};

use crate::db::{RepositoryError, Store};
use crate::models::NewUser;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 4;

/// Hash checked when no account matches, so login costs one Argon2
/// verification whether or not the email is registered.
static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("clubmart-no-such-account").ok());

/// Body of `POST /api/auth/login`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Body of `POST /api/auth/register`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterRequest {
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

/// Authentication service.
pub struct AuthService<'a> {
    store: &'a dyn Store,
    allow_admin_signup: bool,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, allow_admin_signup: bool) -> Self {
        Self {
            store,
            allow_admin_signup,
        }
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` if email, name or password is blank.
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::AdminSignupDisabled` for an admin signup while
    /// that is switched off.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip_all, fields(email = ?request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<PublicUser, AuthError> {
        self.store.ping().await?;

        let (Some(email), Some(name), Some(password)) = (
            non_blank(request.email.as_deref()),
            non_blank(request.name.as_deref()),
            request.password.as_deref().filter(|p| !p.is_empty()),
        ) else {
            return Err(AuthError::MissingFields(
                "email, name and password are required",
            ));
        };

        let email = Email::parse(email)?;
        validate_password(password)?;

        let role = match non_blank(request.user_type.as_deref()) {
            None => Role::Customer,
            Some(raw) => raw
                .parse::<Role>()
                .map_err(|_| AuthError::InvalidRole(raw.to_owned()))?,
        };
        if role.is_admin() && !self.allow_admin_signup {
            return Err(AuthError::AdminSignupDisabled);
        }

        let password_hash = hash_password(password)?;

        let user = self
            .store
            .create_user(NewUser {
                email,
                name: name.to_owned(),
                password_hash,
                role,
                address: non_blank(request.address.as_deref()).map(str::to_owned),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFields` if email or password is blank.
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip_all, fields(email = ?request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<PublicUser, AuthError> {
        self.store.ping().await?;

        let (Some(email), Some(password)) = (
            non_blank(request.email.as_deref()),
            request.password.as_deref().filter(|p| !p.is_empty()),
        ) else {
            return Err(AuthError::MissingFields("email and password are required"));
        };

        // Unknown and malformed emails fail the same way
        let credentials = match Email::parse(email) {
            Ok(email) => self.store.find_credentials(&email).await?,
            Err(_) => None,
        };

        let Some(credentials) = credentials else {
            if let Some(hash) = DUMMY_HASH.as_deref() {
                let _ = verify_password(password, hash);
            }
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &credentials.password_hash)?;

        Ok(credentials.user)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}
