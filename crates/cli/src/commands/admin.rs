//! Admin account management.
//!
//! ```bash
//! clubmart admin create -e admin@example.com -n "Admin Name" -p secret
//! ```
//!
//! Goes through the same validation and hashing as `POST /api/auth/register`,
//! with the admin role allowed regardless of `CLUBMART_ALLOW_ADMIN_SIGNUP`.

use thiserror::Error;

use clubmart_core::UserId;
use clubmart_storefront::services::AuthService;
use clubmart_storefront::services::auth::{AuthError, RegisterRequest};

use super::{CliError, connect};

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error(transparent)]
    Connect(#[from] CliError),

    #[error("Failed to create admin: {0}")]
    Auth(#[from] AuthError),
}

/// Create a new admin account and return its id.
pub async fn create_user(email: &str, name: &str, password: &str) -> Result<UserId, AdminError> {
    let (_, store) = connect().await?;

    let user = AuthService::new(&store, true)
        .register(RegisterRequest {
            email: Some(email.to_owned()),
            name: Some(name.to_owned()),
            password: Some(password.to_owned()),
            user_type: Some("admin".to_owned()),
            address: None,
        })
        .await?;

    tracing::info!(user_id = %user.id, email = %user.email, "Admin user created");
    Ok(user.id)
}
