//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`; every error leaves as the JSON envelope
//! `{ "success": false, "message": ..., "errors"?: [...] }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use clubmart_core::{ApiResponse, FieldError, ValidationErrors};

use crate::db::RepositoryError;
use crate::services::{AuthError, OrderError, ProductError, UserError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Product operation failed.
    #[error("Product error: {0}")]
    Product(#[from] ProductError),

    /// Checkout operation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// Account management failed.
    #[error("User error: {0}")]
    User(#[from] UserError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

const INTERNAL_MESSAGE: &str = "Internal server error";
const UNAVAILABLE_MESSAGE: &str = "Service unavailable, please try again later";

fn repository_parts(err: &RepositoryError) -> (StatusCode, String) {
    match err {
        e if e.is_unavailable() => (
            StatusCode::SERVICE_UNAVAILABLE,
            UNAVAILABLE_MESSAGE.to_string(),
        ),
        RepositoryError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
        RepositoryError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            INTERNAL_MESSAGE.to_string(),
        ),
    }
}

fn validation_parts(errors: &ValidationErrors) -> (StatusCode, String, Vec<FieldError>) {
    (
        StatusCode::BAD_REQUEST,
        "Validation failed".to_string(),
        errors.0.clone(),
    )
}

impl AppError {
    /// Status, client-facing message and per-field errors.
    ///
    /// Internal details never reach the message.
    fn parts(&self) -> (StatusCode, String, Vec<FieldError>) {
        let (status, message) = match self {
            Self::Database(err) => repository_parts(err),
            Self::Auth(err) => match err {
                AuthError::Repository(e) => repository_parts(e),
                AuthError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "Invalid email or password".to_string(),
                ),
                AuthError::UserAlreadyExists => (
                    StatusCode::CONFLICT,
                    "An account with this email already exists".to_string(),
                ),
                AuthError::AdminSignupDisabled => (
                    StatusCode::FORBIDDEN,
                    "Admin signup is disabled".to_string(),
                ),
                AuthError::MissingFields(msg) => (StatusCode::BAD_REQUEST, capitalize(msg)),
                AuthError::WeakPassword(msg) => (StatusCode::BAD_REQUEST, capitalize(msg)),
                AuthError::InvalidEmail(e) => (
                    StatusCode::BAD_REQUEST,
                    format!("Invalid email address: {e}"),
                ),
                AuthError::InvalidRole(role) => {
                    (StatusCode::BAD_REQUEST, format!("Unknown user type: {role}"))
                }
                AuthError::PasswordHash => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_MESSAGE.to_string(),
                ),
            },
            Self::Product(err) => match err {
                ProductError::Validation(errors) => return validation_parts(errors),
                ProductError::Repository(e) => repository_parts(e),
                ProductError::NotFound => {
                    (StatusCode::NOT_FOUND, "Product not found".to_string())
                }
                ProductError::InvalidUserId => {
                    (StatusCode::BAD_REQUEST, "Invalid user id".to_string())
                }
                ProductError::NoUpdates => {
                    (StatusCode::BAD_REQUEST, "No data to update".to_string())
                }
                ProductError::Conflict(msg) => (StatusCode::CONFLICT, capitalize(msg)),
            },
            Self::Order(err) => match err {
                OrderError::Validation(errors) => return validation_parts(errors),
                OrderError::Repository(e) => repository_parts(e),
                OrderError::InvalidId(kind) => {
                    (StatusCode::BAD_REQUEST, format!("Invalid {kind} id"))
                }
                OrderError::NotFound => (StatusCode::NOT_FOUND, "Order not found".to_string()),
                OrderError::UserNotFound => {
                    (StatusCode::NOT_FOUND, "User not found".to_string())
                }
                OrderError::Forbidden => (
                    StatusCode::FORBIDDEN,
                    "Order belongs to another user".to_string(),
                ),
                OrderError::NotCancellable(status) => (
                    StatusCode::BAD_REQUEST,
                    format!("Order is already {status}"),
                ),
                OrderError::Conflict(msg) => (StatusCode::CONFLICT, capitalize(msg)),
            },
            Self::User(err) => match err {
                UserError::Validation(errors) => return validation_parts(errors),
                UserError::Repository(e) => repository_parts(e),
                UserError::InvalidId => (StatusCode::BAD_REQUEST, "Invalid user id".to_string()),
                UserError::NotFound => (StatusCode::NOT_FOUND, "User not found".to_string()),
                UserError::NoUpdates => {
                    (StatusCode::BAD_REQUEST, "No data to update".to_string())
                }
                UserError::AdminSignupDisabled => (
                    StatusCode::FORBIDDEN,
                    "Admin signup is disabled".to_string(),
                ),
                UserError::EmailTaken => (
                    StatusCode::CONFLICT,
                    "An account with this email already exists".to_string(),
                ),
                UserError::PasswordHash => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_MESSAGE.to_string(),
                ),
            },
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                INTERNAL_MESSAGE.to_string(),
            ),
        };
        (status, message, Vec::new())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = self.parts();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                status = status.as_u16(),
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(ApiResponse::<()>::failure(message, errors))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product-123".to_string());
        assert_eq!(err.to_string(), "Not found: product-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AuthError::InvalidCredentials.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AuthError::UserAlreadyExists.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(UserError::EmailTaken.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(UserError::AdminSignupDisabled.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(ProductError::NoUpdates.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(OrderError::Forbidden.into()),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(OrderError::Conflict("order is paid".to_string()).into()),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_unavailable_store_is_503() {
        let unavailable = || RepositoryError::Unavailable("down".to_string());
        assert_eq!(
            get_status(AppError::Database(unavailable())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(AuthError::Repository(unavailable()).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            get_status(ProductError::Repository(unavailable()).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let (status, message, _) =
            AppError::Database(RepositoryError::DataCorruption("secret".to_string())).parts();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "Internal server error");
    }

    #[test]
    fn test_validation_errors_are_listed() {
        let mut errors = ValidationErrors::default();
        errors.push("price", "price must not be negative");
        let (status, _, fields) = AppError::from(ProductError::Validation(errors)).parts();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(fields[0].field, "price");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("product id already exists"), "Product id already exists");
        assert_eq!(capitalize(""), "");
    }
}
