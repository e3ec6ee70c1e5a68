//! Authentication route handlers.
//!
//! Both handlers return the public profile; the client caches it as the
//! current user. There is no server-side session to create or destroy.

use axum::{Json, extract::State, http::StatusCode};
use tracing::instrument;

use clubmart_core::{ApiResponse, PublicUser};

use crate::error::{Result, set_sentry_user};
use crate::extract::ApiJson;
use crate::services::AuthService;
use crate::services::auth::{LoginRequest, RegisterRequest};
use crate::state::AppState;

fn auth_service(state: &AppState) -> AuthService<'_> {
    AuthService::new(state.store(), state.config().allow_admin_signup)
}

/// `POST /api/auth/login`
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<ApiResponse<PublicUser>>> {
    let user = auth_service(&state).login(request).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, "Login succeeded");
    Ok(Json(ApiResponse::with_message(user, "Login successful")))
}

/// `POST /api/auth/register`
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<PublicUser>>)> {
    let user = auth_service(&state).register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(user, "Registration complete")),
    ))
}
