//! User account handlers.
//!
//! `POST /api/users` is served by [`auth::register`](super::auth::register).

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;
use tracing::instrument;

use clubmart_core::{ApiResponse, PublicUser, catalog};

use crate::error::Result;
use crate::extract::{ApiJson, ApiQuery};
use crate::services::users::UpdateUserRequest;
use crate::state::AppState;

/// Query for `GET /api/users`.
#[derive(Debug, Default, Deserialize)]
pub struct UserListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// `GET /api/users`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<UserListParams>,
) -> Result<Json<ApiResponse<Vec<PublicUser>>>> {
    let page = catalog::parse_positive(params.page.as_deref(), 1);
    let limit = catalog::parse_positive(params.limit.as_deref(), catalog::DEFAULT_LIMIT)
        .min(catalog::MAX_LIMIT);

    let users = state.users().list(page, limit).await?;
    Ok(Json(ApiResponse::paged(users.items, users.info)))
}

/// `GET /api/users/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PublicUser>>> {
    let user = state.users().get(&id).await?;
    Ok(Json(ApiResponse::ok(user)))
}

/// `PUT /api/users/{id}`
#[instrument(skip(state, request))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<PublicUser>>> {
    let user = state.users().update(&id, request).await?;
    Ok(Json(ApiResponse::with_message(user, "User updated")))
}

/// `DELETE /api/users/{id}`
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PublicUser>>> {
    let user = state.users().delete(&id).await?;
    Ok(Json(ApiResponse::with_message(user, "User deleted")))
}
