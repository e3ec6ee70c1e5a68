//! Checkout route handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use clubmart_core::{
    ApiResponse, CancelRequest, CheckoutRequest, Order, PaymentConfirmation, catalog,
};

use crate::error::{AppError, Result};
use crate::extract::{ApiJson, ApiQuery};
use crate::services::orders::DEFAULT_ORDER_LIMIT;
use crate::state::AppState;

/// Query for `GET /api/orders`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderListParams {
    pub user_id: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

/// `POST /api/orders`
#[instrument(skip(state))]
pub async fn begin(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Order>>)> {
    let order = state.orders().begin(request, Utc::now()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(order, "Order created")),
    ))
}

/// `GET /api/orders?userId=`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<OrderListParams>,
) -> Result<Json<ApiResponse<Vec<Order>>>> {
    let user_id = params
        .user_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("userId is required".to_string()))?;
    let page = catalog::parse_positive(params.page.as_deref(), 1);
    let limit =
        catalog::parse_positive(params.limit.as_deref(), DEFAULT_ORDER_LIMIT).min(catalog::MAX_LIMIT);

    let orders = state.orders().list(user_id, page, limit).await?;
    Ok(Json(ApiResponse::paged(orders.items, orders.info)))
}

/// `GET /api/orders/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Order>>> {
    let order = state.orders().get(&id).await?;
    Ok(Json(ApiResponse::ok(order)))
}

/// `POST /api/orders/{id}/confirm`
#[instrument(skip(state))]
pub async fn confirm(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(confirmation): ApiJson<PaymentConfirmation>,
) -> Result<Json<ApiResponse<Order>>> {
    let order = state
        .orders()
        .confirm(&id, confirmation, Utc::now())
        .await?;
    Ok(Json(ApiResponse::with_message(order, "Payment confirmed")))
}

/// `POST /api/orders/{id}/cancel`
///
/// The body is optional; without a `userId` no ownership check is made.
#[instrument(skip(state))]
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiResponse<Order>>> {
    let request: CancelRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CancelRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::BadRequest(format!("Invalid request body: {e}")))?
    };
    let order = state.orders().cancel(&id, request, Utc::now()).await?;
    Ok(Json(ApiResponse::with_message(order, "Order cancelled")))
}
