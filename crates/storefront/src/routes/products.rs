//! Product route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use tracing::instrument;

use clubmart_core::{ApiResponse, CatalogParams, CatalogQuery, Product, ProductInput};

use crate::error::Result;
use crate::extract::{ApiJson, ApiQuery};
use crate::services::ProductService;
use crate::state::AppState;

/// What a delete reports back.
#[derive(Debug, Serialize)]
pub struct DeletedProduct {
    pub id: String,
    pub name: String,
}

/// `GET /api/products`
#[instrument(skip(state))]
pub async fn index(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<CatalogParams>,
) -> Result<Json<ApiResponse<Vec<Product>>>> {
    let query = CatalogQuery::from(&params);
    let page = ProductService::new(state.store()).list(&query).await?;
    Ok(Json(ApiResponse::paged(page.items, page.info)))
}

/// `GET /api/products/user/{user_id}`
#[instrument(skip(state))]
pub async fn by_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ApiQuery(params): ApiQuery<CatalogParams>,
) -> Result<Json<ApiResponse<Vec<Product>>>> {
    let page = ProductService::new(state.store())
        .list_by_creator(&user_id, CatalogQuery::from(&params))
        .await?;
    Ok(Json(ApiResponse::paged(page.items, page.info)))
}

/// `GET /api/products/{id}`
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Product>>> {
    let product = ProductService::new(state.store()).get(&id).await?;
    Ok(Json(ApiResponse::ok(product)))
}

/// `POST /api/products`
#[instrument(skip(state))]
pub async fn create(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<(StatusCode, Json<ApiResponse<Product>>)> {
    let product = ProductService::new(state.store()).create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(product, "Product created")),
    ))
}

/// `PUT /api/products/{id}`
#[instrument(skip(state))]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(input): ApiJson<ProductInput>,
) -> Result<Json<ApiResponse<Product>>> {
    let product = ProductService::new(state.store())
        .update(&id, input)
        .await?;
    Ok(Json(ApiResponse::with_message(product, "Product updated")))
}

/// `DELETE /api/products/{id}`
#[instrument(skip(state))]
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeletedProduct>>> {
    let product = ProductService::new(state.store()).delete(&id).await?;
    Ok(Json(ApiResponse::with_message(
        DeletedProduct {
            id: product.id.into_inner(),
            name: product.name,
        },
        "Product deleted",
    )))
}
