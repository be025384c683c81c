//! Catalog administration endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{InventoryItem, ItemPatch, Sku};
use serde::{Deserialize, Serialize};
use service::{BulkOutcome, NewItem};
use store::Store;

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateItemRequest {
    pub sku: String,
    pub product_name: String,
    pub total_quantity: u32,
    pub available_quantity: Option<u32>,
}

impl From<CreateItemRequest> for NewItem {
    fn from(req: CreateItemRequest) -> Self {
        NewItem {
            sku: req.sku,
            product_name: req.product_name,
            total_quantity: req.total_quantity,
            available_quantity: req.available_quantity,
        }
    }
}

#[derive(Deserialize)]
pub struct BulkCreateRequest {
    pub items: Vec<CreateItemRequest>,
}

#[derive(Serialize)]
pub struct ItemResponse {
    pub sku: String,
    pub product_name: String,
    pub total_quantity: u32,
    pub available_quantity: u32,
}

impl From<InventoryItem> for ItemResponse {
    fn from(item: InventoryItem) -> Self {
        Self {
            sku: item.sku.to_string(),
            product_name: item.product_name,
            total_quantity: item.total_quantity,
            available_quantity: item.available_quantity,
        }
    }
}

/// POST /api/v1/admin/inventory — create a catalog item.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let item = state.catalog.create(req.into()).await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

/// POST /api/v1/admin/inventory/bulk — create several items at once.
#[tracing::instrument(skip(state, req))]
pub async fn create_bulk<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<BulkCreateRequest>,
) -> Result<(StatusCode, Json<BulkOutcome>), ApiError> {
    if req.items.is_empty() {
        return Err(ApiError::BadRequest(
            "items array must not be empty".to_string(),
        ));
    }

    let outcome = state
        .catalog
        .create_many(req.items.into_iter().map(Into::into).collect())
        .await;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET /api/v1/admin/inventory — list all catalog items.
#[tracing::instrument(skip(state))]
pub async fn list<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let items = state.catalog.list().await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

/// PUT /api/v1/admin/inventory/:sku — partially update an item.
#[tracing::instrument(skip(state, patch))]
pub async fn update<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(sku): Path<String>,
    Json(patch): Json<ItemPatch>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item = state.catalog.update(&Sku::new(sku), &patch).await?;
    Ok(Json(item.into()))
}

/// DELETE /api/v1/admin/inventory/:sku — delete an item.
#[tracing::instrument(skip(state))]
pub async fn remove<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(sku): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.catalog.delete(&Sku::new(sku)).await?;
    Ok(StatusCode::NO_CONTENT)
}
