//! Hold creation and availability endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use domain::Sku;
use serde::Deserialize;
use service::{Availability, HoldRequest};
use store::Store;

use crate::AppState;
use crate::error::ApiError;

use super::ReservationResponse;

#[derive(Deserialize)]
pub struct ReserveRequest {
    pub sku: String,
    pub user_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub idempotency_key: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

/// Extracts the idempotency key; headers take precedence over the body.
fn idempotency_key(headers: &HeaderMap, body_key: Option<String>) -> String {
    headers
        .get("idempotency-key")
        .or_else(|| headers.get("x-idempotency-key"))
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or(body_key)
        .unwrap_or_default()
}

/// POST /api/v1/inventory/reserve — place a hold on an item.
#[tracing::instrument(skip(state, headers, req))]
pub async fn reserve<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    headers: HeaderMap,
    Json(req): Json<ReserveRequest>,
) -> Result<(StatusCode, Json<ReservationResponse>), ApiError> {
    let idempotency_key = idempotency_key(&headers, req.idempotency_key);

    let reservation = state
        .reservations
        .reserve(HoldRequest {
            sku: req.sku,
            user_id: req.user_id,
            quantity: req.quantity,
            idempotency_key,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(reservation.into())))
}

/// GET /api/v1/inventory/:sku — customer-facing availability of an item.
#[tracing::instrument(skip(state))]
pub async fn availability<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(sku): Path<String>,
) -> Result<Json<Availability>, ApiError> {
    let availability = state.catalog.availability(&Sku::new(sku)).await?;
    Ok(Json(availability))
}
