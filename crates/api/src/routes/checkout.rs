//! Checkout settlement endpoints: confirm and cancel.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use common::ReservationId;
use serde::Deserialize;
use store::Store;

use crate::AppState;
use crate::error::ApiError;

use super::ReservationResponse;

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub reservation_id: String,
}

fn parse_reservation_id(id: &str) -> Result<ReservationId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("invalid reservation_id: {e}")))
}

/// POST /api/v1/checkout/confirm — complete the purchase for a hold.
#[tracing::instrument(skip(state, req))]
pub async fn confirm<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let id = parse_reservation_id(&req.reservation_id)?;
    let reservation = state.checkout.confirm(&id).await?;
    Ok(Json(reservation.into()))
}

/// POST /api/v1/checkout/cancel — release a hold.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S: Store + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CheckoutRequest>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let id = parse_reservation_id(&req.reservation_id)?;
    let reservation = state.checkout.cancel(&id).await?;
    Ok(Json(reservation.into()))
}
