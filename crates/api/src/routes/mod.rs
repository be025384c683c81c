//! Route handlers and their request/response types.

pub mod admin;
pub mod checkout;
pub mod health;
pub mod inventory;
pub mod metrics;

use domain::Reservation;
use serde::Serialize;

/// Response body for any endpoint returning a reservation.
#[derive(Serialize)]
pub struct ReservationResponse {
    pub reservation_id: String,
    pub sku: String,
    pub user_id: String,
    pub quantity: u32,
    pub status: String,
    pub expires_at: String,
    pub idempotency_key: String,
    pub created_at: String,
}

impl From<Reservation> for ReservationResponse {
    fn from(r: Reservation) -> Self {
        Self {
            reservation_id: r.reservation_id.to_string(),
            sku: r.sku.to_string(),
            user_id: r.user_id,
            quantity: r.quantity,
            status: r.status.to_string(),
            expires_at: r.expires_at.to_rfc3339(),
            idempotency_key: r.idempotency_key,
            created_at: r.created_at.to_rfc3339(),
        }
    }
}
