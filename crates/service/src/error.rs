//! Service error taxonomy.

use common::ReservationId;
use domain::{DomainError, ReservationStatus, Sku};
use store::StoreError;
use thiserror::Error;

/// Errors surfaced by the reservation, checkout, and catalog services.
///
/// The request layer maps these onto transport codes: validation → 400,
/// not-found → 404, conflicts → 409, lapsed holds → 410, storage → 500.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or missing input; never retried.
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// No inventory item exists with the given SKU.
    #[error("inventory item not found: {0}")]
    ItemNotFound(Sku),

    /// No reservation exists with the given ID.
    #[error("reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    /// Not enough available stock to cover the hold.
    #[error("insufficient stock for {sku}: requested {requested}, available {available}")]
    OutOfStock {
        sku: Sku,
        requested: u32,
        available: u32,
    },

    /// An inventory item with the given SKU already exists.
    #[error("inventory item already exists: {0}")]
    DuplicateItem(Sku),

    /// The reservation settled into a terminal state incompatible with the
    /// request.
    #[error("reservation {id} is no longer active ({status})")]
    NoLongerActive {
        id: ReservationId,
        status: ReservationStatus,
    },

    /// A completed purchase cannot be cancelled.
    #[error("reservation {0} is already confirmed")]
    AlreadyConfirmed(ReservationId),

    /// The hold lapsed before this call; stock has been released.
    #[error("reservation {0} has expired")]
    Expired(ReservationId),

    /// A storage failure; the enclosing transaction was rolled back.
    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::SkuNotFound(sku) => ServiceError::ItemNotFound(sku),
            StoreError::ReservationNotFound(id) => ServiceError::ReservationNotFound(id),
            StoreError::InsufficientStock {
                sku,
                requested,
                available,
            } => ServiceError::OutOfStock {
                sku,
                requested,
                available,
            },
            StoreError::DuplicateSku(sku) => ServiceError::DuplicateItem(sku),
            StoreError::Domain(e) => ServiceError::Validation(e),
            other => ServiceError::Storage(other),
        }
    }
}
