use common::ReservationId;
use domain::{DomainError, Sku};
use thiserror::Error;

/// Errors that can occur when interacting with the storage layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No inventory item exists with the given SKU.
    #[error("inventory item not found: {0}")]
    SkuNotFound(Sku),

    /// An inventory item with the given SKU already exists.
    #[error("inventory item already exists: {0}")]
    DuplicateSku(Sku),

    /// The conditional stock decrement failed: not enough available stock.
    #[error("insufficient stock for {sku}: requested {requested}, available {available}")]
    InsufficientStock {
        sku: Sku,
        requested: u32,
        available: u32,
    },

    /// No reservation exists with the given ID.
    #[error("reservation not found: {0}")]
    ReservationNotFound(ReservationId),

    /// A reservation with the given idempotency key already exists.
    #[error("idempotency key already in use: {0}")]
    DuplicateIdempotencyKey(String),

    /// A reservation with the given ID already exists.
    #[error("reservation id already in use: {0}")]
    DuplicateReservationId(ReservationId),

    /// A stored row could not be mapped back to a domain record.
    #[error("invalid stored record: {0}")]
    InvalidRecord(String),

    /// Entity validation failed while applying an update.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A database error occurred.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;
