//! Hold creation: per-SKU serialization, idempotent retries, atomic debit.

use chrono::Duration;
use domain::{DomainError, Reservation, Sku};
use store::{Store, StoreError};

use crate::error::ServiceError;
use crate::lock::KeyedMutex;

/// Default hold TTL in seconds (5 minutes).
pub const DEFAULT_HOLD_TTL_SECS: i64 = 300;

/// Input for a hold creation request.
#[derive(Debug, Clone)]
pub struct HoldRequest {
    pub sku: String,
    pub user_id: String,
    pub quantity: u32,
    pub idempotency_key: String,
}

impl HoldRequest {
    fn validate(&self) -> Result<(), DomainError> {
        if self.sku.trim().is_empty() {
            return Err(DomainError::EmptyField { field: "sku" });
        }
        if self.user_id.trim().is_empty() {
            return Err(DomainError::EmptyField { field: "user_id" });
        }
        if self.idempotency_key.trim().is_empty() {
            return Err(DomainError::EmptyField {
                field: "idempotency_key",
            });
        }
        if self.quantity == 0 {
            return Err(DomainError::ZeroQuantity);
        }
        Ok(())
    }
}

/// Creates holds on inventory.
///
/// Owns the per-SKU lock registry; hold creation for a given SKU is
/// serialized process-wide, while the storage layer's conditional debit
/// remains the authoritative defense against overselling.
pub struct ReservationService<S: Store> {
    store: S,
    locks: KeyedMutex,
    ttl: Duration,
}

impl<S: Store> ReservationService<S> {
    /// Creates a service with the default 5-minute hold TTL.
    pub fn new(store: S) -> Self {
        Self::with_ttl(store, Duration::seconds(DEFAULT_HOLD_TTL_SECS))
    }

    /// Creates a service with a custom hold TTL.
    pub fn with_ttl(store: S, ttl: Duration) -> Self {
        Self {
            store,
            locks: KeyedMutex::new(),
            ttl,
        }
    }

    /// Places a hold on `quantity` units of the item.
    ///
    /// Exactly one stock debit and one reservation row per successful
    /// call; nothing lands on failure. Retries carrying the same
    /// idempotency key return the original hold without debiting again.
    #[tracing::instrument(skip(self, request), fields(sku = %request.sku, user_id = %request.user_id))]
    pub async fn reserve(&self, request: HoldRequest) -> Result<Reservation, ServiceError> {
        request.validate()?;
        let sku = Sku::new(request.sku.clone());

        // Guard releases on every exit path below.
        let _guard = self.locks.acquire(sku.as_str()).await;

        // Fast path: a retried request returns the original hold unchanged.
        if let Some(existing) = self
            .store
            .find_by_idempotency_key(&request.idempotency_key)
            .await?
        {
            return Ok(existing);
        }

        let mut tx = self.store.begin().await?;

        if let Err(e) = tx.try_debit(&sku, request.quantity).await {
            if matches!(e, StoreError::InsufficientStock { .. }) {
                metrics::counter!("reservations_rejected_out_of_stock").increment(1);
            }
            return Err(e.into());
        }

        let hold = Reservation::new_hold(
            sku,
            request.user_id,
            request.quantity,
            request.idempotency_key.clone(),
            self.ttl,
        );

        match tx.insert_reservation(hold).await {
            Ok(created) => {
                tx.commit().await?;
                metrics::counter!("reservations_created").increment(1);
                Ok(created)
            }
            Err(StoreError::DuplicateIdempotencyKey(key)) => {
                // A racing writer with the same key won between the fast
                // path and the insert. Roll back the debit and resolve by
                // re-reading the winner's record.
                tx.rollback().await?;
                self.store
                    .find_by_idempotency_key(&key)
                    .await?
                    .ok_or(ServiceError::Storage(StoreError::DuplicateIdempotencyKey(
                        key,
                    )))
            }
            Err(e) => Err(e.into()),
        }
    }
}
