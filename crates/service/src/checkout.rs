//! Hold settlement: confirm and cancel with lazy expiry.

use chrono::Utc;
use common::ReservationId;
use domain::{Reservation, ReservationStatus};
use store::Store;

use crate::error::ServiceError;

/// Settles holds at the end of checkout.
///
/// Both operations load the hold inside a transaction and settle it with
/// the storage layer's compare-and-swap transition, so a concurrent
/// confirm, cancel, or expiry sweep can never release the same stock
/// twice: exactly one caller wins the transition out of `Reserved`, losers
/// observe the terminal state and act on it.
pub struct CheckoutService<S: Store> {
    store: S,
}

impl<S: Store> CheckoutService<S> {
    /// Creates a checkout service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Confirms a hold, permanently consuming the held stock.
    ///
    /// Idempotent for already-confirmed holds. A hold whose TTL elapsed is
    /// settled as expired, its stock released, and the call fails with
    /// `Expired`.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(&self, id: &ReservationId) -> Result<Reservation, ServiceError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let reservation = tx
            .find_reservation(id)
            .await?
            .ok_or(ServiceError::ReservationNotFound(*id))?;

        match reservation.status {
            ReservationStatus::Confirmed => {
                tx.commit().await?;
                Ok(reservation)
            }
            ReservationStatus::Cancelled | ReservationStatus::Expired => {
                Err(ServiceError::NoLongerActive {
                    id: *id,
                    status: reservation.status,
                })
            }
            ReservationStatus::Reserved if reservation.is_expired(now) => {
                // The hold lapsed before cleanup ran: settle it here,
                // release the stock, and report the hold as gone.
                if let Some(expired) = tx
                    .transition(id, ReservationStatus::Reserved, ReservationStatus::Expired)
                    .await?
                {
                    tx.credit(&expired.sku, expired.quantity).await?;
                    tx.commit().await?;
                    metrics::counter!("reservations_expired").increment(1);
                }
                Err(ServiceError::Expired(*id))
            }
            ReservationStatus::Reserved => {
                match tx
                    .transition(id, ReservationStatus::Reserved, ReservationStatus::Confirmed)
                    .await?
                {
                    Some(confirmed) => {
                        // No stock movement: the debit happened at
                        // reservation time.
                        tx.commit().await?;
                        metrics::counter!("reservations_confirmed").increment(1);
                        Ok(confirmed)
                    }
                    None => {
                        // A concurrent settler won the transition; resolve
                        // from the state it left behind, without crediting.
                        let current = tx
                            .find_reservation(id)
                            .await?
                            .ok_or(ServiceError::ReservationNotFound(*id))?;
                        match current.status {
                            ReservationStatus::Confirmed => {
                                tx.commit().await?;
                                Ok(current)
                            }
                            status => Err(ServiceError::NoLongerActive { id: *id, status }),
                        }
                    }
                }
            }
        }
    }

    /// Cancels a hold, releasing the held stock.
    ///
    /// Idempotent for holds already released (`Cancelled` or `Expired`).
    /// Fails with a conflict for confirmed holds. A hold past its TTL is
    /// settled as `Expired` rather than `Cancelled`.
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, id: &ReservationId) -> Result<Reservation, ServiceError> {
        let now = Utc::now();
        let mut tx = self.store.begin().await?;
        let reservation = tx
            .find_reservation(id)
            .await?
            .ok_or(ServiceError::ReservationNotFound(*id))?;

        match reservation.status {
            ReservationStatus::Cancelled | ReservationStatus::Expired => {
                tx.commit().await?;
                Ok(reservation)
            }
            ReservationStatus::Confirmed => Err(ServiceError::AlreadyConfirmed(*id)),
            ReservationStatus::Reserved => {
                let next = if reservation.is_expired(now) {
                    ReservationStatus::Expired
                } else {
                    ReservationStatus::Cancelled
                };

                match tx
                    .transition(id, ReservationStatus::Reserved, next)
                    .await?
                {
                    Some(settled) => {
                        tx.credit(&settled.sku, settled.quantity).await?;
                        tx.commit().await?;
                        match next {
                            ReservationStatus::Expired => {
                                metrics::counter!("reservations_expired").increment(1);
                            }
                            _ => {
                                metrics::counter!("reservations_cancelled").increment(1);
                            }
                        }
                        Ok(settled)
                    }
                    None => {
                        // A concurrent settler won; it already released the
                        // stock if release was due.
                        let current = tx
                            .find_reservation(id)
                            .await?
                            .ok_or(ServiceError::ReservationNotFound(*id))?;
                        match current.status {
                            ReservationStatus::Cancelled | ReservationStatus::Expired => {
                                tx.commit().await?;
                                Ok(current)
                            }
                            _ => Err(ServiceError::AlreadyConfirmed(*id)),
                        }
                    }
                }
            }
        }
    }
}
