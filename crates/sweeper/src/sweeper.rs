//! The expiry sweep task.

use std::time::Duration;

use chrono::Utc;
use domain::{Reservation, ReservationStatus};
use store::{Store, StoreError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default sweep interval.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Counters for one sweep cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Holds settled as expired with stock restored.
    pub expired: usize,
    /// Holds a concurrent caller settled first; skipped without credit.
    pub skipped: usize,
    /// Holds whose settlement failed; left for the next cycle.
    pub failed: usize,
}

/// Periodic background task that reclaims expired holds.
pub struct ExpirySweeper<S: Store> {
    store: S,
    interval: Duration,
}

impl<S: Store> ExpirySweeper<S> {
    /// Creates a sweeper with the default 60-second interval.
    pub fn new(store: S) -> Self {
        Self::with_interval(store, DEFAULT_SWEEP_INTERVAL)
    }

    /// Creates a sweeper with a custom interval.
    pub fn with_interval(store: S, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Runs one sweep cycle: every hold still `Reserved` past its TTL is
    /// settled as expired in its own transaction, crediting the stock
    /// back. A failure on one hold is logged and does not abort the rest.
    #[tracing::instrument(skip(self))]
    pub async fn run_once(&self) -> Result<SweepOutcome, StoreError> {
        let stale = self.store.find_expired(Utc::now()).await?;
        let mut outcome = SweepOutcome::default();

        for reservation in stale {
            match self.expire_one(&reservation).await {
                Ok(true) => outcome.expired += 1,
                Ok(false) => outcome.skipped += 1,
                Err(e) => {
                    outcome.failed += 1;
                    tracing::error!(
                        reservation_id = %reservation.reservation_id,
                        sku = %reservation.sku,
                        error = %e,
                        "failed to expire reservation"
                    );
                }
            }
        }

        Ok(outcome)
    }

    /// Settles one hold as expired. Returns false if a concurrent confirm
    /// or cancel won the transition first.
    async fn expire_one(&self, reservation: &Reservation) -> Result<bool, StoreError> {
        let mut tx = self.store.begin().await?;

        match tx
            .transition(
                &reservation.reservation_id,
                ReservationStatus::Reserved,
                ReservationStatus::Expired,
            )
            .await?
        {
            Some(expired) => {
                tx.credit(&expired.sku, expired.quantity).await?;
                tx.commit().await?;
                metrics::counter!("reservations_expired").increment(1);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Spawns the periodic sweep loop.
    ///
    /// The first tick fires immediately, reclaiming holds abandoned before
    /// a restart. The returned handle stops the loop cleanly.
    pub fn spawn(self) -> SweeperHandle
    where
        S: 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let interval = self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = ticker.tick() => match self.run_once().await {
                        Ok(outcome) if outcome != SweepOutcome::default() => {
                            tracing::info!(
                                expired = outcome.expired,
                                skipped = outcome.skipped,
                                failed = outcome.failed,
                                "expiry sweep settled holds"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "expiry sweep failed"),
                    },
                }
            }

            tracing::debug!("expiry sweeper stopped");
        });

        SweeperHandle {
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Handle to a running sweep loop.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals the loop to stop and waits for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;
    use domain::{InventoryItem, Sku};
    use store::{InMemoryStore, InventoryStore, ReservationStore};

    use super::*;

    async fn store_with_stock(sku: &str, total: u32) -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_item(InventoryItem::new(sku, "Widget", total, None).unwrap())
            .await
            .unwrap();
        store
    }

    /// Inserts a hold as the reservation path would: stock debited in the
    /// same transaction, expiry backdated by `minutes_ago`.
    async fn insert_stale_hold(store: &InMemoryStore, sku: &str, key: &str, minutes_ago: i64) -> Reservation {
        let hold = Reservation {
            expires_at: Utc::now() - ChronoDuration::minutes(minutes_ago),
            ..Reservation::new_hold(
                Sku::new(sku),
                "user-1",
                2,
                key,
                ChronoDuration::minutes(5),
            )
        };

        let mut tx = store.begin().await.unwrap();
        tx.try_debit(&hold.sku, hold.quantity).await.unwrap();
        let created = tx.insert_reservation(hold).await.unwrap();
        tx.commit().await.unwrap();
        created
    }

    async fn available(store: &InMemoryStore, sku: &str) -> u32 {
        store
            .find_item(&Sku::new(sku))
            .await
            .unwrap()
            .unwrap()
            .available_quantity
    }

    #[tokio::test]
    async fn sweep_expires_stale_holds_and_restores_stock() {
        let store = store_with_stock("SKU-001", 5).await;
        let stale = insert_stale_hold(&store, "SKU-001", "key-1", 1).await;
        assert_eq!(available(&store, "SKU-001").await, 3);

        let sweeper = ExpirySweeper::new(store.clone());
        let outcome = sweeper.run_once().await.unwrap();

        assert_eq!(outcome, SweepOutcome { expired: 1, skipped: 0, failed: 0 });
        assert_eq!(available(&store, "SKU-001").await, 5);

        let settled = store
            .find_reservation(&stale.reservation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(settled.status, ReservationStatus::Expired);
    }

    #[tokio::test]
    async fn sweep_leaves_fresh_holds_alone() {
        let store = store_with_stock("SKU-001", 5).await;

        let fresh = Reservation::new_hold(
            Sku::new("SKU-001"),
            "user-1",
            2,
            "key-fresh",
            ChronoDuration::minutes(5),
        );
        let mut tx = store.begin().await.unwrap();
        tx.try_debit(&fresh.sku, fresh.quantity).await.unwrap();
        let fresh = tx.insert_reservation(fresh).await.unwrap();
        tx.commit().await.unwrap();

        let sweeper = ExpirySweeper::new(store.clone());
        let outcome = sweeper.run_once().await.unwrap();

        assert_eq!(outcome, SweepOutcome::default());
        assert_eq!(available(&store, "SKU-001").await, 3);
        let untouched = store
            .find_reservation(&fresh.reservation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(untouched.status, ReservationStatus::Reserved);
    }

    #[tokio::test]
    async fn failure_on_one_hold_does_not_abort_the_sweep() {
        let store = store_with_stock("SKU-GOOD", 5).await;
        store
            .insert_item(InventoryItem::new("SKU-GONE", "Phantom", 5, None).unwrap())
            .await
            .unwrap();

        insert_stale_hold(&store, "SKU-GONE", "key-gone", 2).await;
        let good = insert_stale_hold(&store, "SKU-GOOD", "key-good", 1).await;

        // Deleting the item makes the credit for its hold fail.
        store.remove_item(&Sku::new("SKU-GONE")).await.unwrap();

        let sweeper = ExpirySweeper::new(store.clone());
        let outcome = sweeper.run_once().await.unwrap();

        assert_eq!(outcome, SweepOutcome { expired: 1, skipped: 0, failed: 1 });

        // The good hold was settled and credited despite the failure.
        assert_eq!(available(&store, "SKU-GOOD").await, 5);
        let settled = store
            .find_reservation(&good.reservation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(settled.status, ReservationStatus::Expired);
    }

    #[tokio::test]
    async fn failed_settlement_is_rolled_back_for_the_next_cycle() {
        let store = store_with_stock("SKU-GONE", 5).await;
        let stuck = insert_stale_hold(&store, "SKU-GONE", "key-gone", 2).await;
        store.remove_item(&Sku::new("SKU-GONE")).await.unwrap();

        let sweeper = ExpirySweeper::new(store.clone());
        let outcome = sweeper.run_once().await.unwrap();
        assert_eq!(outcome.failed, 1);

        // The transition was rolled back with the failed credit, so the
        // hold is still visible to future sweeps.
        let pending = store
            .find_reservation(&stuck.reservation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pending.status, ReservationStatus::Reserved);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn spawned_sweeper_reclaims_and_shuts_down() {
        let store = store_with_stock("SKU-001", 5).await;
        let stale = insert_stale_hold(&store, "SKU-001", "key-1", 1).await;

        let handle = ExpirySweeper::with_interval(store.clone(), Duration::from_millis(10)).spawn();

        // The first tick fires immediately; give it a moment to settle.
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.shutdown().await;

        assert_eq!(available(&store, "SKU-001").await, 5);
        let settled = store
            .find_reservation(&stale.reservation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(settled.status, ReservationStatus::Expired);
    }
}
