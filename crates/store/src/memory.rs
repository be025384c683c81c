use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::ReservationId;
use domain::{InventoryItem, ItemPatch, Reservation, ReservationStatus, Sku};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{
    Result, StoreError,
    store::{InventoryStore, ReservationStore, Store, StoreTx},
};

/// In-memory storage backend.
///
/// Backs the single-process binary and the test suites with the same
/// interface as the PostgreSQL implementation. All records live behind one
/// mutex; a transaction holds the lock for its whole lifetime, so
/// transactions serialize and every read observes fully committed state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

#[derive(Debug, Clone, Default)]
struct State {
    items: BTreeMap<String, InventoryItem>,
    reservations: HashMap<ReservationId, Reservation>,
    idempotency_index: HashMap<String, ReservationId>,
}

impl State {
    fn try_debit(&mut self, sku: &Sku, quantity: u32) -> Result<InventoryItem> {
        let item = self
            .items
            .get_mut(sku.as_str())
            .ok_or_else(|| StoreError::SkuNotFound(sku.clone()))?;
        if item.available_quantity < quantity {
            return Err(StoreError::InsufficientStock {
                sku: sku.clone(),
                requested: quantity,
                available: item.available_quantity,
            });
        }
        item.available_quantity -= quantity;
        Ok(item.clone())
    }

    fn credit(&mut self, sku: &Sku, quantity: u32) -> Result<InventoryItem> {
        let item = self
            .items
            .get_mut(sku.as_str())
            .ok_or_else(|| StoreError::SkuNotFound(sku.clone()))?;
        item.available_quantity += quantity;
        Ok(item.clone())
    }

    fn insert_reservation(&mut self, reservation: Reservation) -> Result<Reservation> {
        if self
            .idempotency_index
            .contains_key(&reservation.idempotency_key)
        {
            return Err(StoreError::DuplicateIdempotencyKey(
                reservation.idempotency_key,
            ));
        }
        if self.reservations.contains_key(&reservation.reservation_id) {
            return Err(StoreError::DuplicateReservationId(
                reservation.reservation_id,
            ));
        }
        self.idempotency_index.insert(
            reservation.idempotency_key.clone(),
            reservation.reservation_id,
        );
        self.reservations
            .insert(reservation.reservation_id, reservation.clone());
        Ok(reservation)
    }

    fn transition(
        &mut self,
        id: &ReservationId,
        expected: ReservationStatus,
        next: ReservationStatus,
    ) -> Result<Option<Reservation>> {
        let reservation = self
            .reservations
            .get_mut(id)
            .ok_or(StoreError::ReservationNotFound(*id))?;
        if reservation.status != expected {
            return Ok(None);
        }
        reservation.status = next;
        Ok(Some(reservation.clone()))
    }
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of reservations stored.
    pub async fn reservation_count(&self) -> usize {
        self.state.lock().await.reservations.len()
    }

    /// Clears all items and reservations.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.items.clear();
        state.reservations.clear();
        state.idempotency_index.clear();
    }
}

#[async_trait]
impl InventoryStore for InMemoryStore {
    async fn insert_item(&self, item: InventoryItem) -> Result<InventoryItem> {
        let mut state = self.state.lock().await;
        if state.items.contains_key(item.sku.as_str()) {
            return Err(StoreError::DuplicateSku(item.sku));
        }
        state.items.insert(item.sku.as_str().to_string(), item.clone());
        Ok(item)
    }

    async fn find_item(&self, sku: &Sku) -> Result<Option<InventoryItem>> {
        let state = self.state.lock().await;
        Ok(state.items.get(sku.as_str()).cloned())
    }

    async fn list_items(&self) -> Result<Vec<InventoryItem>> {
        let state = self.state.lock().await;
        Ok(state.items.values().cloned().collect())
    }

    async fn update_item(&self, sku: &Sku, patch: &ItemPatch) -> Result<InventoryItem> {
        let mut state = self.state.lock().await;
        let item = state
            .items
            .get(sku.as_str())
            .ok_or_else(|| StoreError::SkuNotFound(sku.clone()))?;
        let updated = item.apply(patch)?;
        state
            .items
            .insert(sku.as_str().to_string(), updated.clone());
        Ok(updated)
    }

    async fn remove_item(&self, sku: &Sku) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .items
            .remove(sku.as_str())
            .map(|_| ())
            .ok_or_else(|| StoreError::SkuNotFound(sku.clone()))
    }
}

#[async_trait]
impl ReservationStore for InMemoryStore {
    async fn find_reservation(&self, id: &ReservationId) -> Result<Option<Reservation>> {
        let state = self.state.lock().await;
        Ok(state.reservations.get(id).cloned())
    }

    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Reservation>> {
        let state = self.state.lock().await;
        let id = state.idempotency_index.get(key);
        Ok(id.and_then(|id| state.reservations.get(id)).cloned())
    }

    async fn find_expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<Reservation>> {
        let state = self.state.lock().await;
        let mut expired: Vec<_> = state
            .reservations
            .values()
            .filter(|r| r.status == ReservationStatus::Reserved && r.expires_at <= cutoff)
            .cloned()
            .collect();
        expired.sort_by_key(|r| r.expires_at);
        Ok(expired)
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn StoreTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(InMemoryStoreTx {
            guard,
            snapshot: Some(snapshot),
        }))
    }
}

/// Transaction over the in-memory state.
///
/// Holds the state lock for its lifetime and mutates in place; the
/// snapshot taken at `begin` is written back on drop unless the
/// transaction committed.
struct InMemoryStoreTx {
    guard: OwnedMutexGuard<State>,
    snapshot: Option<State>,
}

impl Drop for InMemoryStoreTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[async_trait]
impl StoreTx for InMemoryStoreTx {
    async fn try_debit(&mut self, sku: &Sku, quantity: u32) -> Result<InventoryItem> {
        self.guard.try_debit(sku, quantity)
    }

    async fn credit(&mut self, sku: &Sku, quantity: u32) -> Result<InventoryItem> {
        self.guard.credit(sku, quantity)
    }

    async fn insert_reservation(&mut self, reservation: Reservation) -> Result<Reservation> {
        self.guard.insert_reservation(reservation)
    }

    async fn find_reservation(&mut self, id: &ReservationId) -> Result<Option<Reservation>> {
        Ok(self.guard.reservations.get(id).cloned())
    }

    async fn transition(
        &mut self,
        id: &ReservationId,
        expected: ReservationStatus,
        next: ReservationStatus,
    ) -> Result<Option<Reservation>> {
        self.guard.transition(id, expected, next)
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        self.snapshot = None;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
