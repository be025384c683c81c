use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::ReservationId;
use domain::{InventoryItem, ItemPatch, Reservation, ReservationStatus, Sku};

use crate::Result;

/// Catalog-side storage operations.
///
/// Each method is individually atomic. Stock adjustments that must be
/// coupled to reservation writes go through [`StoreTx`] instead.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Inserts a new catalog item.
    ///
    /// Fails with `DuplicateSku` if an item with the same SKU exists.
    async fn insert_item(&self, item: InventoryItem) -> Result<InventoryItem>;

    /// Looks up an item by SKU.
    async fn find_item(&self, sku: &Sku) -> Result<Option<InventoryItem>>;

    /// Returns all items, ordered by SKU.
    async fn list_items(&self) -> Result<Vec<InventoryItem>>;

    /// Applies a partial update to an item, re-validating the merged
    /// record, as one atomic read-modify-write.
    async fn update_item(&self, sku: &Sku, patch: &ItemPatch) -> Result<InventoryItem>;

    /// Deletes an item. Fails with `SkuNotFound` if absent.
    async fn remove_item(&self, sku: &Sku) -> Result<()>;
}

/// Reservation-side storage lookups.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Looks up a reservation by ID.
    async fn find_reservation(&self, id: &ReservationId) -> Result<Option<Reservation>>;

    /// Looks up a reservation by its caller-supplied idempotency key.
    async fn find_by_idempotency_key(&self, key: &str) -> Result<Option<Reservation>>;

    /// Returns all holds still in `Reserved` whose TTL elapsed at or
    /// before `cutoff`, ordered by expiry time.
    async fn find_expired(&self, cutoff: DateTime<Utc>) -> Result<Vec<Reservation>>;
}

/// A storage backend offering transactional mutation.
#[async_trait]
pub trait Store: InventoryStore + ReservationStore {
    /// Opens a transaction.
    ///
    /// All writes made through the returned [`StoreTx`] land together on
    /// [`StoreTx::commit`]; dropping the transaction without committing
    /// rolls every one of them back.
    async fn begin(&self) -> Result<Box<dyn StoreTx>>;
}

/// A transaction over both inventory and reservation records.
///
/// Carries the atomic primitives of the reservation lifecycle: the
/// conditional stock decrement that is the authoritative defense against
/// overselling, the unconditional credit that reverses it, the uniqueness-
/// checked reservation insert, and the compare-and-swap status transition
/// that resolves confirm/cancel/sweeper races.
#[async_trait]
pub trait StoreTx: Send {
    /// Decrements `available_quantity` by `quantity` iff enough stock is
    /// available, as a single conditional update.
    ///
    /// Fails with `InsufficientStock` when the condition does not hold and
    /// `SkuNotFound` when the item does not exist.
    async fn try_debit(&mut self, sku: &Sku, quantity: u32) -> Result<InventoryItem>;

    /// Adds `quantity` back to `available_quantity`. Succeeds whenever the
    /// item exists.
    async fn credit(&mut self, sku: &Sku, quantity: u32) -> Result<InventoryItem>;

    /// Inserts a new reservation.
    ///
    /// Fails with `DuplicateIdempotencyKey` or `DuplicateReservationId` on
    /// a uniqueness conflict.
    async fn insert_reservation(&mut self, reservation: Reservation) -> Result<Reservation>;

    /// Reads a reservation inside the transaction.
    async fn find_reservation(&mut self, id: &ReservationId) -> Result<Option<Reservation>>;

    /// Compare-and-swap on the persisted status: sets `next` only if the
    /// stored status still equals `expected`.
    ///
    /// Returns the updated record, or `None` when the stored status no
    /// longer matches (a concurrent caller won the transition). Fails with
    /// `ReservationNotFound` if the reservation does not exist.
    async fn transition(
        &mut self,
        id: &ReservationId,
        expected: ReservationStatus,
        next: ReservationStatus,
    ) -> Result<Option<Reservation>>;

    /// Commits every write made through this transaction.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rolls the transaction back explicitly. Equivalent to dropping it.
    async fn rollback(self: Box<Self>) -> Result<()>;
}
