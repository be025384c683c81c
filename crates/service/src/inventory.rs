//! Catalog administration and availability reads.

use domain::{DomainError, InventoryItem, ItemPatch, Sku};
use serde::Serialize;
use store::Store;

use crate::error::ServiceError;

/// Input for creating a catalog item.
///
/// `available_quantity` defaults to `total_quantity` when omitted.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub sku: String,
    pub product_name: String,
    pub total_quantity: u32,
    pub available_quantity: Option<u32>,
}

/// The customer-facing availability projection of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Availability {
    pub sku: Sku,
    pub product_name: String,
    pub available_quantity: u32,
}

/// Per-item result report for a bulk create.
#[derive(Debug, Default, Serialize)]
pub struct BulkOutcome {
    pub created: Vec<InventoryItem>,
    pub failed: Vec<BulkFailure>,
}

/// A single rejected item in a bulk create.
#[derive(Debug, Serialize)]
pub struct BulkFailure {
    pub sku: String,
    pub error: String,
}

/// Owns catalog administration: create/read/update/delete of items.
///
/// Quantity edits here are validated against the available/total relation
/// but bypass the hold lifecycle; the reservation path never calls these.
pub struct InventoryService<S: Store> {
    store: S,
}

impl<S: Store> InventoryService<S> {
    /// Creates a catalog service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates a new catalog item.
    #[tracing::instrument(skip(self, new_item), fields(sku = %new_item.sku))]
    pub async fn create(&self, new_item: NewItem) -> Result<InventoryItem, ServiceError> {
        let item = InventoryItem::new(
            new_item.sku,
            new_item.product_name,
            new_item.total_quantity,
            new_item.available_quantity,
        )?;
        Ok(self.store.insert_item(item).await?)
    }

    /// Creates several items, reporting per-item outcomes.
    ///
    /// One rejected item does not abort the rest.
    #[tracing::instrument(skip(self, items), fields(count = items.len()))]
    pub async fn create_many(&self, items: Vec<NewItem>) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        for new_item in items {
            let sku = new_item.sku.clone();
            match self.create(new_item).await {
                Ok(item) => outcome.created.push(item),
                Err(e) => outcome.failed.push(BulkFailure {
                    sku,
                    error: e.to_string(),
                }),
            }
        }
        outcome
    }

    /// Loads the full catalog record for a SKU.
    pub async fn get(&self, sku: &Sku) -> Result<InventoryItem, ServiceError> {
        self.store
            .find_item(sku)
            .await?
            .ok_or_else(|| ServiceError::ItemNotFound(sku.clone()))
    }

    /// Returns the customer-facing availability of a SKU.
    pub async fn availability(&self, sku: &Sku) -> Result<Availability, ServiceError> {
        let item = self.get(sku).await?;
        Ok(Availability {
            sku: item.sku,
            product_name: item.product_name,
            available_quantity: item.available_quantity,
        })
    }

    /// Returns all catalog items, ordered by SKU.
    pub async fn list(&self) -> Result<Vec<InventoryItem>, ServiceError> {
        Ok(self.store.list_items().await?)
    }

    /// Applies a partial update to an item.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(&self, sku: &Sku, patch: &ItemPatch) -> Result<InventoryItem, ServiceError> {
        if patch.is_empty() {
            return Err(ServiceError::Validation(DomainError::EmptyPatch));
        }
        Ok(self.store.update_item(sku, patch).await?)
    }

    /// Deletes an item from the catalog.
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, sku: &Sku) -> Result<(), ServiceError> {
        Ok(self.store.remove_item(sku).await?)
    }
}
