//! Inventory items and their catalog-level invariants.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Stock-keeping unit identifier for an inventory item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    /// Creates a new SKU from a string.
    pub fn new(sku: impl Into<String>) -> Self {
        Self(sku.into())
    }

    /// Returns the SKU as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Sku {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Sku {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for Sku {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A catalog item with finite stock.
///
/// `available_quantity` is the portion of `total_quantity` not currently
/// held or sold. The core mutates it only through the storage layer's
/// atomic debit/credit operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub sku: Sku,
    pub product_name: String,
    pub total_quantity: u32,
    pub available_quantity: u32,
}

impl InventoryItem {
    /// Creates a validated catalog item.
    ///
    /// `available_quantity` defaults to `total_quantity` when not given,
    /// and must not exceed it.
    pub fn new(
        sku: impl Into<Sku>,
        product_name: impl Into<String>,
        total_quantity: u32,
        available_quantity: Option<u32>,
    ) -> Result<Self, DomainError> {
        let sku = sku.into();
        let product_name = product_name.into();

        if sku.as_str().trim().is_empty() {
            return Err(DomainError::EmptyField { field: "sku" });
        }
        if product_name.trim().is_empty() {
            return Err(DomainError::EmptyField {
                field: "product_name",
            });
        }

        let available_quantity = available_quantity.unwrap_or(total_quantity);
        if available_quantity > total_quantity {
            return Err(DomainError::AvailableExceedsTotal {
                available: available_quantity,
                total: total_quantity,
            });
        }

        Ok(Self {
            sku,
            product_name,
            total_quantity,
            available_quantity,
        })
    }

    /// Returns a copy with the patch applied, re-validating the
    /// available/total relation on the merged result.
    pub fn apply(&self, patch: &ItemPatch) -> Result<Self, DomainError> {
        let product_name = patch
            .product_name
            .clone()
            .unwrap_or_else(|| self.product_name.clone());
        if product_name.trim().is_empty() {
            return Err(DomainError::EmptyField {
                field: "product_name",
            });
        }

        let total_quantity = patch.total_quantity.unwrap_or(self.total_quantity);
        let available_quantity = patch.available_quantity.unwrap_or(self.available_quantity);
        if available_quantity > total_quantity {
            return Err(DomainError::AvailableExceedsTotal {
                available: available_quantity,
                total: total_quantity,
            });
        }

        Ok(Self {
            sku: self.sku.clone(),
            product_name,
            total_quantity,
            available_quantity,
        })
    }
}

/// Partial update of a catalog item.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemPatch {
    pub product_name: Option<String>,
    pub total_quantity: Option<u32>,
    pub available_quantity: Option<u32>,
}

impl ItemPatch {
    /// Returns true if the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.product_name.is_none()
            && self.total_quantity.is_none()
            && self.available_quantity.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_defaults_to_total() {
        let item = InventoryItem::new("SKU-001", "Widget", 10, None).unwrap();
        assert_eq!(item.available_quantity, 10);
        assert_eq!(item.total_quantity, 10);
    }

    #[test]
    fn available_may_be_below_total() {
        let item = InventoryItem::new("SKU-001", "Widget", 10, Some(4)).unwrap();
        assert_eq!(item.available_quantity, 4);
    }

    #[test]
    fn available_above_total_is_rejected() {
        let err = InventoryItem::new("SKU-001", "Widget", 5, Some(6)).unwrap_err();
        assert_eq!(
            err,
            DomainError::AvailableExceedsTotal {
                available: 6,
                total: 5
            }
        );
    }

    #[test]
    fn blank_sku_is_rejected() {
        let err = InventoryItem::new("  ", "Widget", 5, None).unwrap_err();
        assert_eq!(err, DomainError::EmptyField { field: "sku" });
    }

    #[test]
    fn blank_product_name_is_rejected() {
        let err = InventoryItem::new("SKU-001", "", 5, None).unwrap_err();
        assert_eq!(
            err,
            DomainError::EmptyField {
                field: "product_name"
            }
        );
    }

    #[test]
    fn patch_merges_and_revalidates() {
        let item = InventoryItem::new("SKU-001", "Widget", 10, Some(10)).unwrap();

        let renamed = item
            .apply(&ItemPatch {
                product_name: Some("Widget v2".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(renamed.product_name, "Widget v2");
        assert_eq!(renamed.total_quantity, 10);

        let err = item
            .apply(&ItemPatch {
                total_quantity: Some(5),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::AvailableExceedsTotal {
                available: 10,
                total: 5
            }
        );
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(ItemPatch::default().is_empty());
        assert!(
            !ItemPatch {
                total_quantity: Some(1),
                ..Default::default()
            }
            .is_empty()
        );
    }
}
