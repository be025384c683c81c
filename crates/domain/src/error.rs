//! Domain validation errors.

use thiserror::Error;

/// Errors raised when constructing or mutating domain entities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    /// A required string field was missing or blank.
    #[error("{field} must not be empty")]
    EmptyField { field: &'static str },

    /// A reservation quantity of zero was requested.
    #[error("quantity must be a positive integer")]
    ZeroQuantity,

    /// The available quantity would exceed the total quantity.
    #[error("available quantity {available} cannot exceed total quantity {total}")]
    AvailableExceedsTotal { available: u32, total: u32 },

    /// A partial update carried no fields.
    #[error("at least one field must be provided")]
    EmptyPatch,
}
