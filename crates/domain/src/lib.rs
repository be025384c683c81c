//! Domain layer: inventory items, reservations, and the hold state machine.

pub mod error;
pub mod item;
pub mod reservation;

pub use common::ReservationId;
pub use error::DomainError;
pub use item::{InventoryItem, ItemPatch, Sku};
pub use reservation::{Reservation, ReservationStatus};
