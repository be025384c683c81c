//! Service layer: hold creation, checkout, catalog administration.
//!
//! [`ReservationService`] serializes hold creation per SKU and debits stock
//! atomically; [`CheckoutService`] settles holds (confirm/cancel) with
//! lazy expiry; [`InventoryService`] owns catalog administration. All three
//! share a [`store::Store`] backend.

pub mod checkout;
pub mod error;
pub mod inventory;
pub mod lock;
pub mod reservation;

pub use checkout::CheckoutService;
pub use error::ServiceError;
pub use inventory::{Availability, BulkFailure, BulkOutcome, InventoryService, NewItem};
pub use lock::{KeyGuard, KeyedMutex};
pub use reservation::{DEFAULT_HOLD_TTL_SECS, HoldRequest, ReservationService};
