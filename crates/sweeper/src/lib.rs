//! Background reclamation of expired holds.
//!
//! The [`ExpirySweeper`] periodically finds holds whose TTL elapsed
//! without a confirm or cancel, settles each one as expired, and restores
//! its stock. It runs concurrently with the request-serving services; the
//! storage layer's compare-and-swap transition guarantees a hold settled
//! by a racing caller is skipped without a second stock credit.

pub mod sweeper;

pub use sweeper::{DEFAULT_SWEEP_INTERVAL, ExpirySweeper, SweepOutcome, SweeperHandle};
