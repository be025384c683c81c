//! Storage layer for the reservation system.
//!
//! Two backends implement the same traits: [`InMemoryStore`] backs the
//! single-process binary and the test suites, [`PostgresStore`] persists
//! to PostgreSQL. Mutations that must land together (stock debit +
//! reservation insert, status transition + stock credit) run inside a
//! [`StoreTx`] obtained from [`Store::begin`].

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{InventoryStore, ReservationStore, Store, StoreTx};
