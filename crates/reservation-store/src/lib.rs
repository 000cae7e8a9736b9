//! Storage layer for the storefront reservation core.
//!
//! Holds per-SKU available quantity, shopping sessions with their cart
//! lines, and the reservation ledger. All inventory mutations go through
//! atomic conditional updates; the reconciliation pass runs inside a single
//! transaction so a late failure unwinds earlier steps.

pub mod error;
pub mod ledger;
pub mod memory;
pub mod postgres;
pub mod store;

pub use common::{CheckoutRef, SessionId, SessionToken, Sku};
pub use error::{Result, StoreError};
pub use ledger::{CartLine, ReconcileOutcome, Reservation, ReservationStatus, Session, SweepOutcome};
pub use memory::InMemoryReservationStore;
pub use postgres::PostgresReservationStore;
pub use store::ReservationStore;
