//! Row types for the reservation ledger and its collaborators.

use chrono::{DateTime, Utc};
use common::{CheckoutRef, SessionId, SessionToken, Sku};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a reservation row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// Holding stock, waiting for payment confirmation.
    Pending,
    /// Payment succeeded; the row is a permanent order line.
    Confirmed,
    /// Claimed by the expiry sweep; stock has been returned.
    Expired,
}

impl ReservationStatus {
    /// Returns the storage representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Expired => "EXPIRED",
        }
    }

    /// Parses a status from its storage representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(ReservationStatus::Pending),
            "CONFIRMED" => Some(ReservationStatus::Confirmed),
            "EXPIRED" => Some(ReservationStatus::Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A temporary hold on SKU quantity tied to a shopping session.
///
/// The reservation references its SKU and session by identifier; neither
/// side owns the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: i64,
    pub reference: CheckoutRef,
    pub sku: Sku,
    pub session_id: SessionId,
    pub qty: u32,
    pub status: ReservationStatus,
    pub expires_at: DateTime<Utc>,
}

/// One line of a session's cart snapshot: desired quantity per SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub sku: Sku,
    pub qty: u32,
}

impl CartLine {
    pub fn new(sku: impl Into<Sku>, qty: u32) -> Self {
        Self {
            sku: sku.into(),
            qty,
        }
    }
}

/// A shopping session row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub token: SessionToken,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Returns true if the session itself has expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileOutcome {
    /// Cart lines reserved or adjusted.
    pub reconciled: u32,
    /// Orphaned holds released back to inventory.
    pub released: u32,
}

/// Summary of one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Reservations claimed, restocked, and removed.
    pub released: u64,
    /// Rows that failed to release and were skipped.
    pub failed: u64,
}
