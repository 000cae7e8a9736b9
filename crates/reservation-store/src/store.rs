//! The `ReservationStore` trait: the storage contract shared by the
//! Reservation Coordinator and the Expiry Reaper.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::{CheckoutRef, SessionId, SessionToken, Sku};

use crate::Result;
use crate::ledger::{CartLine, ReconcileOutcome, Reservation, Session, SweepOutcome};

/// Storage operations over SKU inventory, shopping sessions, cart lines,
/// and the reservation ledger.
///
/// Implementations must make every inventory mutation atomic under
/// arbitrary concurrent callers for the same SKU: two concurrent
/// decrements of the last unit must not both succeed. `reconcile` is
/// all-or-nothing; a failure leaves both stores untouched.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// Inserts a SKU with its initial available quantity, replacing the
    /// quantity if the SKU already exists.
    async fn insert_sku(&self, sku: &Sku, inventory: u32) -> Result<()>;

    /// Returns the currently available quantity for a SKU, or `None` if
    /// the SKU is unknown.
    ///
    /// "Available" is already net of outstanding PENDING holds: the store
    /// decrements at reservation time, not at confirmation time.
    async fn available(&self, sku: &Sku) -> Result<Option<u32>>;

    /// Atomically subtracts `qty` from the SKU's available quantity.
    ///
    /// Succeeds only if `available >= qty`; otherwise fails with
    /// [`StoreError::InsufficientStock`](crate::StoreError::InsufficientStock)
    /// without mutating anything.
    async fn decrement_available(&self, sku: &Sku, qty: u32) -> Result<()>;

    /// Atomically adds `qty` back to the SKU's available quantity.
    async fn increment_available(&self, sku: &Sku, qty: u32) -> Result<()>;

    /// Looks up a shopping session by its opaque token.
    async fn session_by_token(&self, token: &SessionToken) -> Result<Option<Session>>;

    /// Writes a cart line, creating the shopping session on first cart
    /// interaction. An existing line for the same (session, SKU) pair has
    /// its quantity replaced.
    async fn upsert_cart_line(
        &self,
        token: &SessionToken,
        sku: &Sku,
        qty: u32,
        session_ttl: Duration,
    ) -> Result<Session>;

    /// Removes a cart line if it exists.
    async fn remove_cart_line(&self, token: &SessionToken, sku: &Sku) -> Result<()>;

    /// Returns the session's cart snapshot, ordered by SKU.
    async fn cart_lines(&self, session: SessionId) -> Result<Vec<CartLine>>;

    /// Returns the session's PENDING, non-expired reservations.
    async fn pending_reservations(
        &self,
        session: SessionId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reservation>>;

    /// Reconciles a session's ledger entries against its cart snapshot in
    /// one atomic unit of work.
    ///
    /// For each cart line: creates a PENDING reservation (decrementing
    /// inventory), grows or shrinks an existing one (moving only the
    /// difference), or just refreshes its reference and expiry when the
    /// quantity is unchanged. Holds for SKUs no longer in the cart, and
    /// holds that expired before the sweep reached them, are returned to
    /// inventory and their rows deleted. Any failure rolls back every
    /// mutation made during the call.
    async fn reconcile(
        &self,
        session: SessionId,
        cart: &[CartLine],
        reference: &CheckoutRef,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome>;

    /// Flips all PENDING reservations for a payment reference to
    /// CONFIRMED. Inventory is untouched; it was decremented at
    /// reservation time. Returns the number of rows confirmed.
    async fn confirm_reference(&self, reference: &CheckoutRef) -> Result<u64>;

    /// Releases all PENDING reservations for a payment reference: returns
    /// each hold to inventory and deletes the row. Returns the number of
    /// rows released.
    async fn release_reference(&self, reference: &CheckoutRef) -> Result<u64>;

    /// The expiry sweep: claims every PENDING reservation whose expiry is
    /// at or before `now` via a single conditional update, returns its
    /// quantity to inventory, and deletes the row.
    ///
    /// A row that fails to release is logged and skipped; the sweep
    /// continues. Running the sweep twice with no new expirations is a
    /// no-op.
    async fn release_expired(&self, now: DateTime<Utc>) -> Result<SweepOutcome>;
}
