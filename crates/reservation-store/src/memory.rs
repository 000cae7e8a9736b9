//! In-memory reservation store for tests and local runs.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::{CheckoutRef, SessionId, SessionToken, Sku};
use tokio::sync::RwLock;

use crate::ledger::{
    CartLine, ReconcileOutcome, Reservation, ReservationStatus, Session, SweepOutcome,
};
use crate::store::ReservationStore;
use crate::{Result, StoreError};

#[derive(Debug, Clone, Default)]
struct State {
    inventory: HashMap<Sku, u32>,
    sessions: HashMap<SessionToken, Session>,
    carts: HashMap<SessionId, HashMap<Sku, u32>>,
    reservations: HashMap<i64, Reservation>,
    next_session_id: i64,
    next_reservation_id: i64,
}

impl State {
    fn decrement(&mut self, sku: &Sku, qty: u32) -> Result<()> {
        match self.inventory.get_mut(sku) {
            Some(available) if *available >= qty => {
                *available -= qty;
                Ok(())
            }
            // Unknown SKU and short stock are indistinguishable to callers,
            // matching the conditional UPDATE affecting zero rows.
            _ => Err(StoreError::InsufficientStock { sku: sku.clone() }),
        }
    }

    fn increment(&mut self, sku: &Sku, qty: u32) {
        *self.inventory.entry(sku.clone()).or_insert(0) += qty;
    }
}

/// In-memory reservation store implementation.
///
/// Provides the same semantics as the PostgreSQL implementation, including
/// all-or-nothing reconciliation: the pass mutates a scratch copy of the
/// state and commits it only on success.
#[derive(Clone, Default)]
pub struct InMemoryReservationStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryReservationStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of reservation rows, any status.
    pub async fn reservation_count(&self) -> usize {
        self.state.read().await.reservations.len()
    }

    /// Clears all state.
    pub async fn clear(&self) {
        *self.state.write().await = State::default();
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservationStore {
    async fn insert_sku(&self, sku: &Sku, inventory: u32) -> Result<()> {
        self.state
            .write()
            .await
            .inventory
            .insert(sku.clone(), inventory);
        Ok(())
    }

    async fn available(&self, sku: &Sku) -> Result<Option<u32>> {
        Ok(self.state.read().await.inventory.get(sku).copied())
    }

    async fn decrement_available(&self, sku: &Sku, qty: u32) -> Result<()> {
        self.state.write().await.decrement(sku, qty)
    }

    async fn increment_available(&self, sku: &Sku, qty: u32) -> Result<()> {
        self.state.write().await.increment(sku, qty);
        Ok(())
    }

    async fn session_by_token(&self, token: &SessionToken) -> Result<Option<Session>> {
        Ok(self.state.read().await.sessions.get(token).cloned())
    }

    async fn upsert_cart_line(
        &self,
        token: &SessionToken,
        sku: &Sku,
        qty: u32,
        session_ttl: Duration,
    ) -> Result<Session> {
        let mut state = self.state.write().await;

        let session = match state.sessions.get(token) {
            Some(session) => session.clone(),
            None => {
                state.next_session_id += 1;
                let now = Utc::now();
                let session = Session {
                    id: SessionId::new(state.next_session_id),
                    token: token.clone(),
                    created_at: now,
                    expires_at: now + session_ttl,
                };
                state.sessions.insert(token.clone(), session.clone());
                session
            }
        };

        state
            .carts
            .entry(session.id)
            .or_default()
            .insert(sku.clone(), qty);

        Ok(session)
    }

    async fn remove_cart_line(&self, token: &SessionToken, sku: &Sku) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(session) = state.sessions.get(token).cloned()
            && let Some(cart) = state.carts.get_mut(&session.id)
        {
            cart.remove(sku);
        }
        Ok(())
    }

    async fn cart_lines(&self, session: SessionId) -> Result<Vec<CartLine>> {
        let state = self.state.read().await;
        let mut lines: Vec<CartLine> = state
            .carts
            .get(&session)
            .map(|cart| {
                cart.iter()
                    .map(|(sku, qty)| CartLine::new(sku.clone(), *qty))
                    .collect()
            })
            .unwrap_or_default();
        lines.sort_by(|a, b| a.sku.as_str().cmp(b.sku.as_str()));
        Ok(lines)
    }

    async fn pending_reservations(
        &self,
        session: SessionId,
        now: DateTime<Utc>,
    ) -> Result<Vec<Reservation>> {
        let state = self.state.read().await;
        let mut rows: Vec<Reservation> = state
            .reservations
            .values()
            .filter(|r| {
                r.session_id == session
                    && r.status == ReservationStatus::Pending
                    && r.expires_at > now
            })
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.id);
        Ok(rows)
    }

    async fn reconcile(
        &self,
        session: SessionId,
        cart: &[CartLine],
        reference: &CheckoutRef,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome> {
        let mut state = self.state.write().await;
        let mut scratch = state.clone();
        let mut outcome = ReconcileOutcome::default();

        // Expired holds the sweep has not reached yet: release them here
        // so the cart walk below never duplicates a (sku, session) hold.
        let expired: Vec<i64> = scratch
            .reservations
            .values()
            .filter(|r| {
                r.session_id == session
                    && r.status == ReservationStatus::Pending
                    && r.expires_at <= now
            })
            .map(|r| r.id)
            .collect();
        for id in expired {
            if let Some(row) = scratch.reservations.remove(&id) {
                scratch.increment(&row.sku, row.qty);
                outcome.released += 1;
            }
        }

        // Remaining active holds for the session, keyed by SKU.
        let mut held: HashMap<Sku, (i64, u32)> = scratch
            .reservations
            .values()
            .filter(|r| r.session_id == session && r.status == ReservationStatus::Pending)
            .map(|r| (r.sku.clone(), (r.id, r.qty)))
            .collect();

        for line in cart {
            match held.remove(&line.sku) {
                None => {
                    scratch.decrement(&line.sku, line.qty)?;
                    scratch.next_reservation_id += 1;
                    let id = scratch.next_reservation_id;
                    scratch.reservations.insert(
                        id,
                        Reservation {
                            id,
                            reference: reference.clone(),
                            sku: line.sku.clone(),
                            session_id: session,
                            qty: line.qty,
                            status: ReservationStatus::Pending,
                            expires_at,
                        },
                    );
                }
                Some((id, prior_qty)) => {
                    if line.qty > prior_qty {
                        scratch.decrement(&line.sku, line.qty - prior_qty)?;
                    } else if line.qty < prior_qty {
                        scratch.increment(&line.sku, prior_qty - line.qty);
                    }
                    let row = scratch
                        .reservations
                        .get_mut(&id)
                        .ok_or(StoreError::InsufficientStock {
                            sku: line.sku.clone(),
                        })?;
                    row.qty = line.qty;
                    row.reference = reference.clone();
                    row.expires_at = expires_at;
                }
            }
            outcome.reconciled += 1;
        }

        // SKUs previously held but no longer in the cart.
        for (sku, (id, qty)) in held {
            scratch.increment(&sku, qty);
            scratch.reservations.remove(&id);
            outcome.released += 1;
        }

        *state = scratch;
        Ok(outcome)
    }

    async fn confirm_reference(&self, reference: &CheckoutRef) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut confirmed = 0;
        for row in state.reservations.values_mut() {
            if row.reference == *reference && row.status == ReservationStatus::Pending {
                row.status = ReservationStatus::Confirmed;
                confirmed += 1;
            }
        }
        Ok(confirmed)
    }

    async fn release_reference(&self, reference: &CheckoutRef) -> Result<u64> {
        let mut state = self.state.write().await;
        let ids: Vec<i64> = state
            .reservations
            .values()
            .filter(|r| r.reference == *reference && r.status == ReservationStatus::Pending)
            .map(|r| r.id)
            .collect();

        let mut released = 0;
        for id in ids {
            if let Some(row) = state.reservations.remove(&id) {
                state.increment(&row.sku, row.qty);
                released += 1;
            }
        }
        Ok(released)
    }

    async fn release_expired(&self, now: DateTime<Utc>) -> Result<SweepOutcome> {
        let mut state = self.state.write().await;
        let ids: Vec<i64> = state
            .reservations
            .values()
            .filter(|r| r.status == ReservationStatus::Pending && r.expires_at <= now)
            .map(|r| r.id)
            .collect();

        let mut outcome = SweepOutcome::default();
        for id in ids {
            if let Some(row) = state.reservations.remove(&id) {
                state.increment(&row.sku, row.qty);
                outcome.released += 1;
            }
        }
        Ok(outcome)
    }
}
