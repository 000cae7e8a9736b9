//! Background release of expired, unconfirmed reservations.

use chrono::Utc;
use reservation_store::{ReservationStore, StoreError, SweepOutcome};
use tokio::time::MissedTickBehavior;

/// Periodically scans the ledger for stale PENDING reservations and
/// returns their quantity to the inventory store.
///
/// Communicates with the ledger only through the store's conditional
/// claim primitive, so a sweep racing a checkout for the same row can
/// never double-act on it.
pub struct ExpiryReaper<S> {
    store: S,
    interval: std::time::Duration,
}

impl<S: ReservationStore> ExpiryReaper<S> {
    /// Creates a reaper that sweeps every `interval`.
    pub fn new(store: S, interval: std::time::Duration) -> Self {
        Self { store, interval }
    }

    /// Runs one sweep. Idempotent: with no new expirations it is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn sweep(&self) -> Result<SweepOutcome, StoreError> {
        let outcome = self.store.release_expired(Utc::now()).await?;
        if outcome.released > 0 || outcome.failed > 0 {
            tracing::info!(
                released = outcome.released,
                failed = outcome.failed,
                "expiry sweep finished"
            );
        }
        metrics::counter!("reaper_reservations_released_total").increment(outcome.released);
        if outcome.failed > 0 {
            metrics::counter!("reaper_release_failures_total").increment(outcome.failed);
        }
        Ok(outcome)
    }

    /// Runs sweeps on a fixed interval until the task is dropped.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.sweep().await {
                tracing::error!(error = %e, "expiry sweep failed");
            }
        }
    }
}
