//! Manual expiry sweep trigger.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use reservation_store::ReservationStore;
use serde::Serialize;

use super::AppState;
use crate::error::ApiError;

#[derive(Serialize)]
pub struct SweepResponse {
    pub released: u64,
    pub failed: u64,
}

/// GET /api/v1/cron — runs one expiry sweep and reports the counts.
///
/// The background reaper runs the same sweep on its own cadence; this
/// endpoint exists for external schedulers and operational poking.
#[tracing::instrument(skip(state))]
pub async fn sweep<S: ReservationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<SweepResponse>, ApiError> {
    let outcome = state.reaper.sweep().await?;
    Ok(Json(SweepResponse {
        released: outcome.released,
        failed: outcome.failed,
    }))
}
