//! Discovery API handlers.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{error, info};

use animerate_core::{CycleOutcome, DiscoveryStatus};

use super::error::{api_error, ApiError};
use crate::state::AppState;

/// Run one discovery cycle now.
///
/// Shares the run guard with the scheduler, so a cycle already in progress
/// yields `{"status": "skipped"}`.
pub async fn run_discovery(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CycleOutcome>, ApiError> {
    let Some(scheduler) = state.discovery() else {
        return Err(api_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "DISCOVERY_DISABLED",
            "No release feed configured",
        ));
    };

    info!("Manual discovery cycle requested");
    match scheduler.pipeline().run_cycle().await {
        Ok(outcome) => Ok(Json(outcome)),
        Err(e) => {
            error!("Manual discovery cycle failed: {}", e);
            Err(api_error(
                StatusCode::BAD_GATEWAY,
                "DISCOVERY_FAILED",
                e.to_string(),
            ))
        }
    }
}

/// Scheduler and cycle state.
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<DiscoveryStatus> {
    Json(
        state
            .discovery()
            .map(|scheduler| scheduler.status())
            .unwrap_or_default(),
    )
}
