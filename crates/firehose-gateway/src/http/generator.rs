//! Operator control surface for the rate controller.
//!
//! | Route                    | Effect                                 |
//! |--------------------------|----------------------------------------|
//! | `GET  /generator`        | rate, error count, cursor, phase, ...  |
//! | `PUT  /generator/rate`   | overwrite the target rate              |
//! | `POST /generator/start`  | begin a search (409 while running)     |
//! | `POST /generator/stop`   | request cancellation (409 when idle)   |

use axum::{extract::State, Json};
use firehose_core::FirehoseError;
use firehose_pipeline::controller::ControllerSnapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::{error_response, ApiError};
use crate::app::AppState;

#[derive(Serialize)]
pub struct GeneratorStatus {
    #[serde(flatten)]
    pub controller: ControllerSnapshot,
    pub capacity: usize,
    pub waiting: usize,
}

#[derive(Deserialize)]
pub struct RateUpdate {
    pub rate: u64,
}

fn status(state: &AppState) -> GeneratorStatus {
    GeneratorStatus {
        controller: state.controller.snapshot(),
        capacity: state.controller.gauge().capacity(),
        waiting: state.dispatcher.waiting(),
    }
}

/// GET /generator
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<GeneratorStatus> {
    Json(status(&state))
}

/// PUT /generator/rate: `{"rate": 2048}`.
pub async fn set_rate_handler(
    State(state): State<Arc<AppState>>,
    Json(update): Json<RateUpdate>,
) -> Result<Json<GeneratorStatus>, ApiError> {
    if update.rate == 0 {
        return Err(error_response(FirehoseError::InvalidRequest(
            "rate must be greater than zero".to_string(),
        )));
    }
    state.controller.state().set_target_rate(update.rate);
    info!(rate = update.rate, "target rate set by operator");
    Ok(Json(status(&state)))
}

/// POST /generator/start
pub async fn start_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GeneratorStatus>, ApiError> {
    state
        .controller
        .start()
        .map_err(|e| error_response(e.into()))?;
    Ok(Json(status(&state)))
}

/// POST /generator/stop: returns as soon as cancellation is requested; the
/// run winds down at its next check point.
pub async fn stop_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GeneratorStatus>, ApiError> {
    state
        .controller
        .stop()
        .map_err(|e| error_response(e.into()))?;
    Ok(Json(status(&state)))
}
