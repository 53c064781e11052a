use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::AppState;

/// GET /health: liveness probe, returns server metadata.
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "running": state.controller.state().is_running(),
        "waiting": state.dispatcher.waiting(),
        "sessions": state.sessions.len(),
    }))
}

/// GET /sessions: open streaming sessions and how much each has received.
pub async fn sessions_handler(State(state): State<Arc<AppState>>) -> Json<Value> {
    let sessions: Vec<Value> = state
        .sessions
        .iter()
        .map(|entry| {
            json!({
                "conn_id": entry.key(),
                "started_at": entry.value().started_at,
                "deliveries": entry.value().deliveries,
            })
        })
        .collect();
    Json(json!({ "sessions": sessions }))
}
