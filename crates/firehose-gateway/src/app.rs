use axum::{
    routing::{any, get, post, put},
    Router,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use firehose_core::config::FirehoseConfig;
use firehose_pipeline::{FanoutDispatcher, RateController};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Central shared state: passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: FirehoseConfig,
    pub controller: RateController,
    pub dispatcher: Arc<FanoutDispatcher>,
    /// Open `/stream` sessions: conn_id -> session info.
    pub sessions: DashMap<Uuid, StreamSession>,
    /// Fired on Ctrl-C so held connections let go and the server can drain.
    pub shutdown: CancellationToken,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamSession {
    pub started_at: DateTime<Utc>,
    pub deliveries: u64,
}

impl AppState {
    pub fn new(
        config: FirehoseConfig,
        controller: RateController,
        dispatcher: Arc<FanoutDispatcher>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            controller,
            dispatcher,
            sessions: DashMap::new(),
            shutdown,
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", any(crate::http::stream::stream_handler))
        .route("/stream", any(crate::http::stream::stream_handler))
        .route("/poll", any(crate::http::stream::poll_handler))
        .route("/health", get(crate::http::health::health_handler))
        .route("/sessions", get(crate::http::health::sessions_handler))
        .route("/generator", get(crate::http::generator::status_handler))
        .route("/generator/rate", put(crate::http::generator::set_rate_handler))
        .route("/generator/start", post(crate::http::generator::start_handler))
        .route("/generator/stop", post(crate::http::generator::stop_handler))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
