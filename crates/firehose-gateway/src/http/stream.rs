//! Client-facing long-poll endpoints.
//!
//! `/` and `/stream` hold one response open and write a chunk for every
//! result, re-entering the waiting set after each delivery. `/poll` waits for
//! a single result and completes; the client is expected to come back.
//!
//! Each chunk is the result line
//! `crc=<decimal>,mds=<hex md5>,sha1=<hex sha1>` ten times plus a blank line.

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::{convert::Infallible, sync::Arc};
use tracing::{debug, info};
use uuid::Uuid;

use super::{ApiError, ErrorBody};
use crate::app::{AppState, StreamSession};

const CONTENT_TYPE: &str = "text/plain; charset=utf-8";

/// Removes the session entry when the response body is dropped, which is
/// what happens when the client disconnects.
struct SessionGuard {
    state: Arc<AppState>,
    conn_id: Uuid,
}

impl SessionGuard {
    fn record_delivery(&self) {
        if let Some(mut session) = self.state.sessions.get_mut(&self.conn_id) {
            session.deliveries += 1;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some((_, session)) = self.state.sessions.remove(&self.conn_id) {
            info!(conn_id = %self.conn_id, deliveries = session.deliveries, "stream session closed");
        }
    }
}

/// ANY /stream: continuous long-poll on a single streaming response.
pub async fn stream_handler(State(state): State<Arc<AppState>>) -> Response {
    let conn_id = Uuid::new_v4();
    state.sessions.insert(
        conn_id,
        StreamSession {
            started_at: Utc::now(),
            deliveries: 0,
        },
    );
    info!(conn_id = %conn_id, "stream session opened");

    let guard = SessionGuard { state, conn_id };
    let chunks = async_stream::stream! {
        let guard = guard;
        loop {
            let rx = guard.state.dispatcher.register(guard.conn_id);
            let delivery = tokio::select! {
                delivery = rx => delivery.ok(),
                _ = guard.state.shutdown.cancelled() => None,
            };
            match delivery {
                Some(result) => {
                    guard.record_delivery();
                    yield Ok::<_, Infallible>(result.render());
                }
                None => {
                    debug!(conn_id = %guard.conn_id, "stream ended by shutdown");
                    break;
                }
            }
        }
    };

    ([(header::CONTENT_TYPE, CONTENT_TYPE)], Body::from_stream(chunks)).into_response()
}

/// ANY /poll: wait for the next result, answer once.
pub async fn poll_handler(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let rx = state.dispatcher.register(Uuid::new_v4());

    tokio::select! {
        delivery = rx => match delivery {
            Ok(result) => Ok(([(header::CONTENT_TYPE, CONTENT_TYPE)], result.render()).into_response()),
            Err(_) => Err(unavailable("dispatcher closed")),
        },
        _ = state.shutdown.cancelled() => Err(unavailable("server shutting down")),
    }
}

fn unavailable(reason: &str) -> ApiError {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ErrorBody {
            error: reason.to_string(),
            code: "UNAVAILABLE",
        }),
    )
}
