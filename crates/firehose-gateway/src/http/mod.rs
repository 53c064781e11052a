pub mod generator;
pub mod health;
pub mod stream;

use axum::{http::StatusCode, Json};
use firehose_core::FirehoseError;
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

/// Map a core error onto an HTTP status and JSON error body.
pub fn error_response(err: FirehoseError) -> ApiError {
    let status = match &err {
        FirehoseError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        FirehoseError::Conflict(_) => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
            code: err.code(),
        }),
    )
}
