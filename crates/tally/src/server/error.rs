use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use tally_core::CoreError;

// ==============================================================================
// Error Type
// ==============================================================================

pub(crate) enum AppError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    BadGateway(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Engine-side failures are upstream problems (502); anything else is ours.
pub(super) fn map_core_error(err: CoreError) -> AppError {
    match err {
        CoreError::Engine(_) | CoreError::InvalidData(_) => {
            AppError::BadGateway(format!("history refresh failed: {err}"))
        }
        CoreError::SnapshotParse(_) | CoreError::Io(_) => AppError::Internal(err.to_string()),
    }
}
