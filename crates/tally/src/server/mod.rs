mod auth;
mod error;
mod history;

use std::sync::Arc;

use axum::routing::{any, get, post};
use axum::{Json, Router};
use tower_http::cors::{AllowOrigin, CorsLayer};

use tally_core::TransactionHistory;

// ==============================================================================
// Application State
// ==============================================================================

pub struct AppState {
    pub history: Arc<TransactionHistory>,
    pub api_token: String,
}

type SharedState = Arc<AppState>;

// ==============================================================================
// Router
// ==============================================================================

pub fn build_router(state: AppState, origin: &str) -> Router {
    // Reflect the allowed origin only on an exact match so browsers get a
    // clean CORS rejection otherwise.
    let allowed: Option<axum::http::HeaderValue> = origin.parse().ok();
    if allowed.is_none() {
        tracing::warn!(origin, "origin is not a valid header value; CORS will reject all origins");
    }
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |request_origin: &axum::http::HeaderValue, _| {
                allowed.as_ref() == Some(request_origin)
            },
        ))
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::HeaderName::from_static("x-api-token"),
        ]);

    let shared = Arc::new(state);

    let public_api = Router::new().route("/api/v1/health", get(health));

    let protected_api = Router::new()
        .route("/api/v1/history", get(history::list_history))
        .route("/api/v1/history/count", get(history::get_count))
        .route("/api/v1/history/status", get(history::get_status))
        .route("/api/v1/history/refresh", post(history::post_refresh))
        .route("/api/v1/history/index/{index}", get(history::get_by_index))
        .route("/api/v1/history/tx/{hash}", get(history::get_by_hash));

    Router::new()
        .merge(public_api)
        .merge(protected_api)
        .route("/api", any(api_not_found))
        .route("/api/{*path}", any(api_not_found))
        .layer(cors)
        .with_state(shared)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn api_not_found() -> error::AppError {
    error::AppError::NotFound("API route not found".to_string())
}
