use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use tally_core::{RefreshStats, TransactionRecord};

use super::auth::check_auth;
use super::error::{map_core_error, AppError};
use super::SharedState;

// ==============================================================================
// DTOs
// ==============================================================================

#[derive(Serialize)]
pub(super) struct HistoryResponse {
    count: usize,
    transactions: Vec<TransactionRecord>,
}

#[derive(Serialize)]
pub(super) struct CountResponse {
    count: usize,
}

#[derive(Serialize)]
pub(super) struct StatusResponse {
    count: usize,
    last_refresh: Option<RefreshStats>,
    /// `last_refresh.completed_at` as an RFC 3339 UTC string.
    refreshed_at: Option<String>,
}

// ==============================================================================
// Handlers
// ==============================================================================

pub(super) async fn list_history(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<HistoryResponse>, AppError> {
    check_auth(&state.api_token, &headers)?;

    let transactions = state.history.all().await;
    Ok(Json(HistoryResponse {
        count: transactions.len(),
        transactions,
    }))
}

pub(super) async fn get_count(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<CountResponse>, AppError> {
    check_auth(&state.api_token, &headers)?;
    Ok(Json(CountResponse {
        count: state.history.count().await,
    }))
}

pub(super) async fn get_by_index(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(index): Path<String>,
) -> Result<Json<TransactionRecord>, AppError> {
    check_auth(&state.api_token, &headers)?;

    let index: i64 = index
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid index: {index}")))?;
    state
        .history
        .by_index(index)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no transaction at index {index}")))
}

pub(super) async fn get_by_hash(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Path(hash): Path<String>,
) -> Result<Json<TransactionRecord>, AppError> {
    check_auth(&state.api_token, &headers)?;

    state
        .history
        .by_hash(&hash)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("transaction not found: {hash}")))
}

pub(super) async fn post_refresh(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<RefreshStats>, AppError> {
    check_auth(&state.api_token, &headers)?;

    state
        .history
        .refresh()
        .await
        .map(Json)
        .map_err(map_core_error)
}

pub(super) async fn get_status(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<StatusResponse>, AppError> {
    check_auth(&state.api_token, &headers)?;

    let last_refresh = state.history.last_refresh().await;
    let refreshed_at = last_refresh.and_then(|stats| format_unix(stats.completed_at));
    Ok(Json(StatusResponse {
        count: state.history.count().await,
        last_refresh,
        refreshed_at,
    }))
}

fn format_unix(secs: u64) -> Option<String> {
    let secs = i64::try_from(secs).ok()?;
    OffsetDateTime::from_unix_timestamp(secs)
        .ok()?
        .format(&Rfc3339)
        .ok()
}
