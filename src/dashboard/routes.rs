//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is the shared engine handle.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::engine::SwapEngine;
use crate::types::EngineStatus;

/// Shared state accessible by all route handlers.
pub type AppState = Arc<SwapEngine>;

/// Default number of log lines returned by `/api/logs`.
pub const DEFAULT_LOG_LIMIT: usize = 100;

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    /// Entries recorded since startup.
    pub total: usize,
    /// Most recent lines, oldest first.
    pub lines: Vec<String>,
}

/// GET /api/status
pub async fn get_status(State(engine): State<AppState>) -> Json<EngineStatus> {
    Json(engine.status())
}

/// GET /api/logs?limit=N
pub async fn get_logs(
    State(engine): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Json<LogsResponse> {
    let log = engine.activity();
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    Json(LogsResponse {
        total: log.len(),
        lines: log.recent(limit),
    })
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}
