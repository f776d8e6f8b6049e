use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use log_pipeline::LogRecord;

use crate::{
    core::app_state::AppState, error_handler::AppResult,
    routes::logs::submit_log_request::HistoryQuery,
};

/// Handler: GET /api/logs/history?owner=...
///
/// Most recently updated first; an unknown owner gets an empty list.
pub async fn history_route(
    State(state): State<Arc<AppState>>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> AppResult<Json<Vec<LogRecord>>> {
    let Query(q) = query?;
    Ok(Json(state.pipeline.history(q.owner()).await?))
}
