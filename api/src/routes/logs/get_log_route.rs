use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use log_pipeline::LogRecord;

use crate::{core::app_state::AppState, error_handler::AppResult};

/// Handler: GET /api/logs/get/{id}
pub async fn get_log_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<LogRecord>> {
    Ok(Json(state.pipeline.get_by_id(&id).await?))
}
