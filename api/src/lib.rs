use std::sync::Arc;

pub mod core;
pub mod error_handler;
mod routes;

use ai_llm_service::error_handler::must_env;
use axum::{
    Router,
    routing::{get, post},
};
use log_pipeline::PipelineConfig;
use tokio::signal;
use tracing::{error, info};

use crate::{
    core::app_state::AppState,
    error_handler::AppError,
    routes::{
        health_route::health_route,
        logs::{
            get_log_route::get_log_route, history_route::history_route,
            submit_log_route::submit_log_route,
        },
    },
};

/// Loads configuration from the environment, binds `API_ADDRESS` and serves
/// until Ctrl+C.
pub async fn start() -> Result<(), AppError> {
    let host_url = must_env("API_ADDRESS")?;
    let state = Arc::new(AppState::from_config(PipelineConfig::from_env()?)?);

    let listener = tokio::net::TcpListener::bind(&host_url)
        .await
        .map_err(|source| AppError::Bind {
            addr: host_url.clone(),
            source,
        })?;
    info!(addr = %host_url, "HTTP server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("HTTP server stopped");
    Ok(())
}

/// All routes over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_route))
        .route("/api/logs/submit", post(submit_log_route))
        .route("/api/logs/get/{id}", get(get_log_route))
        .route("/api/logs/history", get(history_route))
        .with_state(state)
}

/// Returns a future that resolves when Ctrl+C is pressed
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "cannot listen for shutdown signal; running until killed");
        std::future::pending::<()>().await;
    }
}
