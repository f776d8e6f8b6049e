use std::sync::Arc;

use ai_llm_service::health_service::HealthStatus;
use axum::{Json, extract::State};
use serde::Serialize;

use crate::core::app_state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the process answers.
    pub status: &'static str,
    /// Store backend in use (`memory` or `sqlite`).
    pub store: &'static str,
    /// Best-effort probe of the reasoning provider.
    pub provider: HealthStatus,
}

/// Handler: GET /health
///
/// Liveness never depends on the provider; an unreachable or unauthorized
/// provider shows up as `provider.ok = false`.
pub async fn health_route(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let provider = state.health.check(&state.llm).await;
    Json(HealthResponse {
        status: "ok",
        store: state.pipeline.store().kind(),
        provider,
    })
}

#[cfg(test)]
mod tests {
    use crate::{core::app_state::test_support, router};
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    #[tokio::test]
    async fn alive_even_when_provider_is_down() {
        let app = router(Arc::new(test_support::state("http://127.0.0.1:9", Some("k"))));
        let res = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["store"], "memory");
        assert_eq!(body["provider"]["ok"], false);
    }
}
