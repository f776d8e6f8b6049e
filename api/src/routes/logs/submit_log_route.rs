use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use log_pipeline::SubmissionOutcome;
use tracing::{info, instrument};

use crate::{
    core::app_state::AppState, error_handler::AppResult,
    routes::logs::submit_log_request::SubmitLogRequest,
};

/// Handler: POST /api/logs/submit
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8080/api/logs/submit \
///   -H 'content-type: application/json' \
///   -d '{"owner":"u1","rawLog":"TimeoutException at DBService.java:78"}'
/// ```
#[instrument(name = "submit_log_route", skip_all)]
pub async fn submit_log_route(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubmitLogRequest>, JsonRejection>,
) -> AppResult<Json<SubmissionOutcome>> {
    let Json(body) = payload?;
    let outcome = state.pipeline.submit(body.owner(), &body.raw_log).await?;
    info!(
        record_id = %outcome.record_id,
        from_cache = outcome.from_cache,
        "submission served"
    );
    Ok(Json(outcome))
}

#[cfg(test)]
mod tests {
    use crate::{core::app_state::test_support, router};
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn submit(body: Value) -> Request<Body> {
        Request::post("/api/logs/submit")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(res: axum::response::Response) -> Value {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn miss_then_hit() {
        let endpoint = test_support::provider("Root cause: pool exhausted").await;
        let app = router(Arc::new(test_support::state(&endpoint, Some("k"))));
        let log = "TimeoutException at DBService.java:78, IP=10.0.0.5";

        let res = app
            .clone()
            .oneshot(submit(json!({ "owner": "u1", "rawLog": log })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let first = read_json(res).await;
        assert_eq!(first["fromCache"], false);
        assert_eq!(first["solution"], "Root cause: pool exhausted");

        let res = app
            .oneshot(submit(json!({ "userId": "u1", "rawLog": log })))
            .await
            .unwrap();
        let second = read_json(res).await;
        assert_eq!(second["fromCache"], true);
        assert_eq!(second["recordId"], first["recordId"]);
    }

    #[tokio::test]
    async fn owner_and_user_id_together_use_owner() {
        let endpoint = test_support::provider("fix").await;
        let state = Arc::new(test_support::state(&endpoint, Some("k")));
        let res = router(state.clone())
            .oneshot(submit(json!({ "owner": "u1", "userId": "u2", "rawLog": "ECONNREFUSED" })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(state.pipeline.history("u1").await.unwrap().len(), 1);
        assert!(state.pipeline.history("u2").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_raw_log_is_bad_request() {
        let app = router(Arc::new(test_support::state("http://127.0.0.1:9", Some("k"))));
        let res = app.oneshot(submit(json!({ "owner": "u1" }))).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = read_json(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
        assert_eq!(body["error"]["message"], "rawLog is required");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let app = router(Arc::new(test_support::state("http://127.0.0.1:9", Some("k"))));
        let req = Request::post("/api/logs/submit")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_json(res).await["success"], false);
    }

    #[tokio::test]
    async fn production_failure_is_a_generic_server_error() {
        // No credential configured.
        let app = router(Arc::new(test_support::state("http://127.0.0.1:9", None)));
        let res = app
            .oneshot(submit(json!({ "owner": "u1", "rawLog": "NullPointerException at Auth.java:10" })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(res).await;
        assert_eq!(body["error"]["message"], "Server error");
        assert!(body.get("solution").is_none());
    }
}
