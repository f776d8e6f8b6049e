//! Health probe for the chat-completion provider.
//!
//! Probe: `GET {endpoint}/v1/models` with Bearer auth, best-effort check that
//! the configured model is listed. Both NIM and OpenAI expose this route.
//!
//! The returned [`HealthStatus`] is JSON-serializable and suitable for a `/health` endpoint.
//! [`HealthService::check`] is resilient and never fails (errors mapped to `ok=false`).
//! The strict probe (`try_probe`) returns `Result`.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::llm_model_config::LlmModelConfig;
use crate::error_handler::{AiLlmError, HealthError, HttpError, make_snippet};

/// A serializable health snapshot for a single provider/config.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    /// Backend/provider (e.g., "Nim", "OpenAI").
    pub provider: String,
    /// Target endpoint base URL.
    pub endpoint: String,
    /// Model identifier relevant to the probe.
    pub model: Option<String>,
    /// Overall health flag.
    pub ok: bool,
    /// Measured HTTP latency in milliseconds for the probe.
    pub latency_ms: u128,
    /// Short human-readable message with details.
    pub message: String,
}

impl HealthStatus {
    #[inline]
    fn new(cfg: &LlmModelConfig, ok: bool, latency_ms: u128, message: impl Into<String>) -> Self {
        Self {
            provider: format!("{:?}", cfg.provider),
            endpoint: cfg.endpoint.clone(),
            model: Some(cfg.model.clone()),
            ok,
            latency_ms,
            message: message.into(),
        }
    }
}

/// Health checker that reuses a single HTTP client.
pub struct HealthService {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HealthService {
    /// Creates a new health service with an optional client timeout (seconds).
    ///
    /// # Errors
    /// Returns [`AiLlmError::HttpTransport`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        info!(
            default_timeout_secs = timeout.as_secs(),
            "HealthService initialized"
        );

        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    /// Checks health for the given config.
    ///
    /// This method is **resilient**: it never returns an error. Any failure is converted
    /// to `HealthStatus { ok: false, message: ... }`.
    pub async fn check(&self, cfg: &LlmModelConfig) -> HealthStatus {
        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            warn!(
                provider = ?cfg.provider,
                endpoint = %cfg.endpoint,
                "invalid endpoint (empty or missing http/https)"
            );
            return HealthStatus::new(cfg, false, 0, "endpoint is empty or missing http/https");
        }

        if !cfg.has_api_key() {
            return HealthStatus::new(
                cfg,
                false,
                0,
                "no API key configured; solution production is unavailable",
            );
        }

        let start = Instant::now();
        match self.try_probe(cfg).await {
            Ok(status) => {
                info!(
                    provider = %status.provider,
                    endpoint = %status.endpoint,
                    ok = status.ok,
                    latency_ms = status.latency_ms,
                    "health probe completed"
                );
                status
            }
            Err(err) => {
                let status =
                    HealthStatus::new(cfg, false, start.elapsed().as_millis(), err.to_string());
                warn!(
                    provider = %status.provider,
                    endpoint = %status.endpoint,
                    latency_ms = status.latency_ms,
                    message = %status.message,
                    "health probe failed"
                );
                status
            }
        }
    }

    /// Strict probe: `GET {endpoint}/v1/models`, 2xx required, then a
    /// best-effort check that `cfg.model` is listed.
    async fn try_probe(&self, cfg: &LlmModelConfig) -> Result<HealthStatus, AiLlmError> {
        let url = format!("{}/v1/models", cfg.endpoint.trim().trim_end_matches('/'));
        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .map_or(self.default_timeout, |t| t.min(self.default_timeout));

        let api_key = cfg
            .api_key
            .as_deref()
            .ok_or_else(|| HealthError::Decode("missing API key".into()))?;
        let mut bearer = header::HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|e| HealthError::Decode(format!("invalid API key header: {e}")))?;
        bearer.set_sensitive(true);

        let start = Instant::now();
        debug!(provider = ?cfg.provider, model = %cfg.model, %url, "probing provider");

        let resp = self
            .client
            .get(&url)
            .timeout(timeout)
            .header(header::AUTHORIZATION, bearer)
            .send()
            .await
            .map_err(|e| AiLlmError::from_transport(e, timeout))?;
        let latency = start.elapsed().as_millis();

        let status = resp.status();
        if !status.is_success() {
            let snippet = make_snippet(&resp.text().await.unwrap_or_default());
            error!(
                provider = ?cfg.provider,
                %url,
                %status,
                %snippet,
                latency_ms = latency,
                "model listing returned non-success status"
            );
            return Err(HealthError::HttpStatus(HttpError {
                status,
                url,
                snippet,
            })
            .into());
        }

        // A reachable provider with an unexpected listing shape still counts as up.
        let (ok, message) = match resp.json::<ModelList>().await {
            Ok(list) if list.data.iter().any(|m| m.id == cfg.model) => {
                (true, "provider is healthy; model is available".to_string())
            }
            Ok(_) => (false, "provider is up, but model not found in /v1/models".to_string()),
            Err(e) => {
                warn!(provider = ?cfg.provider, error = %e, "undecodable model listing");
                (true, format!("provider is reachable; failed to decode /v1/models: {e}"))
            }
        };
        Ok(HealthStatus::new(cfg, ok, latency, message))
    }
}

/// `{ "data": [ { "id": "<model>" }, ... ] }`
#[derive(Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Deserialize)]
struct ModelEntry {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LlmProvider;
    use axum::{Json, Router, routing::get};
    use serde_json::json;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn cfg(endpoint: String, api_key: Option<&str>) -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Nim,
            model: "m1".into(),
            endpoint,
            api_key: api_key.map(str::to_string),
            max_tokens: None,
            temperature: None,
            timeout_secs: Some(2),
        }
    }

    #[tokio::test]
    async fn reports_listed_model_as_healthy() {
        let app = Router::new().route(
            "/v1/models",
            get(|| async { Json(json!({ "data": [{ "id": "m0" }, { "id": "m1" }] })) }),
        );
        let base = serve(app).await;

        let status = HealthService::new(Some(2))
            .unwrap()
            .check(&cfg(base, Some("k")))
            .await;
        assert!(status.ok, "{}", status.message);
    }

    #[tokio::test]
    async fn missing_key_and_bad_endpoint_are_not_ok() {
        let svc = HealthService::new(Some(2)).unwrap();
        assert!(!svc.check(&cfg("http://127.0.0.1:9".into(), None)).await.ok);
        assert!(!svc.check(&cfg("nope".into(), Some("k"))).await.ok);
    }
}
