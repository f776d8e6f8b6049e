//! OpenAI-compatible chat-completion client (NVIDIA NIM, OpenAI).
//!
//! Minimal, non-streaming client around the `/v1/chat/completions` REST API.
//! The URL is derived from `LlmModelConfig::endpoint`:
//! - POST {endpoint}/v1/chat/completions
//!
//! Constructor validation:
//! - `cfg.endpoint` must start with http:// or https://
//!
//! A missing `cfg.api_key` is accepted by the constructor and reported by
//! [`ChatService::generate`] as `MissingApiKey`, so the owning service can
//! start without a credential and fail per request.
//!
//! Generated text is read from `choices[0].message.content`, falling back to
//! the legacy completion shape `choices[0].text`.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::{
    config::llm_model_config::LlmModelConfig,
    error_handler::{AiLlmError, HttpError, ProviderError, ProviderErrorKind, make_snippet},
};

/// Timeout applied when the config does not carry one.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Thin client for an OpenAI-compatible chat-completions endpoint.
///
/// Constructed from a complete [`LlmModelConfig`]. Internally keeps a
/// preconfigured `reqwest::Client` (with timeout and default headers).
#[derive(Debug)]
pub struct ChatService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_chat: String,
    timeout: Duration,
}

impl ChatService {
    /// Creates a new [`ChatService`] from the given config.
    ///
    /// # Errors
    /// - [`AiLlmError::Provider`] with `InvalidEndpoint` if `cfg.endpoint` is invalid
    /// - [`AiLlmError::Provider`] with `Decode` if the API key is not a valid header value
    /// - [`AiLlmError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            return Err(ProviderError::new(
                cfg.provider,
                ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone()),
            )
            .into());
        }

        let timeout = cfg
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);

        let mut headers = header::HeaderMap::new();
        if let Some(api_key) = cfg.api_key.as_deref().filter(|k| !k.trim().is_empty()) {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
                .map_err(|e| {
                    ProviderError::new(
                        cfg.provider,
                        ProviderErrorKind::Decode(format!("invalid API key header: {e}")),
                    )
                })?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        let url_chat = format!("{}/v1/chat/completions", endpoint.trim_end_matches('/'));

        info!(
            provider = ?cfg.provider,
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_secs = timeout.as_secs(),
            has_api_key = cfg.has_api_key(),
            "ChatService initialized"
        );

        Ok(Self {
            client,
            cfg,
            url_chat,
            timeout,
        })
    }

    /// Performs a **non-streaming** chat completion request.
    ///
    /// Messages: optional system message, then the user message with `prompt`.
    /// Mapped options from config: `model`, `temperature`, `max_tokens`.
    ///
    /// Returns the generated text, trimmed.
    ///
    /// # Errors
    /// - [`AiLlmError::Provider`] with `MissingApiKey` if no credential is configured
    /// - [`AiLlmError::Timeout`] if the request exceeds the configured timeout
    /// - [`AiLlmError::HttpTransport`] for other client/network failures
    /// - [`AiLlmError::Provider`] with `HttpStatus` for non-2xx responses
    /// - [`AiLlmError::Provider`] with `Decode` if the JSON cannot be parsed
    /// - [`AiLlmError::Provider`] with `EmptyChoices` if no text is returned
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, AiLlmError> {
        if !self.cfg.has_api_key() {
            return Err(ProviderError::new(self.cfg.provider, ProviderErrorKind::MissingApiKey).into());
        }

        let started = Instant::now();
        let body = ChatCompletionRequest::from_cfg(&self.cfg, prompt, system);

        debug!(
            model = %self.cfg.model,
            prompt_len = prompt.len(),
            has_system = system.is_some(),
            "POST {}", self.url_chat
        );

        let resp = self
            .client
            .post(&self.url_chat)
            .json(&body)
            .send()
            .await
            .map_err(|e| AiLlmError::from_transport(e, self.timeout))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_chat.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis(),
                "/v1/chat/completions returned non-success status"
            );

            return Err(ProviderError::new(
                self.cfg.provider,
                ProviderErrorKind::HttpStatus(HttpError {
                    status,
                    url,
                    snippet,
                }),
            )
            .into());
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AiLlmError::from_transport(e, self.timeout))?;

        let out: ChatCompletionResponse = match serde_json::from_slice(&bytes) {
            Ok(v) => v,
            Err(e) => {
                error!(
                    error = %e,
                    model = %self.cfg.model,
                    latency_ms = started.elapsed().as_millis(),
                    "failed to decode /v1/chat/completions response"
                );
                return Err(ProviderError::new(
                    self.cfg.provider,
                    ProviderErrorKind::Decode(format!(
                        "serde error: {e}; expected `choices[0].message.content` or `choices[0].text`"
                    )),
                )
                .into());
            }
        };

        let content = out.first_text().ok_or_else(|| {
            ProviderError::new(self.cfg.provider, ProviderErrorKind::EmptyChoices)
        })?;

        info!(
            model = %self.cfg.model,
            latency_ms = started.elapsed().as_millis(),
            content_len = content.len(),
            "chat completion completed"
        );

        Ok(content)
    }
}

/* ===========================================================================
HTTP payloads & options
======================================================================== */

/// Minimal request body for `/v1/chat/completions` (non-streaming).
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

impl<'a> ChatCompletionRequest<'a> {
    /// Builds a chat request from config, `prompt`, and an optional system message.
    fn from_cfg(cfg: &'a LlmModelConfig, prompt: &'a str, system: Option<&'a str>) -> Self {
        let mut messages = Vec::with_capacity(2);
        if let Some(sys) = system {
            messages.push(ChatMessage {
                role: "system",
                content: sys,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        Self {
            model: &cfg.model,
            messages,
            temperature: cfg.temperature,
            max_tokens: cfg.max_tokens,
            stream: false,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Response for `/v1/chat/completions`; every level may be absent.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatMessageOut>,
    /// Legacy completion shape.
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessageOut {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionResponse {
    /// Text of the first choice: `message.content` first, then `text`.
    /// Blank strings count as absent.
    fn first_text(self) -> Option<String> {
        let choice = self.choices.into_iter().next()?;
        let from_message = choice
            .message
            .and_then(|m| m.content)
            .filter(|s| !s.trim().is_empty());
        from_message
            .or_else(|| choice.text.filter(|s| !s.trim().is_empty()))
            .map(|s| s.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LlmProvider;
    use crate::error_handler::ProviderErrorKind;
    use axum::{Json, Router, http::StatusCode, routing::post};
    use serde_json::{Value, json};

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
            model: "test-model".into(),
            endpoint,
            api_key: api_key.map(str::to_string),
            max_tokens: Some(512),
            temperature: None,
            timeout_secs: Some(1),
        }
    }

    fn provider_kind(err: AiLlmError) -> ProviderErrorKind {
        match err {
            AiLlmError::Provider(p) => p.kind,
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[test]
    fn request_body_carries_messages_and_stream_flag() {
        let c = cfg("http://localhost".into(), Some("k"));
        let body = ChatCompletionRequest::from_cfg(&c, "hello", Some("be brief"));
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["model"], "test-model");
        assert_eq!(v["stream"], false);
        assert_eq!(v["max_tokens"], 512);
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["content"], "hello");
        assert!(v.get("temperature").is_none());
    }

    #[test]
    fn first_text_prefers_message_content_then_text() {
        let r: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": "  from message \n" }, "text": "from text" }]
        }))
        .unwrap();
        assert_eq!(r.first_text().as_deref(), Some("from message"));

        let r: ChatCompletionResponse = serde_json::from_value(json!({
            "choices": [{ "message": { "content": "   " }, "text": "from text" }]
        }))
        .unwrap();
        assert_eq!(r.first_text().as_deref(), Some("from text"));

        let r: ChatCompletionResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(r.first_text(), None);
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let err = ChatService::new(cfg("localhost:8000".into(), Some("k"))).unwrap_err();
        assert!(matches!(
            provider_kind(err),
            ProviderErrorKind::InvalidEndpoint(_)
        ));
    }

    #[tokio::test]
    async fn generate_sends_bearer_and_reads_content() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|headers: axum::http::HeaderMap, Json(body): Json<Value>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|h| h.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                let user = body["messages"][1]["content"].as_str().unwrap_or_default().to_string();
                Json(json!({
                    "choices": [{ "message": { "content": format!("{auth}|{user}") } }]
                }))
            }),
        );
        let base = serve(app).await;

        let svc = ChatService::new(cfg(base, Some("secret-key"))).unwrap();
        let out = svc.generate("the log", Some("system")).await.unwrap();
        assert_eq!(out, "Bearer secret-key|the log");
    }

    #[tokio::test]
    async fn generate_accepts_legacy_text_shape() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({ "choices": [{ "text": "legacy answer" }] })) }),
        );
        let base = serve(app).await;

        let svc = ChatService::new(cfg(base, Some("k"))).unwrap();
        assert_eq!(svc.generate("p", None).await.unwrap(), "legacy answer");
    }

    #[tokio::test]
    async fn empty_payload_is_an_error() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({ "choices": [] })) }),
        );
        let base = serve(app).await;

        let svc = ChatService::new(cfg(base, Some("k"))).unwrap();
        let err = svc.generate("p", None).await.unwrap_err();
        assert!(matches!(provider_kind(err), ProviderErrorKind::EmptyChoices));
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
        );
        let base = serve(app).await;

        let svc = ChatService::new(cfg(base, Some("k"))).unwrap();
        match provider_kind(svc.generate("p", None).await.unwrap_err()) {
            ProviderErrorKind::HttpStatus(http) => {
                assert_eq!(http.status, StatusCode::UNAUTHORIZED);
                assert_eq!(http.snippet, "bad key");
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_key_fails_without_calling_upstream() {
        // Port 9 (discard) is never contacted: the key check runs first.
        let svc = ChatService::new(cfg("http://127.0.0.1:9".into(), None)).unwrap();
        let err = svc.generate("p", None).await.unwrap_err();
        assert!(matches!(provider_kind(err), ProviderErrorKind::MissingApiKey));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!({ "choices": [{ "text": "late" }] }))
            }),
        );
        let base = serve(app).await;

        let svc = ChatService::new(cfg(base, Some("k"))).unwrap();
        let err = svc.generate("p", None).await.unwrap_err();
        assert!(matches!(err, AiLlmError::Timeout(d) if d == Duration::from_secs(1)));
    }
}
