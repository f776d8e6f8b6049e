//! Remediation text for a masked log, via the external reasoning service.
//!
//! One bounded attempt per call, no retry. Only masked text ever leaves the
//! process through this module.

use std::future::Future;
use std::time::Instant;

use ai_llm_service::{AiLlmError, services::chat_service::ChatService};
use tracing::{info, instrument, warn};

use crate::{config::ProducerConfig, errors::ProductionError};

/// Anything that can turn a masked log into solution text.
///
/// The orchestrator is generic over this so tests can count and script calls.
pub trait SolutionSource: Send + Sync + 'static {
    fn produce(
        &self,
        masked_log: &str,
    ) -> impl Future<Output = Result<String, ProductionError>> + Send;
}

/// [`SolutionSource`] backed by an OpenAI-compatible chat-completion provider.
#[derive(Debug)]
pub struct SolutionProducer {
    chat: ChatService,
    system_prompt: String,
}

impl SolutionProducer {
    /// Builds the producer. A missing credential is accepted here and
    /// reported by every [`produce`](SolutionSource::produce) call.
    ///
    /// # Errors
    /// Returns an error if the endpoint is invalid or the HTTP client cannot be built.
    pub fn new(cfg: ProducerConfig) -> Result<Self, AiLlmError> {
        if !cfg.llm.has_api_key() {
            warn!("no reasoning service API key configured; new logs cannot be solved");
        }
        Ok(Self {
            chat: ChatService::new(cfg.llm)?,
            system_prompt: cfg.system_prompt,
        })
    }

    /// The user message sent for `masked_log`.
    pub fn user_message(masked_log: &str) -> String {
        format!("Masked error log:\n{masked_log}")
    }
}

impl SolutionSource for SolutionProducer {
    #[instrument(name = "produce_solution", skip_all, fields(masked_len = masked_log.len()))]
    async fn produce(&self, masked_log: &str) -> Result<String, ProductionError> {
        let started = Instant::now();
        let user = Self::user_message(masked_log);

        match self.chat.generate(&user, Some(&self.system_prompt)).await {
            Ok(text) if text.trim().is_empty() => Err(ProductionError::EmptyResponse),
            Ok(text) => {
                info!(
                    latency_ms = started.elapsed().as_millis(),
                    solution_len = text.len(),
                    "solution produced"
                );
                Ok(text)
            }
            Err(e) => {
                let err = ProductionError::from(e);
                warn!(
                    error = %err,
                    latency_ms = started.elapsed().as_millis(),
                    "solution production failed"
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_SYSTEM_PROMPT;
    use ai_llm_service::{LlmModelConfig, LlmProvider};
    use axum::{Json, Router, routing::post};
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn producer(endpoint: String, api_key: Option<&str>) -> SolutionProducer {
        SolutionProducer::new(ProducerConfig {
            llm: LlmModelConfig {
                provider: LlmProvider::Nim,
                model: "meta/llama-4-maverick-17b-128e-instruct".into(),
                endpoint,
                api_key: api_key.map(str::to_string),
                max_tokens: Some(512),
                temperature: None,
                timeout_secs: Some(2),
            },
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn sends_fixed_system_prompt_and_masked_log() {
        let seen: Arc<Mutex<Option<Value>>> = Arc::default();
        let sink = seen.clone();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |Json(body): Json<Value>| {
                let sink = sink.clone();
                async move {
                    *sink.lock().unwrap() = Some(body);
                    Json(json!({ "choices": [{ "message": { "content": "\nRoot cause: x\n" } }] }))
                }
            }),
        );
        let p = producer(serve(app).await, Some("k"));

        let out = p.produce("TimeoutException at <MASKED>").await.unwrap();
        assert_eq!(out, "Root cause: x");

        let body = seen.lock().unwrap().take().unwrap();
        assert_eq!(body["stream"], false);
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["messages"][0]["role"], "system");
        let system = body["messages"][0]["content"].as_str().unwrap();
        assert!(system.contains("Only use evidence present in the log"));
        assert!(system.contains("Preventive measures"));
        assert_eq!(
            body["messages"][1]["content"],
            "Masked error log:\nTimeoutException at <MASKED>"
        );
    }

    #[tokio::test]
    async fn missing_credential_is_a_production_error() {
        let p = producer("http://127.0.0.1:9".into(), None);
        assert!(matches!(
            p.produce("x").await,
            Err(ProductionError::MissingCredential)
        ));
    }

    #[tokio::test]
    async fn blank_answer_is_a_production_error() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({ "choices": [{ "message": { "content": "  " } }] })) }),
        );
        let p = producer(serve(app).await, Some("k"));
        assert!(matches!(
            p.produce("x").await,
            Err(ProductionError::EmptyResponse)
        ));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_production_error() {
        let p = producer("http://127.0.0.1:9".into(), Some("k"));
        assert!(matches!(
            p.produce("x").await,
            Err(ProductionError::Transport(_))
        ));
    }
}
