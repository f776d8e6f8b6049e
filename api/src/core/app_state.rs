use ai_llm_service::{LlmModelConfig, health_service::HealthService};
use log_pipeline::{LogPipeline, PipelineConfig};

use crate::error_handler::AppError;

/// Timeout of the provider probe behind `/health`, in seconds.
const HEALTH_TIMEOUT_SECS: u64 = 5;

/// Shared state for all HTTP handlers.
pub struct AppState {
    /// Submission pipeline (masking, cache, production, store).
    pub pipeline: LogPipeline,
    /// Reasoning provider settings, reported by `/health`.
    pub llm: LlmModelConfig,
    pub health: HealthService,
}

impl AppState {
    /// Builds every component from an already loaded configuration.
    pub fn from_config(cfg: PipelineConfig) -> Result<Self, AppError> {
        let llm = cfg.producer.llm.clone();
        Ok(Self {
            pipeline: LogPipeline::from_config(cfg).map_err(AppError::Startup)?,
            llm,
            health: HealthService::new(Some(HEALTH_TIMEOUT_SECS))?,
        })
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use ai_llm_service::LlmProvider;
    use log_pipeline::{
        SolutionProducer, StoreBackend, config::ProducerConfig, config::DEFAULT_SYSTEM_PROMPT,
        masking::MaskingGateway, store::MemoryLogStore,
    };

    /// State with local-only masking, an in-memory store and a provider at `endpoint`.
    pub(crate) fn state(endpoint: &str, api_key: Option<&str>) -> AppState {
        let llm = LlmModelConfig {
            provider: LlmProvider::Nim,
            model: "test-model".into(),
            endpoint: endpoint.into(),
            api_key: api_key.map(str::to_string),
            max_tokens: Some(512),
            temperature: None,
            timeout_secs: Some(2),
        };
        let producer = SolutionProducer::new(ProducerConfig {
            llm: llm.clone(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
        })
        .unwrap();
        AppState {
            pipeline: LogPipeline::new(
                MaskingGateway::local_only(),
                producer,
                StoreBackend::Memory(MemoryLogStore::default()),
            ),
            llm,
            health: HealthService::new(Some(1)).unwrap(),
        }
    }

    /// Chat-completions double answering every request with `answer`.
    pub(crate) async fn provider(answer: &'static str) -> String {
        use axum::{Json, Router, routing::post};
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move || async move {
                Json(serde_json::json!({ "choices": [{ "message": { "content": answer } }] }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }
}
