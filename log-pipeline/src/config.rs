//! Runtime configuration loaded from environment variables.
//!
//! Everything here is plain data handed to constructors; nothing below this
//! module reads the environment.

use std::path::PathBuf;
use std::time::Duration;

use ai_llm_service::{
    AiLlmError, LlmModelConfig,
    config::default_config::config_from_env,
    error_handler::{env_opt, env_opt_u64, validate_http_endpoint},
};

/// Detection service used when `MASKING_SERVICE_URL` is unset.
pub const DEFAULT_MASKING_URL: &str = "http://localhost:5001";

/// Bound on the masking call when `MASKING_TIMEOUT_MS` is unset.
pub const DEFAULT_MASKING_TIMEOUT_MS: u64 = 4_000;

/// System instruction sent with every production request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a backend debugging assistant. You will be given a masked error log. \
Only use evidence present in the log. Do not invent stack traces, line numbers, files, services, or runtime context. \
Output plain text only (no markdown). Provide: (1) Root cause, (2) Why it occurred, \
(3) Step-by-step solution, (4) Preventive measures.";

/// Masking gateway settings.
#[derive(Debug, Clone)]
pub struct MaskingConfig {
    /// Base URL of the detection service; `None` disables the remote call.
    pub service_url: Option<String>,
    pub timeout: Duration,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            service_url: Some(DEFAULT_MASKING_URL.to_string()),
            timeout: Duration::from_millis(DEFAULT_MASKING_TIMEOUT_MS),
        }
    }
}

/// Solution producer settings.
#[derive(Debug, Clone)]
pub struct ProducerConfig {
    pub llm: LlmModelConfig,
    pub system_prompt: String,
}

/// Everything the pipeline needs at construction time.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub masking: MaskingConfig,
    pub producer: ProducerConfig,
    /// SQLite file for the store; `None` keeps records in memory.
    pub store_path: Option<PathBuf>,
}

impl PipelineConfig {
    /// Build from environment variables with defaults.
    ///
    /// - `MASKING_SERVICE_URL` (set to an empty string to disable), `MASKING_TIMEOUT_MS`
    /// - `LLM_*` and credential variables, see
    ///   [`config_from_env`](ai_llm_service::config::default_config::config_from_env)
    /// - `LOG_STORE_PATH`
    ///
    /// # Errors
    /// Returns the config error naming the offending variable.
    pub fn from_env() -> Result<Self, AiLlmError> {
        let service_url = match std::env::var("MASKING_SERVICE_URL") {
            Ok(v) if v.trim().is_empty() => None,
            Ok(v) => Some(v.trim().to_string()),
            Err(_) => Some(DEFAULT_MASKING_URL.to_string()),
        };
        if let Some(url) = &service_url {
            validate_http_endpoint("MASKING_SERVICE_URL", url)?;
        }
        let timeout_ms =
            env_opt_u64("MASKING_TIMEOUT_MS")?.unwrap_or(DEFAULT_MASKING_TIMEOUT_MS);

        Ok(Self {
            masking: MaskingConfig {
                service_url,
                timeout: Duration::from_millis(timeout_ms),
            },
            producer: ProducerConfig {
                llm: config_from_env()?,
                system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            },
            store_path: env_opt("LOG_STORE_PATH").map(PathBuf::from),
        })
    }
}
