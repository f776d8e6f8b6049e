//! Default chat-completion config loaded strictly from environment variables.
//!
//! # Environment variables
//!
//! - `LLM_KIND`         = provider kind (`nim` | `openai`), default `nim`
//! - `LLM_ENDPOINT`     = provider base URL, default depends on provider
//! - `LLM_MODEL`        = model identifier, default [`DEFAULT_MODEL`]
//! - `LLM_MAX_TOKENS`   = optional max tokens (u32), default 512
//! - `LLM_TIMEOUT_SECS` = request timeout (u64), default 12
//! - credential: first non-empty of [`API_KEY_VARS`]
//!
//! A missing credential is **not** an error here: the config is returned with
//! `api_key = None` and the failure surfaces when a completion is requested.

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt, env_opt_u32, env_opt_u64, validate_http_endpoint,
    },
};

/// Model used when `LLM_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "meta/llama-4-maverick-17b-128e-instruct";

/// Completion budget used when `LLM_MAX_TOKENS` is not set.
pub const DEFAULT_MAX_TOKENS: u32 = 512;

/// Production timeout used when `LLM_TIMEOUT_SECS` is not set.
pub const DEFAULT_TIMEOUT_SECS: u64 = 12;

/// Credential variables, checked in order.
pub const API_KEY_VARS: [&str; 4] = [
    "NVIDIA_NIM_API_KEY",
    "NIM_API_KEY",
    "NVIDIA_API_KEY",
    "OPENAI_API_KEY",
];

/// Builds the chat-completion config for the reasoning service.
///
/// # Errors
/// - [`ConfigError::UnsupportedProvider`] for an unknown `LLM_KIND`
/// - [`ConfigError::InvalidFormat`] if `LLM_ENDPOINT` is not http/https
/// - [`ConfigError::InvalidNumber`] for malformed numeric variables
pub fn config_from_env() -> Result<LlmModelConfig, AiLlmError> {
    let provider = match env_opt("LLM_KIND") {
        Some(kind) => kind.parse::<LlmProvider>()?,
        None => LlmProvider::Nim,
    };

    let endpoint =
        env_opt("LLM_ENDPOINT").unwrap_or_else(|| provider.default_endpoint().to_string());
    validate_http_endpoint("LLM_ENDPOINT", &endpoint)?;

    let model = env_opt("LLM_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
    if model.is_empty() {
        return Err(ConfigError::EmptyModel.into());
    }

    let api_key = API_KEY_VARS.iter().find_map(|name| env_opt(name));
    let max_tokens = env_opt_u32("LLM_MAX_TOKENS")?.or(Some(DEFAULT_MAX_TOKENS));
    let timeout_secs = env_opt_u64("LLM_TIMEOUT_SECS")?.or(Some(DEFAULT_TIMEOUT_SECS));

    Ok(LlmModelConfig {
        provider,
        model,
        endpoint,
        api_key,
        max_tokens,
        temperature: None,
        timeout_secs,
    })
}
