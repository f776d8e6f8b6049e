use crate::config::llm_provider::LlmProvider;

/// Configuration for a chat-completion model invocation.
///
/// # Fields
///
/// - `provider`: Which provider/backend to use (NIM or OpenAI).
/// - `model`: The model identifier (e.g., `"meta/llama-4-maverick-17b-128e-instruct"`).
/// - `endpoint`: Provider base URL; `/v1/...` paths are appended by the clients.
/// - `api_key`: Bearer credential. `None` is allowed at construction time so a
///   missing key surfaces per request instead of aborting startup.
/// - `max_tokens`: Maximum number of tokens to generate.
/// - `temperature`: Controls randomness (0.0 = deterministic).
/// - `timeout_secs`: Request timeout in seconds.
///
/// # Examples
///
/// ```
/// use ai_llm_service::{LlmModelConfig, LlmProvider};
///
/// let cfg = LlmModelConfig {
///     provider: LlmProvider::Nim,
///     model: "meta/llama-4-maverick-17b-128e-instruct".to_string(),
///     endpoint: "https://integrate.api.nvidia.com".to_string(),
///     api_key: Some("nvapi-...".to_string()),
///     max_tokens: Some(512),
///     temperature: None,
///     timeout_secs: Some(12),
/// };
/// assert!(cfg.has_api_key());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    /// The provider/backend.
    pub provider: LlmProvider,

    /// Model identifier string.
    pub model: String,

    /// Provider base URL.
    pub endpoint: String,

    /// Optional API key for authentication.
    pub api_key: Option<String>,

    /// Maximum number of tokens to generate.
    pub max_tokens: Option<u32>,

    /// Sampling temperature.
    pub temperature: Option<f32>,

    /// Optional request timeout (in seconds).
    pub timeout_secs: Option<u64>,
}

impl LlmModelConfig {
    /// Returns `true` when a non-blank API key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }
}
