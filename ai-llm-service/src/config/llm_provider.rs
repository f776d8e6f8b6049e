use std::str::FromStr;

use crate::error_handler::ConfigError;

/// Represents the provider (backend) used for chat-completion inference.
///
/// Both providers speak the OpenAI chat-completions wire format; the variant
/// decides the default endpoint and how the provider is labelled in logs.
///
/// # Examples
///
/// ```
/// use ai_llm_service::LlmProvider;
///
/// let p: LlmProvider = "nim".parse().unwrap();
/// assert_eq!(p, LlmProvider::Nim);
/// assert_eq!(p.default_endpoint(), "https://integrate.api.nvidia.com");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// NVIDIA NIM hosted inference (OpenAI-compatible).
    Nim,
    /// OpenAI's API.
    OpenAI,
}

impl LlmProvider {
    /// Base URL used when `LLM_ENDPOINT` is not set.
    pub fn default_endpoint(self) -> &'static str {
        match self {
            LlmProvider::Nim => "https://integrate.api.nvidia.com",
            LlmProvider::OpenAI => "https://api.openai.com",
        }
    }
}

impl FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nim" | "nvidia" => Ok(LlmProvider::Nim),
            "openai" | "chatgpt" => Ok(LlmProvider::OpenAI),
            other => Err(ConfigError::UnsupportedProvider(other.to_string())),
        }
    }
}
