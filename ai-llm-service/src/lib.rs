//! Shared client for OpenAI-compatible chat-completion providers.
//!
//! - [`config`]: model configuration and env-driven defaults.
//! - [`services::chat_service`]: non-streaming `/v1/chat/completions` client.
//! - [`health_service`]: best-effort provider probe for `/health`.
//! - [`telemetry`]: tracing layer and filters used by the binary.

pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod services;
pub mod telemetry;

pub use config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider};
pub use error_handler::{AiLlmError, Result};
