//! Crate-wide error hierarchy for log-pipeline.
//!
//! - Single root [`PipelineError`] for all public operations.
//! - Masking failures never appear here: the gateway degrades to local redaction.
//! - A lookup that finds nothing is `Ok(None)` at the store level; only
//!   `get_by_id` turns it into [`PipelineError::NotFound`].

use std::time::Duration;

use ai_llm_service::error_handler::{AiLlmError, ProviderErrorKind};
use thiserror::Error;

/// Convenient alias for crate-wide results.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Root error type for the log-pipeline crate.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or malformed submission fields.
    #[error("validation error: {0}")]
    Validation(String),

    /// The reasoning service could not produce a solution.
    #[error(transparent)]
    Production(#[from] ProductionError),

    /// The store is unavailable or a write failed.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// No record with the given id.
    #[error("log record not found: {0}")]
    NotFound(String),

    /// A component could not be built at startup.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Failure of a single solution production attempt.
#[derive(Debug, Error)]
pub enum ProductionError {
    #[error("reasoning service credential is not configured")]
    MissingCredential,

    #[error("reasoning service timed out after {0:?}")]
    Timeout(Duration),

    #[error("reasoning service unreachable: {0}")]
    Transport(String),

    /// Non-2xx answer or undecodable body.
    #[error("reasoning service returned an unusable answer: {0}")]
    Upstream(String),

    #[error("reasoning service returned an empty response")]
    EmptyResponse,

    /// Client could not be built from the configuration.
    #[error("reasoning service misconfigured: {0}")]
    Config(String),
}

impl From<AiLlmError> for ProductionError {
    fn from(e: AiLlmError) -> Self {
        match e {
            AiLlmError::Timeout(d) => ProductionError::Timeout(d),
            AiLlmError::HttpTransport(t) => ProductionError::Transport(t.to_string()),
            AiLlmError::Provider(p) => match p.kind {
                ProviderErrorKind::MissingApiKey => ProductionError::MissingCredential,
                ProviderErrorKind::EmptyChoices => ProductionError::EmptyResponse,
                ProviderErrorKind::InvalidEndpoint(ep) => {
                    ProductionError::Config(format!("invalid endpoint: {ep}"))
                }
                other => ProductionError::Upstream(other.to_string()),
            },
            other => ProductionError::Config(other.to_string()),
        }
    }
}

/// Store failures.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Backend cannot serve requests (poisoned lock, worker task lost, ...).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored row could not be mapped back into a record.
    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    /// An update addressed a record that does not exist.
    #[error("record vanished during update: {0}")]
    Missing(String),
}

// ===== Conversions for `?` ergonomics =====

impl From<rusqlite::Error> for PipelineError {
    fn from(e: rusqlite::Error) -> Self {
        PipelineError::Persistence(PersistenceError::Sqlite(e))
    }
}

impl From<tokio::task::JoinError> for PipelineError {
    fn from(e: tokio::task::JoinError) -> Self {
        PipelineError::Persistence(PersistenceError::Unavailable(format!(
            "store worker failed: {e}"
        )))
    }
}

impl From<AiLlmError> for PipelineError {
    fn from(e: AiLlmError) -> Self {
        PipelineError::Production(ProductionError::from(e))
    }
}
