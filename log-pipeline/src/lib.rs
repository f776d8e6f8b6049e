//! Error-log remediation pipeline.
//!
//! A raw log is masked ([`masking`]), reduced to a stable fingerprint
//! ([`fingerprint`]) and looked up per owner in the [`store`]. A miss asks the
//! reasoning service for a solution ([`producer`]) and stores it; a hit only
//! bumps the occurrence counter. [`orchestrator`] ties these together and
//! serializes work per (owner, fingerprint) via [`single_flight`].

pub mod config;
pub mod errors;
pub mod fingerprint;
pub mod masking;
pub mod orchestrator;
pub mod producer;
pub mod single_flight;
pub mod store;

pub use config::PipelineConfig;
pub use errors::{PersistenceError, PipelineError, PipelineResult, ProductionError};
pub use orchestrator::{SubmissionOrchestrator, SubmissionOutcome};
pub use producer::{SolutionProducer, SolutionSource};
pub use store::{LogRecord, LogStore, StoreBackend};

use masking::MaskingGateway;
use tracing::info;

/// The production wiring: HTTP reasoning service and the configured store.
pub type LogPipeline = SubmissionOrchestrator<SolutionProducer, StoreBackend>;

impl LogPipeline {
    /// Builds every component from `cfg`.
    ///
    /// # Errors
    /// [`PipelineError::Config`] when an HTTP client cannot be built, or a
    /// persistence error when the store cannot be opened.
    pub fn from_config(cfg: PipelineConfig) -> PipelineResult<Self> {
        let masking = MaskingGateway::new(&cfg.masking)
            .map_err(|e| PipelineError::Config(format!("masking client: {e}")))?;
        let producer = SolutionProducer::new(cfg.producer)
            .map_err(|e| PipelineError::Config(format!("reasoning client: {e}")))?;
        let store = StoreBackend::open(cfg.store_path.as_deref())?;

        info!(
            masking_service = cfg.masking.service_url.as_deref().unwrap_or("disabled"),
            store = store.kind(),
            "log pipeline ready"
        );
        Ok(Self::new(masking, producer, store))
    }
}
