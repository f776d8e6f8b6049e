//! Cache-or-produce flow behind a log submission.
//!
//! mask → fingerprint (masked and legacy raw) → lookup → hit: bump counter,
//! miss: produce then insert. Everything after masking runs while holding the
//! (owner, fingerprint) flight, so concurrent identical submissions cause at
//! most one production call and late arrivals are served as cache hits.

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::{
    errors::{PipelineError, PipelineResult},
    fingerprint::fingerprint,
    masking::MaskingGateway,
    producer::SolutionSource,
    single_flight::SingleFlight,
    store::{LogRecord, LogStore, NewLogRecord},
};

/// Result of [`SubmissionOrchestrator::submit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub from_cache: bool,
    pub solution: String,
    pub record_id: String,
}

pub struct SubmissionOrchestrator<P, S> {
    masking: MaskingGateway,
    producer: P,
    store: S,
    flights: SingleFlight<(String, String)>,
}

impl<P, S> std::fmt::Debug for SubmissionOrchestrator<P, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionOrchestrator")
            .field("flights", &self.flights)
            .finish_non_exhaustive()
    }
}

fn short(fp: &str) -> &str {
    fp.get(..12).unwrap_or(fp)
}

fn required<'a>(value: &'a str, field: &str) -> PipelineResult<&'a str> {
    let v = value.trim();
    if v.is_empty() {
        return Err(PipelineError::Validation(format!("{field} is required")));
    }
    Ok(v)
}

impl<P: SolutionSource, S: LogStore> SubmissionOrchestrator<P, S> {
    pub fn new(masking: MaskingGateway, producer: P, store: S) -> Self {
        Self {
            masking,
            producer,
            store,
            flights: SingleFlight::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the stored solution for this owner's error class, producing one
    /// on first sight.
    ///
    /// # Errors
    /// - [`PipelineError::Validation`] for a blank `owner` or `raw_log`.
    /// - [`PipelineError::Production`] when no solution could be produced;
    ///   nothing is persisted in that case.
    /// - [`PipelineError::Persistence`] on store failures.
    #[instrument(name = "submit_log", skip_all, fields(raw_len = raw_log.len()))]
    pub async fn submit(&self, owner: &str, raw_log: &str) -> PipelineResult<SubmissionOutcome> {
        let owner = required(owner, "owner")?;
        required(raw_log, "rawLog")?;

        let masked = self.masking.mask(raw_log).await;
        let fp = fingerprint(&masked);
        let legacy_fp = fingerprint(raw_log);
        let mut candidates = vec![fp.clone()];
        if legacy_fp != fp {
            candidates.push(legacy_fp);
        }

        let _flight = self.flights.acquire((owner.to_string(), fp.clone())).await;

        if let Some(existing) = self.store.find_for_owner(owner, &candidates).await? {
            let rec = self.serve_hit(existing).await?;
            info!(
                record_id = %rec.id,
                fingerprint = short(&rec.fingerprint),
                occurrence_count = rec.occurrence_count,
                "cache hit"
            );
            return Self::outcome(true, rec);
        }

        debug!(fingerprint = short(&fp), "cache miss; producing solution");
        let solution = self.producer.produce(&masked).await?;
        let rec = self
            .store
            .insert(NewLogRecord {
                owner: owner.to_string(),
                fingerprint: fp,
                masked_log: masked,
                solution: Some(solution),
            })
            .await?;
        info!(
            record_id = %rec.id,
            fingerprint = short(&rec.fingerprint),
            "new record stored"
        );
        Self::outcome(false, rec)
    }

    /// Counts a hit. A record left without a solution gets one first; it is
    /// written only if still empty and never overwritten afterwards.
    async fn serve_hit(&self, existing: LogRecord) -> PipelineResult<LogRecord> {
        if existing.solution.is_none() {
            debug!(record_id = %existing.id, "stored record has no solution; back-filling");
            let solution = self.producer.produce(&existing.masked_log).await?;
            self.store.fill_solution(&existing.id, &solution).await?;
        }
        self.store.increment_occurrence(&existing.id).await
    }

    fn outcome(from_cache: bool, rec: LogRecord) -> PipelineResult<SubmissionOutcome> {
        let solution = rec.solution.ok_or_else(|| {
            PipelineError::Persistence(crate::errors::PersistenceError::Corrupt {
                id: rec.id.clone(),
                reason: "solution missing after production".into(),
            })
        })?;
        Ok(SubmissionOutcome {
            from_cache,
            solution,
            record_id: rec.id,
        })
    }

    /// # Errors
    /// [`PipelineError::NotFound`] when no record has this id.
    pub async fn get_by_id(&self, id: &str) -> PipelineResult<LogRecord> {
        let id = required(id, "id")?;
        self.store
            .get(id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(id.to_string()))
    }

    /// All records of `owner`, most recently updated first.
    pub async fn history(&self, owner: &str) -> PipelineResult<Vec<LogRecord>> {
        let owner = required(owner, "owner")?;
        self.store.list_by_owner(owner).await
    }
}
