//! Solution store: (owner, fingerprint) → masked log, solution, occurrence count.
//!
//! Only independent point operations are required from a backend; the
//! orchestrator provides per-key exclusion on top. The store owns ids
//! (UUID v4) and timestamps.
//!
//! Backends are selected at startup and dispatched through [`StoreBackend`]
//! (enum dispatch, no trait objects).

pub mod memory;
pub mod sqlite;

use std::future::Future;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::PipelineResult;

pub use memory::MemoryLogStore;
pub use sqlite::SqliteLogStore;

/// A persisted log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub id: String,
    /// Submitting principal; not unique across records.
    pub owner: String,
    /// 64-char lowercase hex digest of the normalized signature.
    pub fingerprint: String,
    /// Sanitized text; never the raw payload.
    pub masked_log: String,
    /// `None` only until production completes; never overwritten once set.
    pub solution: Option<String>,
    /// Starts at 1, grows by one per cache hit.
    pub occurrence_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload; the store fills id, count and timestamps.
#[derive(Debug, Clone)]
pub struct NewLogRecord {
    pub owner: String,
    pub fingerprint: String,
    pub masked_log: String,
    pub solution: Option<String>,
}

/// Point operations over log records.
pub trait LogStore: Send + Sync + 'static {
    /// Oldest record of `owner` whose fingerprint is any of `fingerprints`.
    fn find_for_owner(
        &self,
        owner: &str,
        fingerprints: &[String],
    ) -> impl Future<Output = PipelineResult<Option<LogRecord>>> + Send;

    /// Inserts with `occurrence_count = 1` and returns the stored record.
    fn insert(&self, new: NewLogRecord) -> impl Future<Output = PipelineResult<LogRecord>> + Send;

    /// Adds one to the counter, bumps `updated_at`, returns the updated record.
    fn increment_occurrence(
        &self,
        id: &str,
    ) -> impl Future<Output = PipelineResult<LogRecord>> + Send;

    /// Sets `solution` only when it is still `None`; returns the record as stored.
    fn fill_solution(
        &self,
        id: &str,
        solution: &str,
    ) -> impl Future<Output = PipelineResult<LogRecord>> + Send;

    fn get(&self, id: &str) -> impl Future<Output = PipelineResult<Option<LogRecord>>> + Send;

    /// All records of `owner`, most recently updated first.
    fn list_by_owner(
        &self,
        owner: &str,
    ) -> impl Future<Output = PipelineResult<Vec<LogRecord>>> + Send;
}

/// Concrete store chosen at startup.
#[derive(Debug)]
pub enum StoreBackend {
    Memory(MemoryLogStore),
    Sqlite(SqliteLogStore),
}

impl StoreBackend {
    /// SQLite at `path` when given, in-memory otherwise.
    pub fn open(path: Option<&Path>) -> PipelineResult<Self> {
        match path {
            Some(p) => Ok(Self::Sqlite(SqliteLogStore::open(p)?)),
            None => Ok(Self::Memory(MemoryLogStore::default())),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Sqlite(_) => "sqlite",
        }
    }
}

impl LogStore for StoreBackend {
    async fn find_for_owner(
        &self,
        owner: &str,
        fingerprints: &[String],
    ) -> PipelineResult<Option<LogRecord>> {
        match self {
            Self::Memory(s) => s.find_for_owner(owner, fingerprints).await,
            Self::Sqlite(s) => s.find_for_owner(owner, fingerprints).await,
        }
    }

    async fn insert(&self, new: NewLogRecord) -> PipelineResult<LogRecord> {
        match self {
            Self::Memory(s) => s.insert(new).await,
            Self::Sqlite(s) => s.insert(new).await,
        }
    }

    async fn increment_occurrence(&self, id: &str) -> PipelineResult<LogRecord> {
        match self {
            Self::Memory(s) => s.increment_occurrence(id).await,
            Self::Sqlite(s) => s.increment_occurrence(id).await,
        }
    }

    async fn fill_solution(&self, id: &str, solution: &str) -> PipelineResult<LogRecord> {
        match self {
            Self::Memory(s) => s.fill_solution(id, solution).await,
            Self::Sqlite(s) => s.fill_solution(id, solution).await,
        }
    }

    async fn get(&self, id: &str) -> PipelineResult<Option<LogRecord>> {
        match self {
            Self::Memory(s) => s.get(id).await,
            Self::Sqlite(s) => s.get(id).await,
        }
    }

    async fn list_by_owner(&self, owner: &str) -> PipelineResult<Vec<LogRecord>> {
        match self {
            Self::Memory(s) => s.list_by_owner(owner).await,
            Self::Sqlite(s) => s.list_by_owner(owner).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{PersistenceError, PipelineError};
    use std::time::Duration;

    fn new_record(owner: &str, fp: &str, solution: Option<&str>) -> NewLogRecord {
        NewLogRecord {
            owner: owner.into(),
            fingerprint: fp.into(),
            masked_log: format!("masked {fp}"),
            solution: solution.map(str::to_string),
        }
    }

    /// Behaviour every backend must share.
    async fn exercise(store: impl LogStore) {
        let a = store.insert(new_record("u1", "fp-a", Some("fix a"))).await.unwrap();
        assert_eq!(a.occurrence_count, 1);
        assert_eq!(a.created_at, a.updated_at);
        assert!(!a.id.is_empty());

        // Lookup is scoped to the owner and accepts any of the fingerprints.
        let hit = store
            .find_for_owner("u1", &["fp-x".into(), "fp-a".into()])
            .await
            .unwrap();
        assert_eq!(hit.as_ref().map(|r| r.id.as_str()), Some(a.id.as_str()));
        assert!(store.find_for_owner("u2", &["fp-a".into()]).await.unwrap().is_none());
        assert!(store.find_for_owner("u1", &[]).await.unwrap().is_none());

        tokio::time::sleep(Duration::from_millis(5)).await;
        let bumped = store.increment_occurrence(&a.id).await.unwrap();
        assert_eq!(bumped.occurrence_count, 2);
        assert!(bumped.updated_at > bumped.created_at);
        assert_eq!(bumped.solution.as_deref(), Some("fix a"));

        // Solutions are write-once.
        let same = store.fill_solution(&a.id, "other").await.unwrap();
        assert_eq!(same.solution.as_deref(), Some("fix a"));
        let pending = store.insert(new_record("u1", "fp-b", None)).await.unwrap();
        let filled = store.fill_solution(&pending.id, "fix b").await.unwrap();
        assert_eq!(filled.solution.as_deref(), Some("fix b"));

        tokio::time::sleep(Duration::from_millis(5)).await;
        store.increment_occurrence(&a.id).await.unwrap();
        let history = store.list_by_owner("u1").await.unwrap();
        let ids: Vec<_> = history.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![a.id.as_str(), pending.id.as_str()]);
        assert!(store.list_by_owner("nobody").await.unwrap().is_empty());

        assert_eq!(store.get(&a.id).await.unwrap().unwrap().occurrence_count, 3);
        assert!(store.get("missing").await.unwrap().is_none());
        assert!(matches!(
            store.increment_occurrence("missing").await,
            Err(PipelineError::Persistence(PersistenceError::Missing(_)))
        ));
    }

    #[tokio::test]
    async fn memory_backend_contract() {
        exercise(StoreBackend::open(None).unwrap()).await;
    }

    #[tokio::test]
    async fn sqlite_backend_contract() {
        exercise(StoreBackend::Sqlite(SqliteLogStore::open_in_memory().unwrap())).await;
    }

    #[tokio::test]
    async fn find_prefers_oldest_match() {
        let store = MemoryLogStore::default();
        let first = store.insert(new_record("u1", "legacy", Some("old"))).await.unwrap();
        store.insert(new_record("u1", "masked", Some("new"))).await.unwrap();
        let hit = store
            .find_for_owner("u1", &["masked".into(), "legacy".into()])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.id, first.id);
    }

    #[test]
    fn record_serializes_camel_case() {
        let now = Utc::now();
        let rec = LogRecord {
            id: "1".into(),
            owner: "u1".into(),
            fingerprint: "f".into(),
            masked_log: "m".into(),
            solution: None,
            occurrence_count: 1,
            created_at: now,
            updated_at: now,
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["maskedLog"], "m");
        assert_eq!(v["occurrenceCount"], 1);
        assert!(v["solution"].is_null());
        assert!(v.get("createdAt").is_some());
    }
}
