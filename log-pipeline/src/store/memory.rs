//! In-process store; contents are lost on restart.

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{LogRecord, LogStore, NewLogRecord};
use crate::errors::{PersistenceError, PipelineResult};

#[derive(Debug, Default)]
pub struct MemoryLogStore {
    records: RwLock<Vec<LogRecord>>,
}

impl MemoryLogStore {
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn update<F>(records: &mut [LogRecord], id: &str, f: F) -> PipelineResult<LogRecord>
    where
        F: FnOnce(&mut LogRecord),
    {
        let rec = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PersistenceError::Missing(id.to_string()))?;
        f(rec);
        Ok(rec.clone())
    }
}

impl LogStore for MemoryLogStore {
    async fn find_for_owner(
        &self,
        owner: &str,
        fingerprints: &[String],
    ) -> PipelineResult<Option<LogRecord>> {
        let records = self.records.read().await;
        // Insertion order is creation order.
        Ok(records
            .iter()
            .find(|r| r.owner == owner && fingerprints.iter().any(|f| *f == r.fingerprint))
            .cloned())
    }

    async fn insert(&self, new: NewLogRecord) -> PipelineResult<LogRecord> {
        let now = Utc::now();
        let rec = LogRecord {
            id: Uuid::new_v4().to_string(),
            owner: new.owner,
            fingerprint: new.fingerprint,
            masked_log: new.masked_log,
            solution: new.solution,
            occurrence_count: 1,
            created_at: now,
            updated_at: now,
        };
        self.records.write().await.push(rec.clone());
        Ok(rec)
    }

    async fn increment_occurrence(&self, id: &str) -> PipelineResult<LogRecord> {
        let mut records = self.records.write().await;
        Self::update(&mut records, id, |r| {
            r.occurrence_count += 1;
            r.updated_at = Utc::now();
        })
    }

    async fn fill_solution(&self, id: &str, solution: &str) -> PipelineResult<LogRecord> {
        let mut records = self.records.write().await;
        Self::update(&mut records, id, |r| {
            if r.solution.is_none() {
                r.solution = Some(solution.to_string());
                r.updated_at = Utc::now();
            }
        })
    }

    async fn get(&self, id: &str) -> PipelineResult<Option<LogRecord>> {
        Ok(self.records.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn list_by_owner(&self, owner: &str) -> PipelineResult<Vec<LogRecord>> {
        let mut out: Vec<LogRecord> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.owner == owner)
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(out)
    }
}
