//! Durable store on a single SQLite file.
//!
//! Timestamps are RFC 3339 UTC text with fixed microsecond precision so
//! lexical order equals chronological order. All statements run on the
//! blocking pool.

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use tracing::info;
use uuid::Uuid;

use super::{LogRecord, LogStore, NewLogRecord};
use crate::errors::{PersistenceError, PipelineResult};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS error_logs (
    id               TEXT PRIMARY KEY,
    owner            TEXT NOT NULL,
    fingerprint      TEXT NOT NULL,
    masked_log       TEXT NOT NULL,
    solution         TEXT,
    occurrence_count INTEGER NOT NULL DEFAULT 1,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_error_logs_owner_fingerprint
    ON error_logs (owner, fingerprint);
";

const COLUMNS: &str =
    "id, owner, fingerprint, masked_log, solution, occurrence_count, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct SqliteLogStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLogStore {
    /// Opens (creating if needed) the database at `path` and applies the schema.
    ///
    /// # Errors
    /// Fails if the parent directory cannot be created or the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> PipelineResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                PersistenceError::Unavailable(format!("cannot create {}: {e}", parent.display()))
            })?;
        }
        let conn = Connection::open(path)?;
        let store = Self::init(conn)?;
        info!(path = %path.display(), "sqlite log store ready");
        Ok(store)
    }

    pub fn open_in_memory() -> PipelineResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> PipelineResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> PipelineResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> PipelineResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| {
                PersistenceError::Unavailable("sqlite connection lock poisoned".into())
            })?;
            f(&guard)
        })
        .await?
    }
}

fn ts(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Row as stored, before timestamp and counter validation.
struct RawRow {
    id: String,
    owner: String,
    fingerprint: String,
    masked_log: String,
    solution: Option<String>,
    occurrence_count: i64,
    created_at: String,
    updated_at: String,
}

impl RawRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            owner: row.get(1)?,
            fingerprint: row.get(2)?,
            masked_log: row.get(3)?,
            solution: row.get(4)?,
            occurrence_count: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn into_record(self) -> Result<LogRecord, PersistenceError> {
        let corrupt = |reason: String| PersistenceError::Corrupt {
            id: self.id.clone(),
            reason,
        };
        let parse = |s: &str| {
            DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| corrupt(format!("bad timestamp {s:?}: {e}")))
        };
        let created_at = parse(&self.created_at)?;
        let updated_at = parse(&self.updated_at)?;
        let occurrence_count = u64::try_from(self.occurrence_count)
            .map_err(|_| corrupt(format!("negative count {}", self.occurrence_count)))?;

        Ok(LogRecord {
            id: self.id,
            owner: self.owner,
            fingerprint: self.fingerprint,
            masked_log: self.masked_log,
            solution: self.solution,
            occurrence_count,
            created_at,
            updated_at,
        })
    }
}

fn select_by_id(conn: &Connection, id: &str) -> PipelineResult<Option<LogRecord>> {
    let raw = conn
        .query_row(
            &format!("SELECT {COLUMNS} FROM error_logs WHERE id = ?1"),
            params![id],
            RawRow::from_row,
        )
        .optional()?;
    Ok(raw.map(RawRow::into_record).transpose()?)
}

fn require_by_id(conn: &Connection, id: &str) -> PipelineResult<LogRecord> {
    select_by_id(conn, id)?.ok_or_else(|| PersistenceError::Missing(id.to_string()).into())
}

impl LogStore for SqliteLogStore {
    async fn find_for_owner(
        &self,
        owner: &str,
        fingerprints: &[String],
    ) -> PipelineResult<Option<LogRecord>> {
        if fingerprints.is_empty() {
            return Ok(None);
        }
        let placeholders = (2..fingerprints.len() + 2)
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {COLUMNS} FROM error_logs \
             WHERE owner = ?1 AND fingerprint IN ({placeholders}) \
             ORDER BY created_at ASC LIMIT 1"
        );
        let mut args = Vec::with_capacity(fingerprints.len() + 1);
        args.push(owner.to_string());
        args.extend(fingerprints.iter().cloned());

        self.with_conn(move |conn| {
            let raw = conn
                .query_row(&sql, params_from_iter(args.iter()), RawRow::from_row)
                .optional()?;
            Ok(raw.map(RawRow::into_record).transpose()?)
        })
        .await
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
        let row = rec.clone();
        self.with_conn(move |conn| {
            conn.execute(
                &format!("INSERT INTO error_logs ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                params![
                    row.id,
                    row.owner,
                    row.fingerprint,
                    row.masked_log,
                    row.solution,
                    1_i64,
                    ts(&row.created_at),
                    ts(&row.updated_at),
                ],
            )?;
            Ok(())
        })
        .await?;
        Ok(rec)
    }

    async fn increment_occurrence(&self, id: &str) -> PipelineResult<LogRecord> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE error_logs \
                 SET occurrence_count = occurrence_count + 1, updated_at = ?2 \
                 WHERE id = ?1",
                params![id, ts(&Utc::now())],
            )?;
            require_by_id(conn, &id)
        })
        .await
    }

    async fn fill_solution(&self, id: &str, solution: &str) -> PipelineResult<LogRecord> {
        let id = id.to_string();
        let solution = solution.to_string();
        self.with_conn(move |conn| {
            conn.execute(
                "UPDATE error_logs SET solution = ?2, updated_at = ?3 \
                 WHERE id = ?1 AND solution IS NULL",
                params![id, solution, ts(&Utc::now())],
            )?;
            require_by_id(conn, &id)
        })
        .await
    }

    async fn get(&self, id: &str) -> PipelineResult<Option<LogRecord>> {
        let id = id.to_string();
        self.with_conn(move |conn| select_by_id(conn, &id)).await
    }

    async fn list_by_owner(&self, owner: &str) -> PipelineResult<Vec<LogRecord>> {
        let owner = owner.to_string();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM error_logs WHERE owner = ?1 \
                 ORDER BY updated_at DESC, created_at DESC"
            ))?;
            let rows = stmt
                .query_map(params![owner], RawRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows
                .into_iter()
                .map(RawRow::into_record)
                .collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }
}
