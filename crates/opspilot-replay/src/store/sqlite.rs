//! TraceStore - SQLite-based trace storage

use super::helpers::row_to_trace;
use super::query::TraceQuery;
use super::traits::TraceStoreTrait;
use crate::error::{Error, Result};
use crate::trace::TraceRecord;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::Path;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Trace store backed by SQLite
#[derive(Clone)]
pub struct TraceStore {
    pool: SqlitePool,
}

impl TraceStore {
    /// Create a new trace store with the given connection pool
    ///
    /// The caller is responsible for having run migrations on the pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a trace store from a database path
    ///
    /// Creates the database file and parent directory if needed, then runs migrations.
    pub async fn from_path(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Database(format!("failed to create directory: {e}")))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        info!("SQLite trace store initialized at {}", db_path.display());
        Ok(store)
    }

    /// Create an in-memory trace store (for testing)
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        debug!("In-memory SQLite trace store initialized");
        Ok(store)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS traces (
                id TEXT PRIMARY KEY,
                tenant_id TEXT NOT NULL,
                user_id TEXT,
                question TEXT NOT NULL,
                route_kind TEXT,
                outcome TEXT NOT NULL,
                cache_hit INTEGER NOT NULL DEFAULT 0,
                baseline_trace_id TEXT,
                test_mode INTEGER NOT NULL DEFAULT 0,
                replan_count INTEGER NOT NULL DEFAULT 0,
                stages TEXT NOT NULL DEFAULT '[]',
                payload TEXT NOT NULL DEFAULT '{}',
                started_at TEXT NOT NULL,
                completed_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_traces_tenant
            ON traces(tenant_id, started_at)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_traces_outcome
            ON traces(outcome)
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        debug!("Trace store migrations completed");
        Ok(())
    }

    /// Delete traces that started before the cutoff, returning how many were removed
    #[instrument(skip(self))]
    pub async fn prune_before(&self, cutoff: chrono::DateTime<chrono::Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM traces WHERE started_at < ?1")
            .bind(cutoff.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

#[async_trait::async_trait]
impl TraceStoreTrait for TraceStore {
    #[instrument(skip(self, record), fields(trace_id = %record.id))]
    async fn save_trace(&self, record: &TraceRecord) -> Result<()> {
        let stages = serde_json::to_string(&record.stages)
            .map_err(|e| Error::Serialization(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO traces (
                id, tenant_id, user_id, question, route_kind, outcome, cache_hit,
                baseline_trace_id, test_mode, replan_count, stages, payload,
                started_at, completed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(record.id.to_string())
        .bind(&record.tenant_id)
        .bind(&record.user_id)
        .bind(&record.question)
        .bind(&record.route_kind)
        .bind(record.outcome.as_str())
        .bind(i64::from(record.cache_hit))
        .bind(record.baseline_trace_id.map(|id| id.to_string()))
        .bind(i64::from(record.test_mode))
        .bind(i64::from(record.replan_count))
        .bind(stages)
        .bind(record.payload.to_string())
        .bind(record.started_at.to_rfc3339())
        .bind(record.completed_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        debug!("Saved trace {}", record.id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_trace(&self, id: Uuid) -> Result<TraceRecord> {
        let row = sqlx::query(
            r#"
            SELECT id, tenant_id, user_id, question, route_kind, outcome, cache_hit,
                   baseline_trace_id, test_mode, replan_count, stages, payload,
                   started_at, completed_at
            FROM traces
            WHERE id = ?1
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?
        .ok_or_else(|| Error::NotFound(id.to_string()))?;

        row_to_trace(row)
    }

    #[instrument(skip(self))]
    async fn list_traces(&self, query: &TraceQuery) -> Result<Vec<TraceRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, tenant_id, user_id, question, route_kind, outcome, cache_hit,
                   baseline_trace_id, test_mode, replan_count, stages, payload,
                   started_at, completed_at
            FROM traces
            WHERE (?1 IS NULL OR tenant_id = ?1)
              AND (?2 IS NULL OR outcome = ?2)
            ORDER BY started_at DESC
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(query.tenant_id.as_deref())
        .bind(query.outcome.map(|o| o.as_str()))
        .bind(query.limit)
        .bind(query.offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::Database(e.to_string()))?;

        rows.into_iter().map(row_to_trace).collect()
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
