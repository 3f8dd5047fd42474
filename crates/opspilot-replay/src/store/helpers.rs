//! Helper functions for store module

use crate::error::Error;
use crate::trace::{StageSummary, TraceOutcome, TraceRecord};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::path::PathBuf;
use uuid::Uuid;

fn parse_uuid(value: &str) -> Result<Uuid, Error> {
    Uuid::parse_str(value).map_err(|e| Error::Serialization(format!("invalid uuid: {e}")))
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, Error> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Serialization(format!("invalid timestamp: {e}")))
}

/// Convert a SQLite row to a TraceRecord
pub(crate) fn row_to_trace(row: SqliteRow) -> Result<TraceRecord, Error> {
    let id_str: String = row.get("id");
    let outcome_str: String = row.get("outcome");
    let baseline_str: Option<String> = row.get("baseline_trace_id");
    let stages_str: String = row.get("stages");
    let payload_str: String = row.get("payload");
    let started_at_str: String = row.get("started_at");
    let completed_at_str: String = row.get("completed_at");
    let cache_hit: i64 = row.get("cache_hit");
    let test_mode: i64 = row.get("test_mode");
    let replan_count: i64 = row.get("replan_count");

    let outcome: TraceOutcome = outcome_str
        .parse()
        .map_err(|e: String| Error::Serialization(e))?;
    let stages: Vec<StageSummary> = serde_json::from_str(&stages_str)
        .map_err(|e| Error::Serialization(format!("invalid json: {e}")))?;
    let payload: serde_json::Value = serde_json::from_str(&payload_str)
        .map_err(|e| Error::Serialization(format!("invalid json: {e}")))?;

    Ok(TraceRecord {
        id: parse_uuid(&id_str)?,
        tenant_id: row.get("tenant_id"),
        user_id: row.get("user_id"),
        question: row.get("question"),
        route_kind: row.get("route_kind"),
        outcome,
        cache_hit: cache_hit != 0,
        baseline_trace_id: baseline_str.as_deref().map(parse_uuid).transpose()?,
        test_mode: test_mode != 0,
        replan_count: u32::try_from(replan_count).unwrap_or(0),
        stages,
        payload,
        started_at: parse_timestamp(&started_at_str)?,
        completed_at: parse_timestamp(&completed_at_str)?,
    })
}

/// Get the default data directory for Opspilot
#[must_use]
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".opspilot")
}

/// Get the default trace database path
#[must_use]
pub fn default_db_path() -> PathBuf {
    default_data_dir().join("traces.db")
}
