//! Trait for trace storage backends

use super::query::TraceQuery;
use crate::error::Result;
use crate::trace::TraceRecord;
use uuid::Uuid;

/// Trait for trace storage backends
///
/// Traces are written once per run and never updated.
#[async_trait::async_trait]
pub trait TraceStoreTrait: Send + Sync {
    /// Persist a finished trace
    async fn save_trace(&self, record: &TraceRecord) -> Result<()>;

    /// Fetch a trace by id
    async fn get_trace(&self, id: Uuid) -> Result<TraceRecord>;

    /// List traces, newest first
    async fn list_traces(&self, query: &TraceQuery) -> Result<Vec<TraceRecord>>;

    /// Get the store name (for logging)
    fn name(&self) -> &str;
}
