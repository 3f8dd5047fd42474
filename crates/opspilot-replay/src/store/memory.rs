//! In-memory trace store

use super::query::TraceQuery;
use super::traits::TraceStoreTrait;
use crate::error::{Error, Result};
use crate::trace::TraceRecord;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Trace store that keeps records in process memory
#[derive(Clone, Default)]
pub struct MemoryTraceStore {
    traces: Arc<RwLock<Vec<TraceRecord>>>,
}

impl MemoryTraceStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored traces
    pub async fn len(&self) -> usize {
        self.traces.read().await.len()
    }

    /// Whether the store is empty
    pub async fn is_empty(&self) -> bool {
        self.traces.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl TraceStoreTrait for MemoryTraceStore {
    async fn save_trace(&self, record: &TraceRecord) -> Result<()> {
        let mut traces = self.traces.write().await;
        if traces.iter().any(|t| t.id == record.id) {
            return Err(Error::Database(format!("duplicate trace id: {}", record.id)));
        }
        traces.push(record.clone());
        Ok(())
    }

    async fn get_trace(&self, id: Uuid) -> Result<TraceRecord> {
        self.traces
            .read()
            .await
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    async fn list_traces(&self, query: &TraceQuery) -> Result<Vec<TraceRecord>> {
        let traces = self.traces.read().await;
        let mut matching: Vec<TraceRecord> = traces
            .iter()
            .filter(|t| query.matches(t))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));

        let offset = usize::try_from(query.offset).unwrap_or(0);
        let limit = usize::try_from(query.limit).unwrap_or(0);
        Ok(matching.into_iter().skip(offset).take(limit).collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
