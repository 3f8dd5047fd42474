//! Viewer - Trace lookup and comparison
//!
//! Turns stored traces into comparisons that can be rendered by the CLI or
//! attached to a query result when a baseline trace is given.

mod diff;
mod types;

use crate::error::Result;
use crate::store::{TraceQuery, TraceStoreTrait};
use crate::trace::TraceRecord;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

pub use diff::diff_traces;
pub use types::{StageDiff, TraceComparison, TraceDiff};

/// Viewer for querying and comparing traces
#[derive(Clone)]
pub struct TraceViewer {
    store: Arc<dyn TraceStoreTrait>,
}

impl TraceViewer {
    /// Create a viewer over a trace store
    #[must_use]
    pub fn new(store: Arc<dyn TraceStoreTrait>) -> Self {
        Self { store }
    }

    /// Fetch a single trace
    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<TraceRecord> {
        self.store.get_trace(id).await
    }

    /// List recent traces
    #[instrument(skip(self))]
    pub async fn recent(&self, query: &TraceQuery) -> Result<Vec<TraceRecord>> {
        self.store.list_traces(query).await
    }

    /// Compare two stored traces
    #[instrument(skip(self))]
    pub async fn compare(&self, left: Uuid, right: Uuid) -> Result<TraceComparison> {
        let left = self.store.get_trace(left).await?;
        let right = self.store.get_trace(right).await?;
        let diff = diff_traces(&left, &right);

        Ok(TraceComparison { left, right, diff })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTraceStore;
    use crate::trace::{StageSummary, TraceOutcome};

    fn trace(outcome: TraceOutcome, replans: u32, stages: Vec<StageSummary>) -> TraceRecord {
        let mut record = TraceRecord::new(Uuid::new_v4(), "acme", "errors last hour", outcome);
        record.route_kind = Some("plan".to_string());
        record.replan_count = replans;
        record.stages = stages;
        record
    }

    #[test]
    fn test_diff_by_stage() {
        let left = trace(
            TraceOutcome::Success,
            1,
            vec![
                StageSummary::new("route_plan", 1, "ok"),
                StageSummary::new("execute", 1, "warning").with_count("row_count", 0),
                StageSummary::new("execute", 2, "ok").with_count("row_count", 5),
                StageSummary::new("present", 2, "ok"),
            ],
        );
        let right = trace(
            TraceOutcome::Success,
            0,
            vec![
                StageSummary::new("route_plan", 1, "ok"),
                StageSummary::new("execute", 1, "ok").with_count("row_count", 2),
                StageSummary::new("present", 1, "ok"),
            ],
        );

        let diff = diff_traces(&left, &right);
        assert!(diff.question_same);
        assert!(diff.outcome_same);
        assert_eq!(diff.replan_count_diff, 1);
        assert_eq!(diff.stages.len(), 3);

        let execute = &diff.stages[1];
        assert_eq!(execute.stage, "execute");
        assert_eq!(execute.left_runs, 2);
        assert_eq!(execute.right_runs, 1);
        assert_eq!(execute.count_diffs.get("row_count"), Some(&3));
        assert!(execute.is_changed());

        assert!(!diff.stages[0].is_changed());
        assert!(diff.has_stage_changes());
    }

    #[test]
    fn test_diff_stage_only_on_one_side() {
        let left = trace(
            TraceOutcome::Rejected,
            0,
            vec![
                StageSummary::new("route_plan", 1, "ok"),
                StageSummary::new("present", 1, "ok"),
            ],
        );
        let right = trace(
            TraceOutcome::Success,
            0,
            vec![
                StageSummary::new("route_plan", 1, "ok"),
                StageSummary::new("validate", 1, "ok"),
                StageSummary::new("present", 1, "ok"),
            ],
        );

        let diff = diff_traces(&left, &right);
        assert!(!diff.outcome_same);
        let validate = diff.stages.iter().find(|s| s.stage == "validate").unwrap();
        assert_eq!(validate.left_runs, 0);
        assert_eq!(validate.left_status, None);
        assert_eq!(validate.right_status.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn test_viewer_compare_from_store() {
        let store = Arc::new(MemoryTraceStore::new());
        let a = trace(TraceOutcome::Success, 0, vec![StageSummary::new("present", 1, "ok")]);
        let b = trace(TraceOutcome::Guidance, 2, vec![StageSummary::new("present", 3, "ok")]);
        store.save_trace(&a).await.unwrap();
        store.save_trace(&b).await.unwrap();

        let viewer = TraceViewer::new(store);
        let comparison = viewer.compare(a.id, b.id).await.unwrap();
        assert_eq!(comparison.diff.replan_count_diff, -2);
        assert!(!comparison.diff.outcome_same);

        assert!(viewer.compare(a.id, Uuid::new_v4()).await.is_err());
    }
}
