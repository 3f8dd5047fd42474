//! Viewer types

use crate::trace::{StageSummary, TraceRecord};
use serde::{Deserialize, Serialize};

/// Side-by-side comparison of two traces
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceComparison {
    /// Left-hand trace (usually the new run)
    pub left: TraceRecord,
    /// Right-hand trace (usually the baseline)
    pub right: TraceRecord,
    /// Computed differences
    pub diff: TraceDiff,
}

/// Differences between two traces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceDiff {
    /// Whether both traces answered the same question
    pub question_same: bool,
    /// Whether both traces took the same route kind
    pub route_kind_same: bool,
    /// Whether both traces ended with the same outcome
    pub outcome_same: bool,
    /// `left.replan_count - right.replan_count`
    pub replan_count_diff: i64,
    /// `left.duration - right.duration` in milliseconds
    pub duration_diff_ms: i64,
    /// Per-stage differences, in pipeline order of first appearance
    pub stages: Vec<StageDiff>,
}

impl TraceDiff {
    /// Whether any stage differs between the two traces
    #[must_use]
    pub fn has_stage_changes(&self) -> bool {
        self.stages.iter().any(StageDiff::is_changed)
    }
}

/// Differences for one stage name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDiff {
    /// Stage name
    pub stage: String,
    /// Number of times the stage ran on the left
    pub left_runs: usize,
    /// Number of times the stage ran on the right
    pub right_runs: usize,
    /// Final (last attempt) status on the left
    pub left_status: Option<String>,
    /// Final (last attempt) status on the right
    pub right_status: Option<String>,
    /// Summed duration difference in milliseconds
    pub duration_diff_ms: i64,
    /// Count differences on the final run, keyed by count name
    pub count_diffs: std::collections::BTreeMap<String, i64>,
}

impl StageDiff {
    /// Whether the stage ran differently on the two sides
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.left_runs != self.right_runs
            || self.left_status != self.right_status
            || self.count_diffs.values().any(|d| *d != 0)
    }

    pub(crate) fn from_runs(stage: &str, left: &[&StageSummary], right: &[&StageSummary]) -> Self {
        let total = |runs: &[&StageSummary]| -> i64 {
            runs.iter()
                .map(|s| i64::try_from(s.duration_ms).unwrap_or(i64::MAX))
                .sum()
        };

        let left_last = left.last();
        let right_last = right.last();

        let mut count_diffs = std::collections::BTreeMap::new();
        let empty = std::collections::BTreeMap::new();
        let left_counts = left_last.map_or(&empty, |s| &s.counts);
        let right_counts = right_last.map_or(&empty, |s| &s.counts);
        for name in left_counts.keys().chain(right_counts.keys()) {
            let l = left_counts.get(name).copied().unwrap_or(0) as i64;
            let r = right_counts.get(name).copied().unwrap_or(0) as i64;
            count_diffs.insert(name.clone(), l - r);
        }

        Self {
            stage: stage.to_string(),
            left_runs: left.len(),
            right_runs: right.len(),
            left_status: left_last.map(|s| s.status.clone()),
            right_status: right_last.map(|s| s.status.clone()),
            duration_diff_ms: total(left) - total(right),
            count_diffs,
        }
    }
}
