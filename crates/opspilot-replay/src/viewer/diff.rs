//! Viewer Diff - Trace comparison

use super::types::{StageDiff, TraceDiff};
use crate::trace::{StageSummary, TraceRecord};

/// Compute the difference between two traces, stage by stage
#[must_use]
pub fn diff_traces(left: &TraceRecord, right: &TraceRecord) -> TraceDiff {
    let mut names: Vec<&str> = left.stage_names();
    for name in right.stage_names() {
        if !names.contains(&name) {
            names.push(name);
        }
    }

    let stages = names
        .into_iter()
        .map(|name| {
            let l: Vec<&StageSummary> = left.stage_runs(name).collect();
            let r: Vec<&StageSummary> = right.stage_runs(name).collect();
            StageDiff::from_runs(name, &l, &r)
        })
        .collect();

    TraceDiff {
        question_same: left.question == right.question,
        route_kind_same: left.route_kind == right.route_kind,
        outcome_same: left.outcome == right.outcome,
        replan_count_diff: i64::from(left.replan_count) - i64::from(right.replan_count),
        duration_diff_ms: left.duration_ms() - right.duration_ms(),
        stages,
    }
}
