//! Query result (the produced interface)

use crate::context::ExecutionContext;
use crate::control::{ActionCard, LoopResult, QueryOutcome, ReplanEvent};
use crate::pipeline::{DisplayModel, StageInput, StageOutput};
use crate::plan::{Attribution, PlanOutput, Reference};
use chrono::{DateTime, Utc};
use opspilot_replay::{StageSummary, TraceDiff, TraceRecord};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Everything a renderer or auditor needs about one request
///
/// Every list defaults to empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    /// Trace identifier
    pub trace_id: Uuid,
    /// Terminal outcome
    pub outcome: QueryOutcome,
    /// Routing decision as last executed, absent when routing failed
    pub plan_output: Option<PlanOutput>,
    /// Result blocks in display order
    #[serde(default)]
    pub final_blocks: Vec<Value>,
    /// External evidence
    #[serde(default)]
    pub final_references: Vec<Reference>,
    /// Internal justification
    #[serde(default)]
    pub final_attributions: Vec<Attribution>,
    /// Answer or notice text
    #[serde(default)]
    pub message: String,
    /// Layout, block order, visibility and action cards
    #[serde(default)]
    pub display_model: DisplayModel,
    /// Action cards raised by the control loop
    #[serde(default)]
    pub action_cards: Vec<ActionCard>,
    /// Stage inputs across all attempts
    #[serde(default)]
    pub stage_inputs: Vec<StageInput>,
    /// Stage outputs across all attempts
    #[serde(default)]
    pub stage_outputs: Vec<StageOutput>,
    /// Replan history in arrival order
    #[serde(default)]
    pub replan_events: Vec<ReplanEvent>,
    /// Number of patches applied
    #[serde(default)]
    pub replans_applied: u32,
    /// Whether routing was served from the cache
    #[serde(default)]
    pub cache_hit: bool,
    /// Wall time of the request
    #[serde(default)]
    pub duration_ms: u64,
    /// Difference against the baseline trace, when one was requested and found
    #[serde(default)]
    pub baseline_diff: Option<TraceDiff>,
}

fn list<T: serde::de::DeserializeOwned>(result: &Map<String, Value>, key: &str) -> Vec<T> {
    result
        .get(key)
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

impl QueryResult {
    pub(crate) fn assemble(ctx: &ExecutionContext, run: LoopResult, duration_ms: u64) -> Self {
        let final_result = &run.final_result;
        let display_model = final_result
            .get("display_model")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        let message = final_result
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            trace_id: ctx.trace_id,
            outcome: run.outcome,
            final_blocks: list(final_result, "final_blocks"),
            final_references: list(final_result, "final_references"),
            final_attributions: ctx.final_attributions.clone(),
            message,
            display_model,
            action_cards: ctx.action_cards.clone(),
            plan_output: run.plan_output,
            stage_inputs: run.stage_inputs,
            stage_outputs: run.stage_outputs,
            replan_events: run.replan_events,
            replans_applied: run.replans_applied,
            cache_hit: ctx.cache_hit,
            duration_ms,
            baseline_diff: None,
        }
    }

    /// Whether the request ended in `success` or `rejected`
    #[must_use]
    pub fn is_answered(&self) -> bool {
        matches!(self.outcome, QueryOutcome::Success | QueryOutcome::Rejected)
    }

    /// Build the persisted trace record for this result
    #[must_use]
    pub fn to_trace_record(&self, ctx: &ExecutionContext, started_at: DateTime<Utc>) -> TraceRecord {
        let mut record = TraceRecord::new(
            self.trace_id,
            ctx.tenant_id.clone(),
            ctx.question.clone(),
            self.outcome.into(),
        );
        record.user_id = ctx.user_id.clone();
        record.route_kind = self
            .plan_output
            .as_ref()
            .map(|p| p.kind().as_str().to_string());
        record.cache_hit = self.cache_hit;
        record.baseline_trace_id = ctx.baseline_trace_id;
        record.test_mode = ctx.test_mode;
        record.replan_count = self.replans_applied;
        record.stages = self.stage_outputs.iter().map(stage_summary).collect();
        record.payload = serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()));
        record.started_at = started_at;
        record.completed_at = started_at + chrono::Duration::milliseconds(self.duration_ms as i64);
        record
    }
}

fn stage_summary(output: &StageOutput) -> StageSummary {
    let diagnostics = &output.diagnostics;
    let mut summary = StageSummary::new(
        output.stage.as_str(),
        output.attempt,
        diagnostics.status.as_str(),
    )
    .with_duration(output.duration_ms);
    if let Some(issue) = diagnostics.errors.first() {
        summary = summary.with_error_code(issue.code.clone());
    }
    for (name, value) in &diagnostics.counts {
        summary = summary.with_count(name.clone(), *value);
    }
    summary
}
