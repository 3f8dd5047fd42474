//! Validate stage

use super::stage::{Stage, StageCall, StageName, StageReport};
use crate::assets::AssetKey;
use crate::context::ExecutionContext;
use serde_json::{json, Value};
use std::collections::HashSet;

const DEFAULT_MAX_STEPS: u64 = 8;
const DEFAULT_MAX_ROWS_CAP: u64 = 1000;

/// Checks a plan against the `validation_rules` asset
///
/// Rules payload: `max_steps`, `max_rows_cap`, `allowed_sources` (empty
/// means any), `blocked_operations` (`source.operation` or bare operation).
pub struct ValidateStage;

#[async_trait::async_trait]
impl Stage for ValidateStage {
    fn name(&self) -> StageName {
        StageName::Validate
    }

    fn required_assets(&self) -> &[AssetKey] {
        &[AssetKey::ValidationRules]
    }

    async fn run(&self, call: StageCall<'_>, _ctx: &mut ExecutionContext) -> StageReport {
        let Some(plan) = call.plan_output.and_then(|p| p.as_plan()) else {
            return StageReport::failed("plan_invalid", "no plan to validate");
        };
        let Some(rules) = call.assets.get(AssetKey::ValidationRules) else {
            return StageReport::failed("asset_missing", "validation_rules not resolved");
        };

        let max_steps = rules.u64_field("max_steps").unwrap_or(DEFAULT_MAX_STEPS);
        let max_rows_cap = rules.u64_field("max_rows_cap").unwrap_or(DEFAULT_MAX_ROWS_CAP);
        let allowed_sources = rules.str_list("allowed_sources");
        let blocked_operations = rules.str_list("blocked_operations");

        let mut report = StageReport::default();
        let diagnostics = &mut report.diagnostics;

        if plan.steps.is_empty() {
            diagnostics.error("plan_invalid", "plan has no steps");
        }
        if plan.steps.len() as u64 > max_steps {
            diagnostics.error(
                "limit_exceeded",
                format!("plan has {} steps, at most {max_steps} allowed", plan.steps.len()),
            );
        }

        let mut seen = HashSet::new();
        for step in &plan.steps {
            if !seen.insert(step.id.as_str()) {
                diagnostics.error("plan_invalid", format!("duplicate step id '{}'", step.id));
            }
            if !allowed_sources.is_empty() && !allowed_sources.contains(&step.source) {
                diagnostics.error(
                    "policy_blocked",
                    format!("source '{}' is not allowed", step.source),
                );
            }
            let qualified = format!("{}.{}", step.source, step.operation);
            if blocked_operations
                .iter()
                .any(|b| b == &qualified || b == &step.operation)
            {
                diagnostics.error(
                    "policy_blocked",
                    format!("operation '{qualified}' is blocked"),
                );
            }
        }

        if u64::from(plan.limits.max_rows) > max_rows_cap {
            diagnostics.warn(
                "max_rows_capped",
                format!(
                    "max_rows {} exceeds cap {max_rows_cap}",
                    plan.limits.max_rows
                ),
            );
        }

        diagnostics.set_count("steps", plan.steps.len() as u64);
        let issues: Vec<Value> = diagnostics
            .errors
            .iter()
            .chain(diagnostics.warnings.iter())
            .map(|i| json!({"code": i.code, "message": i.message}))
            .collect();
        let valid = diagnostics.errors.is_empty();

        report.result.insert("valid".into(), valid.into());
        report
            .result
            .insert("checked_steps".into(), (plan.steps.len() as u64).into());
        report.result.insert("issues".into(), Value::Array(issues));
        report.result.insert(
            "plan".into(),
            serde_json::to_value(plan).unwrap_or_else(|_| json!({})),
        );
        report
    }
}
