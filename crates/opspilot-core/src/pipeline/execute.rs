//! Execute stage

use super::stage::{Stage, StageCall, StageName, StageReport, RESULT_EMPTY};
use crate::assets::AssetKey;
use crate::context::ExecutionContext;
use crate::data::{DataSource, LookupQuery};
use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// Runs one lookup per plan step through the [`DataSource`]
///
/// Lookups run concurrently and are all joined before diagnostics are
/// reported.
pub struct ExecuteStage {
    data: Arc<dyn DataSource>,
}

impl ExecuteStage {
    /// Create an execute stage over a data source
    #[must_use]
    pub fn new(data: Arc<dyn DataSource>) -> Self {
        Self { data }
    }
}

#[async_trait::async_trait]
impl Stage for ExecuteStage {
    fn name(&self) -> StageName {
        StageName::Execute
    }

    fn required_assets(&self) -> &[AssetKey] {
        &[]
    }

    async fn run(&self, call: StageCall<'_>, _ctx: &mut ExecutionContext) -> StageReport {
        let Some(plan) = call.plan_output.and_then(|p| p.as_plan()) else {
            return StageReport::failed("plan_invalid", "no plan to execute");
        };

        let queries: Vec<LookupQuery> = plan
            .steps
            .iter()
            .map(|step| LookupQuery {
                step_id: step.id.clone(),
                source: step.source.clone(),
                operation: step.operation.clone(),
                params: step.params.clone(),
                time_window_hours: plan.view.time_window_hours,
                max_rows: plan.limits.max_rows,
            })
            .collect();

        let results = join_all(queries.iter().map(|q| self.data.lookup(q))).await;

        let mut report = StageReport::default();
        let max_rows = plan.limits.max_rows as usize;
        let mut all_rows: Vec<Value> = Vec::new();
        let mut step_results: Vec<Value> = Vec::new();

        for (query, mut result) in queries.iter().zip(results) {
            if let Some(error) = &result.error {
                report.diagnostics.error(
                    error.code.clone(),
                    format!("{}: {}", query.step_id, error.message),
                );
            }
            if result.rows.len() > max_rows {
                report.diagnostics.warn(
                    "rows_truncated",
                    format!(
                        "{} returned {} rows, kept {max_rows}",
                        query.step_id,
                        result.rows.len()
                    ),
                );
                result.rows.truncate(max_rows);
            }
            debug!(step = %query.step_id, rows = result.rows.len(), "Lookup finished");

            step_results.push(json!({
                "step_id": query.step_id,
                "source": query.source,
                "operation": query.operation,
                "status": result.status,
                "row_count": result.rows.len(),
                "error_code": result.error.as_ref().map(|e| e.code.clone()),
                "rows": result.rows.clone(),
            }));
            all_rows.extend(result.rows);
        }

        let row_count = all_rows.len() as u64;
        report.diagnostics.set_count("rows", row_count);
        report.diagnostics.set_count("steps", queries.len() as u64);
        if row_count == 0 && report.diagnostics.errors.is_empty() {
            report.diagnostics.flag_empty(RESULT_EMPTY);
            report
                .diagnostics
                .warn("empty_result", "no step returned any rows");
        }

        report.result.insert("rows".into(), Value::Array(all_rows));
        report.result.insert("row_count".into(), row_count.into());
        report
            .result
            .insert("step_results".into(), Value::Array(step_results));
        report
    }
}
