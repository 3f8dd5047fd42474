//! Compose stage

use super::stage::{Stage, StageCall, StageName, StageReport};
use crate::assets::AssetKey;
use crate::context::ExecutionContext;
use crate::plan::Reference;
use serde_json::{json, Map, Value};

/// Turns execute results into blocks and references
///
/// Rules payload (`result_shaping`): `min_evidence` (default 1),
/// `metric_single_value` (default true).
pub struct ComposeStage;

fn column_names(rows: &[Value]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        if let Value::Object(map) = row {
            for key in map.keys() {
                if !columns.contains(key) {
                    columns.push(key.clone());
                }
            }
        }
    }
    columns
}

fn single_value(rows: &[Value]) -> Option<(String, Value)> {
    match rows {
        [Value::Object(map)] if map.len() == 1 => {
            map.iter().next().map(|(k, v)| (k.clone(), v.clone()))
        }
        _ => None,
    }
}

#[async_trait::async_trait]
impl Stage for ComposeStage {
    fn name(&self) -> StageName {
        StageName::Compose
    }

    fn required_assets(&self) -> &[AssetKey] {
        &[AssetKey::ResultShaping]
    }

    async fn run(&self, call: StageCall<'_>, _ctx: &mut ExecutionContext) -> StageReport {
        let Some(rules) = call.assets.get(AssetKey::ResultShaping) else {
            return StageReport::failed("asset_missing", "result_shaping not resolved");
        };
        let min_evidence = rules.u64_field("min_evidence").unwrap_or(1);
        let metric_single_value = rules
            .payload
            .get("metric_single_value")
            .and_then(Value::as_bool)
            .unwrap_or(true);

        let empty = Map::new();
        let prev = call.input.prev_output.as_ref().unwrap_or(&empty);
        let step_results = prev
            .get("step_results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut report = StageReport::default();
        let mut blocks: Vec<Value> = Vec::new();
        let mut sources: Vec<String> = Vec::new();

        for step in &step_results {
            let rows = step
                .get("rows")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            if rows.is_empty() {
                continue;
            }

            let step_id = step.get("step_id").and_then(Value::as_str).unwrap_or("");
            let source = step.get("source").and_then(Value::as_str).unwrap_or("");
            let operation = step.get("operation").and_then(Value::as_str).unwrap_or("");
            let title = format!("{source}.{operation}");

            let block = match single_value(&rows).filter(|_| metric_single_value) {
                Some((label, value)) => json!({
                    "id": format!("block-{step_id}"),
                    "type": "metric",
                    "title": title,
                    "step_id": step_id,
                    "label": label,
                    "value": value,
                }),
                None => json!({
                    "id": format!("block-{step_id}"),
                    "type": "table",
                    "title": title,
                    "step_id": step_id,
                    "columns": column_names(&rows),
                    "rows": rows,
                }),
            };
            blocks.push(block);

            report.references.push(Reference {
                source: source.to_string(),
                locator: format!("{step_id}/{operation}"),
                title,
                row_count: rows.len() as u64,
            });
            if !sources.iter().any(|s| s == source) {
                sources.push(source.to_string());
            }
        }

        let reference_count = report.references.len() as u64;
        if reference_count < min_evidence {
            report.diagnostics.error(
                "low_evidence",
                format!("{reference_count} supporting references, {min_evidence} required"),
            );
        }

        report
            .diagnostics
            .set_count("blocks", blocks.len() as u64);
        report
            .diagnostics
            .set_count("references", reference_count);

        let summary = format!(
            "{} result block(s) from {} source(s)",
            blocks.len(),
            sources.len()
        );
        report
            .result
            .insert("block_count".into(), (blocks.len() as u64).into());
        report.result.insert("blocks".into(), Value::Array(blocks));
        report.result.insert("summary".into(), summary.into());
        report.result.insert(
            "references".into(),
            serde_json::to_value(&report.references).unwrap_or_else(|_| json!([])),
        );
        report
    }
}
