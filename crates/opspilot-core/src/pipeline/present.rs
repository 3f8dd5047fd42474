//! Present stage
//!
//! The only stage whose output shapes end-user rendering. Direct, reject
//! and plan decisions all come out in the same shape, and notices from the
//! control loop (guidance, action requested, limit exceeded, cancelled)
//! replace the message while keeping whatever partial blocks exist.

use super::stage::{Stage, StageCall, StageName, StageReport};
use crate::assets::AssetKey;
use crate::context::ExecutionContext;
use crate::plan::{Attribution, AttributionKind, PlanPayload, Reference};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

/// How the UI should lay out a result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayModel {
    /// Layout name from the presentation policy
    pub layout: String,
    /// Block ids in display order
    pub block_order: Vec<String>,
    /// Block id → visible
    pub visibility: BTreeMap<String, bool>,
    /// How references are shown (`inline`, `footnote`, `hidden`)
    pub references_policy: String,
    /// How attributions are shown (`footer`, `hidden`)
    pub attributions_policy: String,
    /// Action card ids, appended after the result blocks
    pub action_cards: Vec<String>,
}

impl Default for DisplayModel {
    fn default() -> Self {
        Self {
            layout: "stack".to_string(),
            block_order: Vec::new(),
            visibility: BTreeMap::new(),
            references_policy: "inline".to_string(),
            attributions_policy: "footer".to_string(),
            action_cards: Vec::new(),
        }
    }
}

/// Message override passed by the control loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentNotice {
    /// Outcome the notice belongs to
    pub outcome: String,
    /// Message shown to the user
    pub message: String,
}

impl PresentNotice {
    /// Create a notice
    #[must_use]
    pub fn new(outcome: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            outcome: outcome.into(),
            message: message.into(),
        }
    }

    pub(crate) fn into_params(self) -> Map<String, Value> {
        let mut params = Map::new();
        params.insert(
            "notice".into(),
            json!({"outcome": self.outcome, "message": self.message}),
        );
        params
    }
}

/// Renders the final result and display model
pub struct PresentStage;

#[async_trait::async_trait]
impl Stage for PresentStage {
    fn name(&self) -> StageName {
        StageName::Present
    }

    fn required_assets(&self) -> &[AssetKey] {
        &[AssetKey::PresentationPolicy]
    }

    async fn run(&self, call: StageCall<'_>, ctx: &mut ExecutionContext) -> StageReport {
        let Some(policy) = call.assets.get(AssetKey::PresentationPolicy) else {
            return StageReport::failed("asset_missing", "presentation_policy not resolved");
        };
        let defaults = DisplayModel::default();
        let layout = policy.str_field("layout").unwrap_or(&defaults.layout);
        let references_policy = policy
            .str_field("references_policy")
            .unwrap_or(&defaults.references_policy);
        let attributions_policy = policy
            .str_field("attributions_policy")
            .unwrap_or(&defaults.attributions_policy);
        let hidden_types = policy.str_list("hidden_block_types");
        let max_visible = policy
            .u64_field("max_visible_blocks")
            .map_or(usize::MAX, |n| n as usize);

        let empty = Map::new();
        let prev = call.input.prev_output.as_ref().unwrap_or(&empty);

        let (mut message, blocks, references) = match call.plan_output.map(|p| &p.payload) {
            Some(PlanPayload::Direct(direct)) => {
                ctx.add_attributions(direct.attributions.clone());
                (direct.answer_text.clone(), Vec::new(), direct.references.clone())
            }
            Some(PlanPayload::Reject(reject)) => {
                ctx.add_attributions(reject.attributions.clone());
                if let Some(policy_id) = &reject.policy_id {
                    ctx.add_attributions([Attribution::new(
                        AttributionKind::Policy,
                        policy_id.clone(),
                        reject.reason.clone(),
                    )]);
                }
                let message = match &reject.suggestion {
                    Some(s) => format!("{} {}", reject.reason, s),
                    None => reject.reason.clone(),
                };
                (message, Vec::new(), Vec::new())
            }
            Some(PlanPayload::Plan(_)) | None => {
                let blocks = prev
                    .get("blocks")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                let references: Vec<Reference> = prev
                    .get("references")
                    .cloned()
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default();
                let summary = prev
                    .get("summary")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                (summary, blocks, references)
            }
        };

        let notice: Option<PresentNotice> = call
            .input
            .params
            .get("notice")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok());
        if let Some(notice) = &notice {
            message = notice.message.clone();
        }

        let mut display = DisplayModel {
            layout: layout.to_string(),
            references_policy: references_policy.to_string(),
            attributions_policy: attributions_policy.to_string(),
            ..Default::default()
        };
        for (idx, block) in blocks.iter().enumerate() {
            let id = block
                .get("id")
                .and_then(Value::as_str)
                .map_or_else(|| format!("block-{idx}"), str::to_string);
            let block_type = block.get("type").and_then(Value::as_str).unwrap_or("");
            let visible = idx < max_visible && !hidden_types.iter().any(|t| t == block_type);
            display.visibility.insert(id.clone(), visible);
            display.block_order.push(id);
        }
        display.action_cards = ctx.action_cards.iter().map(|c| c.id.clone()).collect();

        let mut report = StageReport::default();
        report.diagnostics.set_count("blocks", blocks.len() as u64);
        report
            .diagnostics
            .set_count("references", references.len() as u64);
        report
            .diagnostics
            .set_count("action_cards", ctx.action_cards.len() as u64);

        report.result.insert("final_blocks".into(), Value::Array(blocks));
        report.result.insert(
            "final_references".into(),
            serde_json::to_value(&references).unwrap_or_else(|_| json!([])),
        );
        report.result.insert(
            "final_attributions".into(),
            serde_json::to_value(&ctx.final_attributions).unwrap_or_else(|_| json!([])),
        );
        report.result.insert(
            "display_model".into(),
            serde_json::to_value(&display).unwrap_or_else(|_| json!({})),
        );
        report.result.insert(
            "action_cards".into(),
            serde_json::to_value(&ctx.action_cards).unwrap_or_else(|_| json!([])),
        );
        report.result.insert("message".into(), message.into());
        if let Some(notice) = notice {
            report.result.insert("notice".into(), notice.outcome.into());
        }
        report.references = references;
        report
    }
}
