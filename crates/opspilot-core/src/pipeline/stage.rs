//! Stage contract: names, inputs, outputs and diagnostics

use crate::assets::{AssetKey, AssetVersion};
use crate::context::ExecutionContext;
use crate::plan::{PlanOutput, Reference};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

// ============================================================================
// Stage names
// ============================================================================

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    /// Routing and planning (runs inside the router)
    RoutePlan,
    /// Plan validation
    Validate,
    /// Data lookups
    Execute,
    /// Result shaping
    Compose,
    /// Rendering
    Present,
}

impl StageName {
    /// All stages in pipeline order
    pub const ORDER: [StageName; 5] = [
        StageName::RoutePlan,
        StageName::Validate,
        StageName::Execute,
        StageName::Compose,
        StageName::Present,
    ];

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoutePlan => "route_plan",
            Self::Validate => "validate",
            Self::Execute => "execute",
            Self::Compose => "compose",
            Self::Present => "present",
        }
    }

    /// Stage that runs before this one
    #[must_use]
    pub fn previous(&self) -> Option<StageName> {
        let idx = Self::ORDER.iter().position(|s| s == self)?;
        idx.checked_sub(1).map(|i| Self::ORDER[i])
    }

    /// This stage and every later one, in order
    #[must_use]
    pub fn from_here(&self) -> &'static [StageName] {
        let idx = Self::ORDER.iter().position(|s| s == self).unwrap_or(0);
        &Self::ORDER[idx..]
    }

    /// Mandatory result keys with type-correct defaults
    #[must_use]
    pub fn default_result(&self) -> Map<String, Value> {
        let value = match self {
            Self::RoutePlan => json!({
                "kind": "",
                "routing_reasoning": "",
                "plan": {},
                "cache_hit": false,
                "elapsed_ms": 0,
            }),
            Self::Validate => json!({
                "valid": false,
                "checked_steps": 0,
                "issues": [],
                "plan": {},
            }),
            Self::Execute => json!({
                "rows": [],
                "row_count": 0,
                "step_results": [],
            }),
            Self::Compose => json!({
                "blocks": [],
                "block_count": 0,
                "summary": "",
                "references": [],
            }),
            Self::Present => json!({
                "final_blocks": [],
                "final_references": [],
                "final_attributions": [],
                "display_model": {},
                "action_cards": [],
                "message": "",
            }),
        };
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }
}

impl std::fmt::Display for StageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for StageName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ORDER
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown stage: {s}"))
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// Diagnostics status
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticStatus {
    /// Nothing to report
    #[default]
    Ok,
    /// Completed with caveats
    Warning,
    /// Completed but failed
    Error,
}

impl DiagnosticStatus {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// One warning or error
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticIssue {
    /// Raw code (normalized into a trigger by the control loop)
    pub code: String,
    /// Human-readable message
    pub message: String,
}

/// Name of the empty flag the execute stage raises when nothing came back
pub const RESULT_EMPTY: &str = "result_empty";

/// What a stage reports about its own run
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Overall status
    pub status: DiagnosticStatus,
    /// Warnings
    #[serde(default)]
    pub warnings: Vec<DiagnosticIssue>,
    /// Errors
    #[serde(default)]
    pub errors: Vec<DiagnosticIssue>,
    /// Emptiness flags such as `result_empty`
    #[serde(default)]
    pub empty_flags: BTreeMap<String, bool>,
    /// Counts such as rows, blocks, references
    #[serde(default)]
    pub counts: BTreeMap<String, u64>,
}

impl StageDiagnostics {
    /// Clean diagnostics
    #[must_use]
    pub fn ok() -> Self {
        Self::default()
    }

    /// Diagnostics with a single error
    #[must_use]
    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        let mut diagnostics = Self::default();
        diagnostics.error(code, message);
        diagnostics
    }

    /// Record a warning
    pub fn warn(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(DiagnosticIssue {
            code: code.into(),
            message: message.into(),
        });
        self.status = self.status.max(DiagnosticStatus::Warning);
    }

    /// Record an error
    pub fn error(&mut self, code: impl Into<String>, message: impl Into<String>) {
        self.errors.push(DiagnosticIssue {
            code: code.into(),
            message: message.into(),
        });
        self.status = DiagnosticStatus::Error;
    }

    /// Set an emptiness flag
    pub fn flag_empty(&mut self, name: impl Into<String>) {
        self.empty_flags.insert(name.into(), true);
    }

    /// Whether an emptiness flag is set
    #[must_use]
    pub fn is_empty_flagged(&self, name: &str) -> bool {
        self.empty_flags.get(name).copied().unwrap_or(false)
    }

    /// Set a count
    pub fn set_count(&mut self, name: impl Into<String>, value: u64) {
        self.counts.insert(name.into(), value);
    }

    /// Whether these diagnostics, reported by `stage`, call for the control loop
    #[must_use]
    pub fn is_anomaly(&self, stage: StageName) -> bool {
        self.status == DiagnosticStatus::Error
            || (stage == StageName::Execute && self.is_empty_flagged(RESULT_EMPTY))
    }

    /// Raw trigger string describing the anomaly
    ///
    /// The first error code wins; an empty execute result reports `empty_result`.
    #[must_use]
    pub fn trigger_code(&self) -> String {
        if let Some(issue) = self.errors.first() {
            return issue.code.clone();
        }
        if self.is_empty_flagged(RESULT_EMPTY) {
            return "empty_result".to_string();
        }
        String::new()
    }
}

// ============================================================================
// Inputs / outputs
// ============================================================================

/// What a stage was called with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageInput {
    /// Stage name
    pub stage: StageName,
    /// Pipeline attempt (1-based)
    pub attempt: u32,
    /// Logical asset key → resolved version id
    pub applied_assets: BTreeMap<String, String>,
    /// Stage parameters
    pub params: Map<String, Value>,
    /// Previous stage's result, `None` for the first stage
    pub prev_output: Option<Map<String, Value>>,
}

/// What a stage produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutput {
    /// Stage name
    pub stage: StageName,
    /// Pipeline attempt (1-based)
    pub attempt: u32,
    /// Stage-specific result; mandatory keys are always present
    pub result: Map<String, Value>,
    /// Diagnostics
    pub diagnostics: StageDiagnostics,
    /// External evidence produced by the stage
    pub references: Vec<Reference>,
    /// Wall time of the stage's own work
    pub duration_ms: u64,
}

impl StageOutput {
    /// Output carrying only the mandatory defaults
    #[must_use]
    pub fn empty(stage: StageName, attempt: u32) -> Self {
        Self {
            stage,
            attempt,
            result: stage.default_result(),
            diagnostics: StageDiagnostics::ok(),
            references: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Build an output from a stage report, filling in missing mandatory keys
    #[must_use]
    pub fn from_report(stage: StageName, attempt: u32, report: StageReport, duration_ms: u64) -> Self {
        let mut result = stage.default_result();
        for (key, value) in report.result {
            let keep_default = value.is_null() && result.contains_key(&key);
            if !keep_default {
                result.insert(key, value);
            }
        }
        Self {
            stage,
            attempt,
            result,
            diagnostics: report.diagnostics,
            references: report.references,
            duration_ms,
        }
    }

    /// Whether this output calls for the control loop
    #[must_use]
    pub fn is_anomaly(&self) -> bool {
        self.diagnostics.is_anomaly(self.stage)
    }
}

/// What a stage implementation returns
#[derive(Debug, Clone, Default)]
pub struct StageReport {
    /// Result keys (merged over the stage's defaults)
    pub result: Map<String, Value>,
    /// Diagnostics
    pub diagnostics: StageDiagnostics,
    /// References
    pub references: Vec<Reference>,
}

impl StageReport {
    /// Report with a single error and no result
    #[must_use]
    pub fn failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            diagnostics: StageDiagnostics::failed(code, message),
            ..Default::default()
        }
    }
}

/// Assets resolved for one stage call
#[derive(Debug, Clone, Default)]
pub struct StageAssets {
    assets: BTreeMap<String, AssetVersion>,
}

impl StageAssets {
    /// Wrap resolved assets
    #[must_use]
    pub fn new(assets: BTreeMap<String, AssetVersion>) -> Self {
        Self { assets }
    }

    /// Asset for a key
    #[must_use]
    pub fn get(&self, key: AssetKey) -> Option<&AssetVersion> {
        self.assets.get(key.as_str())
    }

    /// Key → version id map recorded in [`StageInput::applied_assets`]
    #[must_use]
    pub fn version_map(&self) -> BTreeMap<String, String> {
        self.assets
            .iter()
            .map(|(k, v)| (k.clone(), v.version_id.clone()))
            .collect()
    }
}

/// Everything a stage reads for one call
pub struct StageCall<'a> {
    /// The recorded input
    pub input: &'a StageInput,
    /// Routing decision, absent when routing itself failed
    pub plan_output: Option<&'a PlanOutput>,
    /// Resolved assets
    pub assets: &'a StageAssets,
}

/// One replaceable pipeline stage
#[async_trait::async_trait]
pub trait Stage: Send + Sync {
    /// Which stage this implements
    fn name(&self) -> StageName;

    /// Asset keys resolved before each call
    fn required_assets(&self) -> &[AssetKey];

    /// Run the stage
    ///
    /// Failures are reported through diagnostics; the executor supplies
    /// timing and the mandatory result defaults.
    async fn run(&self, call: StageCall<'_>, ctx: &mut ExecutionContext) -> StageReport;
}
