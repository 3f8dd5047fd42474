//! Payload types for the three routing outcomes

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

/// Default lookback window for a plan view, in hours
pub const DEFAULT_TIME_WINDOW_HOURS: u32 = 24;
/// Default row limit for a plan
pub const DEFAULT_MAX_ROWS: u32 = 100;

// ============================================================================
// Attribution / Reference
// ============================================================================

/// Where an attribution comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionKind {
    /// A tenant policy
    Policy,
    /// A configured rule
    Rule,
    /// Built-in system knowledge
    SystemKnowledge,
}

/// Internal justification for an answer (never external data)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribution {
    /// Attribution origin
    pub kind: AttributionKind,
    /// Identifier of the policy or rule
    pub source_id: String,
    /// Human-readable description
    #[serde(default)]
    pub description: String,
}

impl Attribution {
    /// Create an attribution
    #[must_use]
    pub fn new(
        kind: AttributionKind,
        source_id: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            source_id: source_id.into(),
            description: description.into(),
        }
    }
}

/// External evidence backing an answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    /// Data source name
    pub source: String,
    /// Locator inside the source (step id and operation)
    pub locator: String,
    /// Display title
    #[serde(default)]
    pub title: String,
    /// Rows contributed
    #[serde(default)]
    pub row_count: u64,
}

// ============================================================================
// Direct / Reject
// ============================================================================

/// Answer produced without running a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectAnswerPayload {
    /// Answer text
    pub answer_text: String,
    /// Confidence in `[0, 1]`
    #[serde(default)]
    pub confidence: f64,
    /// Internal justification
    #[serde(default)]
    pub attributions: Vec<Attribution>,
    /// External evidence (empty unless served from cache)
    #[serde(default)]
    pub references: Vec<Reference>,
    /// Whether this payload was served from the route cache
    #[serde(default)]
    pub cache_hit: bool,
}

impl DirectAnswerPayload {
    /// Create a direct answer, clamping confidence into `[0, 1]`
    #[must_use]
    pub fn new(answer_text: impl Into<String>, confidence: f64) -> Self {
        Self {
            answer_text: answer_text.into(),
            confidence: clamp_confidence(confidence),
            attributions: Vec::new(),
            references: Vec::new(),
            cache_hit: false,
        }
    }

    /// Add an attribution
    #[must_use]
    pub fn with_attribution(mut self, attribution: Attribution) -> Self {
        self.attributions.push(attribution);
        self
    }

    pub(crate) fn normalized(mut self) -> Self {
        self.confidence = clamp_confidence(self.confidence);
        self
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        warn!("Direct answer confidence is NaN, using 0.0");
        return 0.0;
    }
    if !(0.0..=1.0).contains(&confidence) {
        warn!(confidence, "Direct answer confidence out of range, clamping");
    }
    confidence.clamp(0.0, 1.0)
}

/// Refusal to answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectPayload {
    /// Why the question was rejected
    pub reason: String,
    /// Policy that caused the rejection
    #[serde(default)]
    pub policy_id: Option<String>,
    /// What the user could ask instead
    #[serde(default)]
    pub suggestion: Option<String>,
    /// Internal justification
    #[serde(default)]
    pub attributions: Vec<Attribution>,
}

impl RejectPayload {
    /// Create a rejection
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            policy_id: None,
            suggestion: None,
            attributions: Vec::new(),
        }
    }

    /// Set the policy id
    #[must_use]
    pub fn with_policy(mut self, policy_id: impl Into<String>) -> Self {
        self.policy_id = Some(policy_id.into());
        self
    }

    /// Set the suggestion
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

// ============================================================================
// Plan
// ============================================================================

/// One data lookup in a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Step identifier, unique within the plan
    pub id: String,
    /// Data source to query
    pub source: String,
    /// Operation on that source
    pub operation: String,
    /// Operation parameters
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl PlanStep {
    /// Create a step with no parameters
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        source: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            operation: operation.into(),
            params: Map::new(),
        }
    }

    /// Add a parameter
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

/// What the plan looks at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewScope {
    /// Entity or subsystem in focus (free-form)
    #[serde(default)]
    pub entity: String,
    /// Lookback window in hours
    #[serde(default = "default_time_window")]
    pub time_window_hours: u32,
}

impl Default for ViewScope {
    fn default() -> Self {
        Self {
            entity: String::new(),
            time_window_hours: DEFAULT_TIME_WINDOW_HOURS,
        }
    }
}

fn default_time_window() -> u32 {
    DEFAULT_TIME_WINDOW_HOURS
}

/// Result limits for a plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultLimits {
    /// Maximum rows kept per step
    #[serde(default = "default_max_rows")]
    pub max_rows: u32,
}

impl Default for ResultLimits {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

fn default_max_rows() -> u32 {
    DEFAULT_MAX_ROWS
}

/// Ordered lookups plus a view scope and limits
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Plan {
    /// Steps in execution order
    #[serde(default)]
    pub steps: Vec<PlanStep>,
    /// View scope
    #[serde(default)]
    pub view: ViewScope,
    /// Result limits
    #[serde(default)]
    pub limits: ResultLimits,
}

impl Plan {
    /// Create a plan from steps with default view and limits
    #[must_use]
    pub fn new(steps: Vec<PlanStep>) -> Self {
        Self {
            steps,
            ..Default::default()
        }
    }

    /// Set the lookback window
    #[must_use]
    pub fn with_time_window(mut self, hours: u32) -> Self {
        self.view.time_window_hours = hours;
        self
    }

    /// Set the row limit
    #[must_use]
    pub fn with_max_rows(mut self, max_rows: u32) -> Self {
        self.limits.max_rows = max_rows;
        self
    }
}
