//! Trace records
//!
//! A trace is the persisted summary of one query run: which route was taken,
//! which stages ran (once per attempt), how many replans were applied and how
//! the run ended. The full stage payloads are kept as opaque JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Terminal outcome of a query run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceOutcome {
    /// Pipeline reached present without anomalies
    Success,
    /// Router rejected the question
    Rejected,
    /// Run stopped with a guidance message
    Guidance,
    /// Run stopped waiting on a user decision
    ActionRequested,
    /// Replan budget was exhausted
    LimitExceeded,
    /// Run was cancelled
    Cancelled,
}

impl TraceOutcome {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Rejected => "rejected",
            Self::Guidance => "guidance",
            Self::ActionRequested => "action_requested",
            Self::LimitExceeded => "limit_exceeded",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the run produced a normal answer
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl std::fmt::Display for TraceOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TraceOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" => Ok(Self::Success),
            "rejected" => Ok(Self::Rejected),
            "guidance" => Ok(Self::Guidance),
            "action_requested" => Ok(Self::ActionRequested),
            "limit_exceeded" => Ok(Self::LimitExceeded),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("unknown trace outcome: {s}")),
        }
    }
}

/// Summary of a single stage run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageSummary {
    /// Stage name (route_plan, validate, execute, compose, present)
    pub stage: String,
    /// Pipeline attempt this output belongs to (1-based)
    pub attempt: u32,
    /// Diagnostics status (ok, warning, error)
    pub status: String,
    /// Wall time spent in the stage
    pub duration_ms: u64,
    /// First error code reported by the stage, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Counts reported in the stage diagnostics
    #[serde(default)]
    pub counts: std::collections::BTreeMap<String, u64>,
}

impl StageSummary {
    /// Create a summary with no counts
    #[must_use]
    pub fn new(stage: impl Into<String>, attempt: u32, status: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            attempt,
            status: status.into(),
            duration_ms: 0,
            error_code: None,
            counts: std::collections::BTreeMap::new(),
        }
    }

    /// Set the duration
    #[must_use]
    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Set the error code
    #[must_use]
    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Add a count
    #[must_use]
    pub fn with_count(mut self, name: impl Into<String>, value: u64) -> Self {
        self.counts.insert(name.into(), value);
        self
    }
}

/// Persisted record of one query run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceRecord {
    /// Trace identifier
    pub id: Uuid,
    /// Tenant the question was asked in
    pub tenant_id: String,
    /// Optional user identifier
    pub user_id: Option<String>,
    /// Question text as received
    pub question: String,
    /// Route kind chosen by the router (direct, plan, reject)
    pub route_kind: Option<String>,
    /// How the run ended
    pub outcome: TraceOutcome,
    /// Whether the route came from the cache
    pub cache_hit: bool,
    /// Trace this run should be compared against
    pub baseline_trace_id: Option<Uuid>,
    /// Whether the run used test-mode asset overrides
    pub test_mode: bool,
    /// Number of replans applied
    pub replan_count: u32,
    /// Stage runs in execution order
    pub stages: Vec<StageSummary>,
    /// Full run payload (stage outputs, replan events, final result)
    pub payload: serde_json::Value,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub completed_at: DateTime<Utc>,
}

impl TraceRecord {
    /// Create a record for a run that is starting now
    #[must_use]
    pub fn new(
        id: Uuid,
        tenant_id: impl Into<String>,
        question: impl Into<String>,
        outcome: TraceOutcome,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            tenant_id: tenant_id.into(),
            user_id: None,
            question: question.into(),
            route_kind: None,
            outcome,
            cache_hit: false,
            baseline_trace_id: None,
            test_mode: false,
            replan_count: 0,
            stages: Vec::new(),
            payload: serde_json::json!({}),
            started_at: now,
            completed_at: now,
        }
    }

    /// Total wall time of the run in milliseconds
    #[must_use]
    pub fn duration_ms(&self) -> i64 {
        (self.completed_at - self.started_at).num_milliseconds()
    }

    /// Stage summaries for a given stage name, in attempt order
    pub fn stage_runs<'a>(&'a self, stage: &'a str) -> impl Iterator<Item = &'a StageSummary> + 'a {
        self.stages.iter().filter(move |s| s.stage == stage)
    }

    /// Distinct stage names in first-seen order
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for summary in &self.stages {
            if !names.contains(&summary.stage.as_str()) {
                names.push(summary.stage.as_str());
            }
        }
        names
    }
}
