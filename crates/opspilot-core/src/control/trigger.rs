//! Replan triggers and decisions

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static SEPARATORS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\s\-_]+").expect("SEPARATORS is a compile-time constant")
});

/// Normalized reason a stage reported an anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplanTrigger {
    /// Lookups succeeded but returned nothing
    EmptyResult,
    /// A lookup failed in a way that may succeed on retry
    ToolErrorRetryable,
    /// A lookup failed permanently
    ToolErrorFatal,
    /// A policy forbids part of the plan
    PolicyBlocked,
    /// Too little evidence to compose an answer
    LowEvidence,
    /// A size or count limit was breached
    LimitExceeded,
    /// A stage or lookup ran out of time
    Timeout,
    /// The plan itself is malformed
    PlanInvalid,
    /// Anything not recognized
    Unknown,
}

impl ReplanTrigger {
    /// Every trigger
    pub const ALL: [ReplanTrigger; 9] = [
        ReplanTrigger::EmptyResult,
        ReplanTrigger::ToolErrorRetryable,
        ReplanTrigger::ToolErrorFatal,
        ReplanTrigger::PolicyBlocked,
        ReplanTrigger::LowEvidence,
        ReplanTrigger::LimitExceeded,
        ReplanTrigger::Timeout,
        ReplanTrigger::PlanInvalid,
        ReplanTrigger::Unknown,
    ];

    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyResult => "empty_result",
            Self::ToolErrorRetryable => "tool_error_retryable",
            Self::ToolErrorFatal => "tool_error_fatal",
            Self::PolicyBlocked => "policy_blocked",
            Self::LowEvidence => "low_evidence",
            Self::LimitExceeded => "limit_exceeded",
            Self::Timeout => "timeout",
            Self::PlanInvalid => "plan_invalid",
            Self::Unknown => "unknown",
        }
    }

    /// Canonical spelling of a raw trigger string
    ///
    /// Lowercases, turns runs of whitespace, dashes and underscores into a
    /// single underscore and trims them from both ends. Applying it twice
    /// gives the same result as applying it once.
    #[must_use]
    pub fn normalize(raw: &str) -> String {
        let lowered = raw.trim().to_lowercase();
        SEPARATORS
            .replace_all(&lowered, "_")
            .trim_matches('_')
            .to_string()
    }

    /// Map a raw trigger string onto a trigger
    ///
    /// Never fails: anything unrecognized is [`ReplanTrigger::Unknown`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match Self::normalize(raw).as_str() {
            "empty_result" | "result_empty" | "empty" | "no_rows" | "no_data" => {
                Self::EmptyResult
            }
            "tool_error_retryable" | "retryable" | "transient_error" | "unavailable"
            | "rate_limited" => Self::ToolErrorRetryable,
            "tool_error_fatal" | "fatal" | "unsupported_operation" => Self::ToolErrorFatal,
            "policy_blocked" | "blocked" | "forbidden" => Self::PolicyBlocked,
            "low_evidence" | "insufficient_evidence" => Self::LowEvidence,
            "limit_exceeded" | "too_many_rows" | "too_many_steps" => Self::LimitExceeded,
            "timeout" | "timed_out" | "deadline_exceeded" => Self::Timeout,
            "plan_invalid" | "invalid_plan" => Self::PlanInvalid,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ReplanTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for ReplanTrigger {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

/// How the control loop resolves an anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplanDecision {
    /// Apply the patch and run again
    AutoRetry,
    /// Stop and offer the user an action card
    AskUser,
    /// Stop with a remediation message
    StopWithGuidance,
}

impl ReplanDecision {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoRetry => "auto_retry",
            Self::AskUser => "ask_user",
            Self::StopWithGuidance => "stop_with_guidance",
        }
    }
}

impl std::fmt::Display for ReplanDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
