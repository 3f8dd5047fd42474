//! Terminal outcomes of a request

use opspilot_replay::TraceOutcome;
use serde::{Deserialize, Serialize};

/// How a request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryOutcome {
    /// Answered (direct answer or a plan that ran cleanly)
    Success,
    /// Refused by policy
    Rejected,
    /// Stopped with a remediation message
    Guidance,
    /// Waiting for the user to pick an action
    ActionRequested,
    /// Replan budget spent
    LimitExceeded,
    /// Cancelled by the caller
    Cancelled,
}

impl QueryOutcome {
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
}

impl std::fmt::Display for QueryOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<QueryOutcome> for TraceOutcome {
    fn from(outcome: QueryOutcome) -> Self {
        match outcome {
            QueryOutcome::Success => TraceOutcome::Success,
            QueryOutcome::Rejected => TraceOutcome::Rejected,
            QueryOutcome::Guidance => TraceOutcome::Guidance,
            QueryOutcome::ActionRequested => TraceOutcome::ActionRequested,
            QueryOutcome::LimitExceeded => TraceOutcome::LimitExceeded,
            QueryOutcome::Cancelled => TraceOutcome::Cancelled,
        }
    }
}
