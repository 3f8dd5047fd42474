//! User-facing action cards and guidance text

use super::trigger::ReplanTrigger;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One choice on an action card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionOption {
    /// Option identifier returned by the UI
    pub id: String,
    /// Button label
    pub label: String,
}

impl ActionOption {
    fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
        }
    }
}

/// Choices offered when an anomaly cannot be resolved automatically
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCard {
    /// Card identifier
    pub id: String,
    /// Trigger that raised the card
    pub trigger: ReplanTrigger,
    /// Card title
    pub title: String,
    /// Explanation shown under the title
    pub description: String,
    /// Between two and four options
    pub options: Vec<ActionOption>,
}

impl ActionCard {
    /// Build the card for a trigger
    #[must_use]
    pub fn for_trigger(trigger: ReplanTrigger) -> Self {
        let (title, description, options) = match trigger {
            ReplanTrigger::PolicyBlocked => (
                "Part of this request is not allowed",
                "A data source or operation in the plan is blocked by policy.",
                vec![
                    ActionOption::new("drop_blocked_steps", "Continue without the blocked data"),
                    ActionOption::new("rephrase", "Rephrase the question"),
                    ActionOption::new("request_access", "Request access"),
                ],
            ),
            ReplanTrigger::LowEvidence => (
                "Not enough evidence",
                "Too few sources backed this answer to present it with confidence.",
                vec![
                    ActionOption::new("show_partial", "Show what was found"),
                    ActionOption::new("widen_scope", "Search a wider scope"),
                    ActionOption::new("rephrase", "Rephrase the question"),
                ],
            ),
            ReplanTrigger::EmptyResult => (
                "Still no data",
                "Nothing matched even with the widest lookback window.",
                vec![
                    ActionOption::new("change_entity", "Look at a different system"),
                    ActionOption::new("rephrase", "Rephrase the question"),
                ],
            ),
            _ => (
                "How should we continue?",
                "The request could not be completed automatically.",
                vec![
                    ActionOption::new("retry", "Try again"),
                    ActionOption::new("rephrase", "Rephrase the question"),
                ],
            ),
        };

        Self {
            id: format!("card-{}", Uuid::new_v4()),
            trigger,
            title: title.to_string(),
            description: description.to_string(),
            options,
        }
    }
}

/// Short remediation message for a trigger that stops the loop
#[must_use]
pub fn guidance_message(trigger: ReplanTrigger) -> &'static str {
    match trigger {
        ReplanTrigger::EmptyResult => {
            "No data matched this question. Try naming a specific service or time range."
        }
        ReplanTrigger::ToolErrorRetryable | ReplanTrigger::Timeout => {
            "A data source is not responding right now. Please try again in a few minutes."
        }
        ReplanTrigger::ToolErrorFatal => {
            "A data source rejected the request. Ask your administrator to check its configuration."
        }
        ReplanTrigger::LimitExceeded => {
            "The request is too large to answer. Narrow it down to fewer systems or a shorter period."
        }
        ReplanTrigger::PolicyBlocked => "This request touches data you are not allowed to query.",
        ReplanTrigger::LowEvidence => "Too little evidence was found to answer reliably.",
        ReplanTrigger::PlanInvalid => {
            "The question could not be turned into a runnable plan. Try rephrasing it."
        }
        ReplanTrigger::Unknown => {
            "Something unexpected went wrong while answering. The details were recorded for review."
        }
    }
}

/// Message shown when the replan budget is spent
pub const LIMIT_EXCEEDED_MESSAGE: &str =
    "The question could not be answered within the retry budget. Showing the best partial result.";

/// Message shown when the caller cancelled the request
pub const CANCELLED_MESSAGE: &str = "The request was cancelled before it finished.";
