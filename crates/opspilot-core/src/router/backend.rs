//! Planning backend seam

use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the router hands to the planning backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningRequest {
    /// Question as asked
    pub question: String,
    /// Tenant the question belongs to
    pub tenant_id: String,
    /// Text of the `planning_prompt` asset
    pub instructions: String,
    /// Payload of the `planning_constraints` asset
    pub constraints: Value,
}

/// Structured reply from the planning backend
///
/// `kind` is kept as the raw string the backend produced; the router
/// decides whether it names a known route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanningResponse {
    /// Declared route kind (`direct`, `plan` or `reject`)
    pub kind: String,
    /// Payload for that kind
    #[serde(default)]
    pub payload: Value,
    /// Free-text reasoning
    #[serde(default)]
    pub reasoning: String,
}

/// Black-box classifier and planner
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PlanningBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Classify a question and, for plans, produce the steps
    async fn classify_and_plan(&self, request: &PlanningRequest) -> Result<PlanningResponse>;
}
