//! Replan events

use super::patch::PlanPatch;
use super::trigger::{ReplanDecision, ReplanTrigger};
use crate::pipeline::{StageDiagnostics, StageName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One anomaly and how the control loop resolved it
///
/// Events are appended in arrival order and never rewritten once the
/// resolution has been carried out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplanEvent {
    /// Event identifier
    pub event_id: Uuid,
    /// Normalized trigger
    pub trigger: ReplanTrigger,
    /// Trigger string as the stage reported it
    pub trigger_raw: String,
    /// Stage the resolution targets
    pub scope: StageName,
    /// Resolution
    pub decision: ReplanDecision,
    /// Proposed plan change; present whenever `decision` is `auto_retry`
    pub patch: Option<PlanPatch>,
    /// Pipeline attempt the anomaly happened in (1-based)
    pub attempt: u32,
    /// Attempt ceiling for the request
    pub max_attempts: u32,
    /// Stage that reported the anomaly
    pub stage: StageName,
    /// Diagnostics of that stage at the time
    pub diagnostics_snapshot: StageDiagnostics,
    /// Whether the patch was applied and the pipeline re-entered
    pub applied: bool,
    /// When the event was created
    pub created_at: DateTime<Utc>,
}

impl ReplanEvent {
    /// Whether this event led to another attempt
    #[must_use]
    pub fn is_retry(&self) -> bool {
        self.decision == ReplanDecision::AutoRetry && self.applied
    }
}
