//! Trigger → scope, decision and patch table

use super::patch::{PlanPatch, MAX_ROWS_PATH, TIME_WINDOW_PATH};
use super::trigger::{ReplanDecision, ReplanTrigger};
use crate::pipeline::StageName;
use crate::plan::Plan;

/// Widest lookback window a replan may request, in hours
pub const MAX_TIME_WINDOW_HOURS: u32 = 720;
/// Factor the lookback window grows by on an empty result
pub const TIME_WINDOW_GROWTH: u32 = 3;
/// Smallest row limit a replan may request
pub const MIN_MAX_ROWS: u32 = 10;

/// What the policy table says about one anomaly
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Stage the resolution targets
    pub scope: StageName,
    /// What to do
    pub decision: ReplanDecision,
    /// Proposed plan change, always present for `auto_retry`
    pub patch: Option<PlanPatch>,
}

impl Resolution {
    fn stop(scope: StageName) -> Self {
        Self {
            scope,
            decision: ReplanDecision::StopWithGuidance,
            patch: None,
        }
    }

    fn ask(scope: StageName) -> Self {
        Self {
            scope,
            decision: ReplanDecision::AskUser,
            patch: None,
        }
    }

    fn retry(scope: StageName, patch: PlanPatch) -> Self {
        Self {
            scope,
            decision: ReplanDecision::AutoRetry,
            patch: Some(patch),
        }
    }
}

/// Resolve an anomaly raised by `stage`
///
/// Anomalies from `route_plan` always stop, since there is no plan to
/// patch. Data-side triggers only patch the plan when raised between
/// `execute` and `compose`: earlier stages would be skipped by the retry,
/// and a `present` failure has nothing to do with the data.
#[must_use]
pub fn resolve(trigger: ReplanTrigger, stage: StageName, plan: Option<&Plan>) -> Resolution {
    if stage == StageName::RoutePlan {
        return Resolution::stop(stage);
    }
    let data_side = (StageName::Execute..=StageName::Compose).contains(&stage);

    match trigger {
        ReplanTrigger::EmptyResult => match (plan, data_side) {
            (Some(plan), true) => widen_window(plan),
            _ => Resolution::stop(stage),
        },
        ReplanTrigger::ToolErrorRetryable
        | ReplanTrigger::Timeout
        | ReplanTrigger::LimitExceeded => match (plan, data_side) {
            (Some(plan), true) => shrink_rows(plan),
            _ => Resolution::stop(stage),
        },
        ReplanTrigger::ToolErrorFatal => Resolution::stop(StageName::Execute.min(stage)),
        ReplanTrigger::PolicyBlocked => Resolution::ask(StageName::Validate.min(stage)),
        ReplanTrigger::LowEvidence => Resolution::ask(StageName::Compose.min(stage)),
        ReplanTrigger::PlanInvalid => Resolution::stop(StageName::Validate.min(stage)),
        ReplanTrigger::Unknown => Resolution::stop(stage),
    }
}

fn widen_window(plan: &Plan) -> Resolution {
    let current = plan.view.time_window_hours;
    if current >= MAX_TIME_WINDOW_HOURS {
        return Resolution::ask(StageName::Execute);
    }
    let widened = current
        .saturating_mul(TIME_WINDOW_GROWTH)
        .clamp(current + 1, MAX_TIME_WINDOW_HOURS);
    Resolution::retry(
        StageName::Execute,
        PlanPatch::new().with_change(TIME_WINDOW_PATH, current.into(), widened.into()),
    )
}

fn shrink_rows(plan: &Plan) -> Resolution {
    let current = plan.limits.max_rows;
    if current <= MIN_MAX_ROWS {
        return Resolution::stop(StageName::Execute);
    }
    let halved = (current / 2).max(MIN_MAX_ROWS);
    Resolution::retry(
        StageName::Execute,
        PlanPatch::new().with_change(MAX_ROWS_PATH, current.into(), halved.into()),
    )
}
