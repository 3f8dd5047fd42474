//! Plan - Routing decisions and plan payloads
//!
//! [`PlanOutput`] is the single routing decision produced per question. It
//! is immutable once created; control-loop rewrites produce a new value via
//! [`PlanOutput::with_plan`].

mod output;
mod payload;

#[cfg(test)]
mod tests;

pub use output::{PlanOutput, PlanPayload, RouteKind};
pub use payload::{
    Attribution, AttributionKind, DirectAnswerPayload, Plan, PlanStep, Reference, RejectPayload,
    ResultLimits, ViewScope, DEFAULT_MAX_ROWS, DEFAULT_TIME_WINDOW_HOURS,
};
