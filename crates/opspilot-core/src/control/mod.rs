//! Control - Anomaly classification and bounded replans
//!
//! After every pipeline attempt the control loop looks at the last stage
//! output. An anomaly (error status, or an empty execute result) is
//! normalized into a [`ReplanTrigger`] and resolved through a fixed policy
//! table into one of three decisions:
//!
//! - `auto_retry`: apply a `{before, after}` [`PlanPatch`] and re-enter the
//!   pipeline at the affected stage, at most `max_replans` times
//! - `ask_user`: stop and attach an [`ActionCard`]
//! - `stop_with_guidance`: stop with a remediation message
//!
//! Every anomaly is recorded as a [`ReplanEvent`], in arrival order.

mod action;
mod event;
mod outcome;
mod patch;
pub mod policy;
mod runtime;
mod trigger;


pub use action::{guidance_message, ActionCard, ActionOption};
pub use event::ReplanEvent;
pub use outcome::QueryOutcome;
pub use patch::{PlanPatch, MAX_ROWS_PATH, TIME_WINDOW_PATH};
pub use runtime::{ControlLoop, LoopResult};
pub use trigger::{ReplanDecision, ReplanTrigger};
