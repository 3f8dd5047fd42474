//! Opspilot Core - Query orchestration engine
//!
//! This crate turns an operational question into a rendered answer:
//! - Assets: versioned configuration lookups with per-request overrides
//! - Cache: short-lived memo of routing decisions
//! - Router: classifies a question as direct answer, plan, or reject
//! - Pipeline: route_plan → validate → execute → compose → present
//! - Control: anomaly classification and bounded replans
//! - Orchestrator: ties the above together and records the trace

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod assets;
pub mod cache;
pub mod config;
pub mod context;
pub mod control;
pub mod data;
pub mod error;
pub mod orchestrator;
pub mod pipeline;
pub mod plan;
pub mod router;

#[cfg(test)]
pub(crate) mod test_support;

pub use assets::{AssetKey, AssetResolver, AssetVersion, ConfigStore, InMemoryConfigStore};
pub use cache::{CacheBackend, CacheStats, MemoryCacheBackend, RoutePlanCache};
pub use config::CoreConfig;
pub use context::ExecutionContext;
pub use control::{
    ActionCard, ControlLoop, LoopResult, PlanPatch, QueryOutcome, ReplanDecision, ReplanEvent,
    ReplanTrigger,
};
pub use data::{DataSource, LookupQuery, LookupResult, StaticDataSource};
pub use error::{format_error_for_cli, Error, Result, UserFriendlyError};
pub use orchestrator::{Orchestrator, QueryRequest, QueryResult};
pub use pipeline::{
    DisplayModel, PipelineRun, Stage, StageDiagnostics, StageExecutor, StageInput, StageName,
    StageOutput, StartPoint,
};
pub use plan::{
    Attribution, DirectAnswerPayload, Plan, PlanOutput, PlanPayload, PlanStep, Reference,
    RejectPayload, RouteKind,
};
pub use router::{LlmPlanningBackend, PlanRouter, PlanningBackend, PlanningRequest, PlanningResponse};
