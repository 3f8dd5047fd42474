//! Pipeline - Stage contract and executor
//!
//! Stages run strictly in order: route_plan → validate → execute → compose →
//! present. `route_plan` already ran inside the router and is only recorded.
//! Every stage output carries its mandatory result keys, so consumers never
//! need null checks.

mod compose;
mod execute;
mod executor;
mod present;
mod stage;
mod validate;


pub use compose::ComposeStage;
pub use execute::ExecuteStage;
pub use executor::{PipelineRun, StageExecutor, StartPoint};
pub use present::{DisplayModel, PresentNotice, PresentStage};
pub use stage::{
    DiagnosticIssue, DiagnosticStatus, Stage, StageAssets, StageCall, StageDiagnostics,
    StageInput, StageName, StageOutput, StageReport, RESULT_EMPTY,
};
pub use validate::ValidateStage;
