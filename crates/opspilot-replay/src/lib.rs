//! Opspilot Replay - Trace persistence
//!
//! This crate stores and compares the traces produced by query runs:
//! - Trace: per-run record with stage summaries and replan count
//! - Store: trace persistence (SQLite or in-memory)
//! - Viewer: trace lookup and stage-by-stage comparison

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod store;
pub mod trace;
pub mod viewer;

pub use error::{Error, Result};
pub use store::{MemoryTraceStore, TraceQuery, TraceStore, TraceStoreTrait};
pub use trace::{StageSummary, TraceOutcome, TraceRecord};
pub use viewer::{diff_traces, StageDiff, TraceComparison, TraceDiff, TraceViewer};
