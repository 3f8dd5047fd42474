//! Orchestrator - Request entry point
//!
//! # Module Structure
//!
//! - `core`: Orchestrator struct and builder methods
//! - `request`: QueryRequest
//! - `result`: QueryResult and its trace record
//! - `process`: routing → control loop → trace persistence

mod core;
mod process;
mod request;
mod result;

#[cfg(test)]
mod tests;

pub use core::Orchestrator;
pub use request::QueryRequest;
pub use result::QueryResult;
