//! Store - Trace persistence
//!
//! [`TraceStore`] keeps traces in SQLite; [`MemoryTraceStore`] keeps them in
//! process memory for tests and ephemeral runs.

mod helpers;
mod memory;
mod query;
mod sqlite;
mod traits;

#[cfg(test)]
mod tests;

pub use helpers::{default_data_dir, default_db_path};
pub use memory::MemoryTraceStore;
pub use query::TraceQuery;
pub use sqlite::TraceStore;
pub use traits::TraceStoreTrait;
