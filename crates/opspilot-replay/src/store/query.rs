//! Query options for listing traces

use crate::trace::{TraceOutcome, TraceRecord};

/// Query options for listing traces
#[derive(Debug, Clone, Default)]
pub struct TraceQuery {
    /// Filter by tenant
    pub tenant_id: Option<String>,
    /// Filter by outcome
    pub outcome: Option<TraceOutcome>,
    /// Maximum results
    pub limit: i64,
    /// Offset for pagination
    pub offset: i64,
}

impl TraceQuery {
    /// Create a new query with default limits
    #[must_use]
    pub fn new() -> Self {
        Self {
            limit: 50,
            offset: 0,
            ..Default::default()
        }
    }

    /// Set the tenant filter
    #[must_use]
    pub fn for_tenant(mut self, tenant_id: &str) -> Self {
        self.tenant_id = Some(tenant_id.to_string());
        self
    }

    /// Set the outcome filter
    #[must_use]
    pub fn with_outcome(mut self, outcome: TraceOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Set pagination
    #[must_use]
    pub fn paginate(mut self, limit: i64, offset: i64) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }

    pub(crate) fn matches(&self, record: &TraceRecord) -> bool {
        if let Some(tenant) = &self.tenant_id {
            if &record.tenant_id != tenant {
                return false;
            }
        }
        if let Some(outcome) = self.outcome {
            if record.outcome != outcome {
                return false;
            }
        }
        true
    }
}
