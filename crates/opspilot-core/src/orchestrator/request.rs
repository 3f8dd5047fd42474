//! Query request

use crate::context::ExecutionContext;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// One incoming question
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// Tenant the question belongs to
    pub tenant_id: String,
    /// Question text
    pub question: String,
    /// Optional user identifier
    pub user_id: Option<String>,
    /// Whether the overrides come from a test run
    pub test_mode: bool,
    /// Asset key → version id overrides
    pub asset_overrides: HashMap<String, String>,
    /// Trace to compare the run against
    pub baseline_trace_id: Option<Uuid>,
    /// Caller-owned cancellation
    pub cancel: Option<CancellationToken>,
}

impl QueryRequest {
    /// Create a request
    #[must_use]
    pub fn new(tenant_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            question: question.into(),
            user_id: None,
            test_mode: false,
            asset_overrides: HashMap::new(),
            baseline_trace_id: None,
            cancel: None,
        }
    }

    /// Set the user
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Mark as a test run
    #[must_use]
    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    /// Pin an asset key to a version
    #[must_use]
    pub fn with_asset_override(
        mut self,
        key: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        self.asset_overrides.insert(key.into(), version_id.into());
        self
    }

    /// Compare the run against a stored trace
    #[must_use]
    pub fn with_baseline(mut self, trace_id: Uuid) -> Self {
        self.baseline_trace_id = Some(trace_id);
        self
    }

    /// Attach a cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Build the per-request execution context
    #[must_use]
    pub fn into_context(self) -> ExecutionContext {
        let mut ctx = ExecutionContext::new(self.tenant_id, self.question)
            .with_test_mode(self.test_mode);
        if let Some(user_id) = self.user_id {
            ctx = ctx.with_user(user_id);
        }
        for (key, version_id) in self.asset_overrides {
            ctx = ctx.with_asset_override(key, version_id);
        }
        if let Some(baseline) = self.baseline_trace_id {
            ctx = ctx.with_baseline(baseline);
        }
        if let Some(token) = self.cancel {
            ctx = ctx.with_cancellation(token);
        }
        ctx
    }
}
