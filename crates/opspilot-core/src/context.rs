//! Per-request execution context
//!
//! One [`ExecutionContext`] is created per incoming question and threaded
//! through routing, every stage call and the control loop. It is never
//! shared between requests.

use crate::control::ActionCard;
use crate::plan::Attribution;
use std::collections::{BTreeMap, HashMap};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Mutable state carried through one request
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Tenant the question belongs to
    pub tenant_id: String,
    /// Question text as received
    pub question: String,
    /// Trace identifier for this request
    pub trace_id: Uuid,
    /// Optional user identifier
    pub user_id: Option<String>,
    /// Whether asset overrides come from a test run
    pub test_mode: bool,
    /// Logical asset key → version id to use instead of the published one
    pub asset_overrides: HashMap<String, String>,
    /// Trace to compare this run against
    pub baseline_trace_id: Option<Uuid>,
    /// Attributions accumulated across stages
    pub final_attributions: Vec<Attribution>,
    /// Action cards raised by the control loop
    pub action_cards: Vec<ActionCard>,
    /// Whether the routing decision came from the cache
    pub cache_hit: bool,
    /// Cache key computed for this question, if it was cache-eligible
    pub cache_key: Option<String>,
    /// Assets the router resolved (key → version id)
    pub routing_assets: BTreeMap<String, String>,
    /// Current pipeline attempt (1-based)
    pub attempt: u32,
    cancel: CancellationToken,
}

impl ExecutionContext {
    /// Create a context for a new request
    #[must_use]
    pub fn new(tenant_id: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            question: question.into(),
            trace_id: Uuid::new_v4(),
            user_id: None,
            test_mode: false,
            asset_overrides: HashMap::new(),
            baseline_trace_id: None,
            final_attributions: Vec::new(),
            action_cards: Vec::new(),
            cache_hit: false,
            cache_key: None,
            routing_assets: BTreeMap::new(),
            attempt: 1,
            cancel: CancellationToken::new(),
        }
    }

    /// Set the user
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Mark the request as a test run
    #[must_use]
    pub fn with_test_mode(mut self, test_mode: bool) -> Self {
        self.test_mode = test_mode;
        self
    }

    /// Pin a logical asset key to a specific version
    #[must_use]
    pub fn with_asset_override(
        mut self,
        key: impl Into<String>,
        version_id: impl Into<String>,
    ) -> Self {
        self.asset_overrides.insert(key.into(), version_id.into());
        self
    }

    /// Set the baseline trace for comparison runs
    #[must_use]
    pub fn with_baseline(mut self, trace_id: Uuid) -> Self {
        self.baseline_trace_id = Some(trace_id);
        self
    }

    /// Use a caller-owned cancellation token
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that is cancelled when the caller gives up on the request
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the caller has cancelled the request
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Add attributions, skipping ones already recorded
    pub fn add_attributions<I>(&mut self, attributions: I)
    where
        I: IntoIterator<Item = Attribution>,
    {
        for attribution in attributions {
            if !self.final_attributions.contains(&attribution) {
                self.final_attributions.push(attribution);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::AttributionKind;

    #[test]
    fn test_builder() {
        let baseline = Uuid::new_v4();
        let ctx = ExecutionContext::new("acme", "cpu on web-1")
            .with_user("u-1")
            .with_test_mode(true)
            .with_asset_override("planning_prompt", "v2")
            .with_baseline(baseline);

        assert_eq!(ctx.tenant_id, "acme");
        assert_eq!(ctx.user_id.as_deref(), Some("u-1"));
        assert!(ctx.test_mode);
        assert_eq!(
            ctx.asset_overrides.get("planning_prompt").map(String::as_str),
            Some("v2")
        );
        assert_eq!(ctx.baseline_trace_id, Some(baseline));
        assert_eq!(ctx.attempt, 1);
        assert!(!ctx.cache_hit);
    }

    #[test]
    fn test_cancellation_is_shared() {
        let token = CancellationToken::new();
        let ctx = ExecutionContext::new("acme", "q").with_cancellation(token.clone());
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_add_attributions_dedups() {
        let mut ctx = ExecutionContext::new("acme", "q");
        let attribution = Attribution::new(AttributionKind::Policy, "pol-1", "greeting policy");
        ctx.add_attributions(vec![attribution.clone(), attribution]);
        assert_eq!(ctx.final_attributions.len(), 1);
    }
}
