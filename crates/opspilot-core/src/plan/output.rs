//! Routing decision

use super::payload::{DirectAnswerPayload, Plan, RejectPayload};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Routing outcome kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    /// Answer without running a plan
    Direct,
    /// Run a multi-step plan
    Plan,
    /// Refuse the question
    Reject,
}

impl RouteKind {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Plan => "plan",
            Self::Reject => "reject",
        }
    }
}

impl std::fmt::Display for RouteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RouteKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "plan" => Ok(Self::Plan),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown route kind: {other}")),
        }
    }
}

/// Exactly one of the three routing payloads
#[derive(Debug, Clone, PartialEq)]
pub enum PlanPayload {
    /// Direct answer
    Direct(DirectAnswerPayload),
    /// Executable plan
    Plan(Plan),
    /// Rejection
    Reject(RejectPayload),
}

impl PlanPayload {
    /// Kind matching this payload
    #[must_use]
    pub fn kind(&self) -> RouteKind {
        match self {
            Self::Direct(_) => RouteKind::Direct,
            Self::Plan(_) => RouteKind::Plan,
            Self::Reject(_) => RouteKind::Reject,
        }
    }
}

/// The routing decision for one question
///
/// The payload is a tagged union, so `kind` always matches the populated
/// payload. The serialized form spells out `kind` plus three optional
/// payload fields; decoding that form checks that exactly the matching
/// payload is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PlanOutputWire", into = "PlanOutputWire")]
pub struct PlanOutput {
    /// The populated payload
    pub payload: PlanPayload,
    /// Free-text reasoning from the router
    pub routing_reasoning: String,
    /// Time spent routing
    pub elapsed_ms: u64,
}

impl PlanOutput {
    /// Create a direct-answer decision
    #[must_use]
    pub fn direct(payload: DirectAnswerPayload) -> Self {
        Self::from_payload(PlanPayload::Direct(payload.normalized()))
    }

    /// Create a plan decision
    #[must_use]
    pub fn plan(plan: Plan) -> Self {
        Self::from_payload(PlanPayload::Plan(plan))
    }

    /// Create a reject decision
    #[must_use]
    pub fn reject(payload: RejectPayload) -> Self {
        Self::from_payload(PlanPayload::Reject(payload))
    }

    fn from_payload(payload: PlanPayload) -> Self {
        Self {
            payload,
            routing_reasoning: String::new(),
            elapsed_ms: 0,
        }
    }

    /// Build a decision from a declared kind and optional payloads
    ///
    /// Fails with [`Error::Consistency`] unless exactly the payload matching
    /// `kind` is present.
    pub fn from_parts(
        kind: RouteKind,
        direct: Option<DirectAnswerPayload>,
        plan: Option<Plan>,
        reject: Option<RejectPayload>,
    ) -> Result<Self> {
        let payload = match (kind, direct, plan, reject) {
            (RouteKind::Direct, Some(d), None, None) => PlanPayload::Direct(d.normalized()),
            (RouteKind::Plan, None, Some(p), None) => PlanPayload::Plan(p),
            (RouteKind::Reject, None, None, Some(r)) => PlanPayload::Reject(r),
            (kind, d, p, r) => {
                let mut present = Vec::new();
                if d.is_some() {
                    present.push("direct");
                }
                if p.is_some() {
                    present.push("plan");
                }
                if r.is_some() {
                    present.push("reject");
                }
                return Err(Error::Consistency(format!(
                    "kind={} but populated payloads are [{}]",
                    kind,
                    present.join(", ")
                )));
            }
        };
        Ok(Self::from_payload(payload))
    }

    /// Set the routing reasoning
    #[must_use]
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.routing_reasoning = reasoning.into();
        self
    }

    /// Set the elapsed time
    #[must_use]
    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = elapsed_ms;
        self
    }

    /// Routing kind
    #[must_use]
    pub fn kind(&self) -> RouteKind {
        self.payload.kind()
    }

    /// Direct payload, if this is a direct decision
    #[must_use]
    pub fn as_direct(&self) -> Option<&DirectAnswerPayload> {
        match &self.payload {
            PlanPayload::Direct(d) => Some(d),
            _ => None,
        }
    }

    /// Plan, if this is a plan decision
    #[must_use]
    pub fn as_plan(&self) -> Option<&Plan> {
        match &self.payload {
            PlanPayload::Plan(p) => Some(p),
            _ => None,
        }
    }

    /// Reject payload, if this is a reject decision
    #[must_use]
    pub fn as_reject(&self) -> Option<&RejectPayload> {
        match &self.payload {
            PlanPayload::Reject(r) => Some(r),
            _ => None,
        }
    }

    /// New decision carrying a rewritten plan
    ///
    /// Fails with [`Error::Consistency`] when this decision is not a plan.
    pub fn with_plan(&self, plan: Plan) -> Result<Self> {
        if self.kind() != RouteKind::Plan {
            return Err(Error::Consistency(format!(
                "cannot replace the plan of a {} decision",
                self.kind()
            )));
        }
        Ok(Self {
            payload: PlanPayload::Plan(plan),
            routing_reasoning: self.routing_reasoning.clone(),
            elapsed_ms: self.elapsed_ms,
        })
    }

    /// Mark a cached decision as served from the cache
    pub(crate) fn mark_cache_hit(&mut self) {
        if let PlanPayload::Direct(d) = &mut self.payload {
            d.cache_hit = true;
        }
    }

    /// Mandatory `route_plan` result view of this decision
    #[must_use]
    pub fn to_route_result(&self, cache_hit: bool) -> serde_json::Map<String, serde_json::Value> {
        let mut result = serde_json::Map::new();
        result.insert("kind".into(), self.kind().as_str().into());
        result.insert(
            "routing_reasoning".into(),
            self.routing_reasoning.clone().into(),
        );
        let plan = self
            .as_plan()
            .and_then(|p| serde_json::to_value(p).ok())
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));
        result.insert("plan".into(), plan);
        result.insert("cache_hit".into(), cache_hit.into());
        result.insert("elapsed_ms".into(), self.elapsed_ms.into());
        result
    }
}

/// Serialized form of [`PlanOutput`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutputWire {
    kind: RouteKind,
    #[serde(default)]
    direct: Option<DirectAnswerPayload>,
    #[serde(default)]
    plan: Option<Plan>,
    #[serde(default)]
    reject: Option<RejectPayload>,
    #[serde(default)]
    routing_reasoning: String,
    #[serde(default)]
    elapsed_ms: u64,
}

impl TryFrom<PlanOutputWire> for PlanOutput {
    type Error = Error;

    fn try_from(wire: PlanOutputWire) -> Result<Self> {
        Ok(
            PlanOutput::from_parts(wire.kind, wire.direct, wire.plan, wire.reject)?
                .with_reasoning(wire.routing_reasoning)
                .with_elapsed_ms(wire.elapsed_ms),
        )
    }
}

impl From<PlanOutput> for PlanOutputWire {
    fn from(output: PlanOutput) -> Self {
        let kind = output.kind();
        let (direct, plan, reject) = match output.payload {
            PlanPayload::Direct(d) => (Some(d), None, None),
            PlanPayload::Plan(p) => (None, Some(p), None),
            PlanPayload::Reject(r) => (None, None, Some(r)),
        };
        Self {
            kind,
            direct,
            plan,
            reject,
            routing_reasoning: output.routing_reasoning,
            elapsed_ms: output.elapsed_ms,
        }
    }
}
