//! Structured plan patches

use crate::error::{Error, Result};
use crate::plan::Plan;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Path of the plan lookback window
pub const TIME_WINDOW_PATH: &str = "view.time_window_hours";
/// Path of the plan row limit
pub const MAX_ROWS_PATH: &str = "limits.max_rows";

/// Explicit `{before, after}` diff over dotted plan field paths
///
/// Both sides always carry the same set of paths. Applying a patch checks
/// that the plan still holds every `before` value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanPatch {
    /// Field values the patch expects to find
    pub before: BTreeMap<String, Value>,
    /// Field values the patch writes
    pub after: BTreeMap<String, Value>,
}

impl PlanPatch {
    /// Create an empty patch
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one field change
    #[must_use]
    pub fn with_change(mut self, path: impl Into<String>, before: Value, after: Value) -> Self {
        let path = path.into();
        self.before.insert(path.clone(), before);
        self.after.insert(path, after);
        self
    }

    /// Whether the patch changes nothing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.after.is_empty()
    }

    /// Apply to a plan, producing a new plan
    pub fn apply(&self, plan: &Plan) -> Result<Plan> {
        if self.before.len() != self.after.len()
            || self.before.keys().any(|k| !self.after.contains_key(k))
        {
            return Err(Error::Patch("before and after cover different fields".into()));
        }

        let mut doc = serde_json::to_value(plan)?;
        for (path, after) in &self.after {
            let slot = field_mut(&mut doc, path)
                .ok_or_else(|| Error::Patch(format!("plan has no field '{path}'")))?;
            let expected = &self.before[path];
            if *slot != *expected {
                return Err(Error::Patch(format!(
                    "'{path}' is {slot}, patch expected {expected}"
                )));
            }
            *slot = after.clone();
        }

        serde_json::from_value(doc)
            .map_err(|e| Error::Patch(format!("patched plan is invalid: {e}")))
    }
}

fn field_mut<'a>(doc: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    path.split('.')
        .try_fold(doc, |node, segment| node.as_object_mut()?.get_mut(segment))
}
