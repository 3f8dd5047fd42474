//! Cache - Route+Plan cache
//!
//! Memoizes direct and reject routing decisions per tenant and normalized
//! question for a short TTL. Plan decisions depend on live state and are
//! never cached.

mod backend;


pub use backend::{CacheBackend, CachedRoute, MemoryCacheBackend};

use crate::error::{Error, Result};
use crate::plan::{PlanOutput, RouteKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Normalize a question for cache keying
///
/// Lowercases, trims, collapses internal whitespace and drops trailing
/// sentence punctuation.
#[must_use]
pub fn normalize_question(question: &str) -> String {
    let collapsed = question
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    collapsed
        .trim_end_matches(['?', '!', '.'])
        .trim_end()
        .to_string()
}

/// Cache key for a tenant and question
#[must_use]
pub fn cache_key(tenant_id: &str, question: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tenant_id.as_bytes());
    hasher.update(b"\n");
    hasher.update(normalize_question(question).as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Hit/miss counters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Lookups that returned an entry
    pub hits: u64,
    /// Lookups that returned nothing
    pub misses: u64,
    /// Live entries
    pub entries: usize,
    /// `hits / (hits + misses)`, 0 when there were no lookups
    pub hit_rate: f64,
}

/// Route+Plan cache
pub struct RoutePlanCache {
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
    max_question_chars: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl RoutePlanCache {
    /// Create a cache over a backend
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>, ttl: Duration, max_question_chars: usize) -> Self {
        Self {
            backend,
            ttl,
            max_question_chars,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// In-memory cache with the given capacity
    #[must_use]
    pub fn in_memory(capacity: usize, ttl: Duration, max_question_chars: usize) -> Self {
        Self::new(
            Arc::new(MemoryCacheBackend::new(capacity)),
            ttl,
            max_question_chars,
        )
    }

    /// Whether a question is short enough to be cached
    #[must_use]
    pub fn accepts(&self, question: &str) -> bool {
        normalize_question(question).chars().count() <= self.max_question_chars
    }

    /// Look up a decision
    ///
    /// Returns the decision (marked as a cache hit) if one is live, plus the
    /// key that was looked up. Backend failures count as a miss. A stored
    /// entry whose kind disagrees with its payload is an
    /// [`Error::Consistency`].
    pub async fn get(&self, question: &str, tenant_id: &str) -> Result<(Option<PlanOutput>, String)> {
        let key = cache_key(tenant_id, question);

        let cached = match self.backend.get(&key).await {
            Ok(cached) => cached,
            Err(e) => {
                warn!(backend = self.backend.name(), error = %e, "Route cache lookup failed");
                None
            }
        };

        match cached {
            Some(entry) => {
                if entry.kind != entry.output.kind() {
                    return Err(Error::Consistency(format!(
                        "cache entry stored as {} holds a {} decision",
                        entry.kind,
                        entry.output.kind()
                    )));
                }
                self.hits.fetch_add(1, Ordering::Relaxed);
                let mut output = entry.output;
                output.mark_cache_hit();
                debug!(kind = %entry.kind, "Route cache hit");
                Ok((Some(output), key))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Ok((None, key))
            }
        }
    }

    /// Store a decision
    ///
    /// Plan decisions are skipped. `kind` must match the decision's payload.
    pub async fn set(
        &self,
        question: &str,
        tenant_id: &str,
        kind: RouteKind,
        result: &PlanOutput,
    ) -> Result<()> {
        if kind != result.kind() {
            return Err(Error::Consistency(format!(
                "cannot cache a {} decision as {}",
                result.kind(),
                kind
            )));
        }
        if kind == RouteKind::Plan {
            debug!("Plan decisions are not cached");
            return Ok(());
        }

        let key = cache_key(tenant_id, question);
        let entry = CachedRoute {
            kind,
            output: result.clone(),
        };
        if let Err(e) = self.backend.insert(key, entry, self.ttl).await {
            warn!(backend = self.backend.name(), error = %e, "Route cache insert failed");
        }
        Ok(())
    }

    /// Current counters
    pub async fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let entries = self.backend.len().await.unwrap_or_else(|e| {
            warn!(error = %e, "Route cache size unavailable");
            0
        });
        let total = hits + misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        };

        CacheStats {
            hits,
            misses,
            entries,
            hit_rate,
        }
    }

    /// Drop every entry (counters are kept)
    pub async fn clear(&self) -> Result<()> {
        self.backend.clear().await
    }
}
