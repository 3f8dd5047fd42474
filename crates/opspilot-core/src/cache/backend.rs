//! Cache backends
//!
//! The backend is the only cross-request shared mutable state in the core.
//! [`MemoryCacheBackend`] serves a single process; a multi-instance
//! deployment plugs a shared store in behind [`CacheBackend`].

use crate::error::Result;
use crate::plan::{PlanOutput, RouteKind};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// A cached routing decision
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRoute {
    /// Kind the decision was stored under
    pub kind: RouteKind,
    /// The decision
    pub output: PlanOutput,
}

/// Storage behind the route cache
#[async_trait::async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch a live entry
    async fn get(&self, key: &str) -> Result<Option<CachedRoute>>;

    /// Insert or replace an entry with a TTL
    async fn insert(&self, key: String, value: CachedRoute, ttl: Duration) -> Result<()>;

    /// Number of live entries
    async fn len(&self) -> Result<usize>;

    /// Drop every entry
    async fn clear(&self) -> Result<()>;

    /// Get the backend name (for logging)
    fn name(&self) -> &str;
}

struct Entry {
    value: CachedRoute,
    expires_at: Instant,
    seq: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    /// Insertion sequence → key, oldest first
    order: BTreeMap<u64, String>,
    next_seq: u64,
}

impl Inner {
    fn remove(&mut self, key: &str) -> Option<Entry> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.seq);
        Some(entry)
    }

    fn purge_expired(&mut self, now: Instant) {
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| e.expires_at <= now)
            .map(|(k, _)| k.clone())
            .collect();
        for key in expired {
            self.remove(&key);
        }
    }

    fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }
}

/// In-process cache backend with TTL expiry and oldest-first eviction
///
/// Every read/modify/write happens under one async mutex, so concurrent
/// requests for the same key cannot interleave check, evict and insert.
pub struct MemoryCacheBackend {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl MemoryCacheBackend {
    /// Create a backend holding at most `capacity` entries
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Maximum number of entries
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[async_trait::async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> Result<Option<CachedRoute>> {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();

        let expired = match inner.entries.get(key) {
            None => return Ok(None),
            Some(entry) => entry.expires_at <= now,
        };
        if expired {
            inner.remove(key);
            return Ok(None);
        }
        Ok(inner.entries.get(key).map(|e| e.value.clone()))
    }

    async fn insert(&self, key: String, value: CachedRoute, ttl: Duration) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();

        inner.remove(&key);
        if inner.entries.len() >= self.capacity {
            inner.purge_expired(now);
        }
        while inner.entries.len() >= self.capacity {
            match inner.evict_oldest() {
                Some(evicted) => debug!(key = %evicted, "Evicted oldest route cache entry"),
                None => break,
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.order.insert(seq, key.clone());
        inner.entries.insert(
            key,
            Entry {
                value,
                expires_at: now + ttl,
                seq,
            },
        );
        Ok(())
    }

    async fn len(&self) -> Result<usize> {
        let mut inner = self.inner.lock().await;
        inner.purge_expired(Instant::now());
        Ok(inner.entries.len())
    }

    async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        *inner = Inner::default();
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
