//! Core configuration

use crate::error::{Error, Result};
use std::time::Duration;

/// Default replan budget per request
pub const DEFAULT_MAX_REPLANS: u32 = 2;
/// Default per-stage time budget
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(30);
/// Default lifetime of a cached routing decision
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
/// Default number of cached routing decisions
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;
/// Questions longer than this (in chars, after normalization) bypass the cache
pub const DEFAULT_CACHE_MAX_QUESTION_CHARS: usize = 160;
/// Default time budget for the planning backend call
pub const DEFAULT_ROUTING_TIMEOUT: Duration = Duration::from_secs(60);

/// Hard ceiling on `max_replans`
const MAX_REPLANS_CEILING: u32 = 10;

/// Configuration for the orchestration core
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Maximum number of patched retries per request
    pub max_replans: u32,
    /// Time budget for a single stage call
    pub stage_timeout: Duration,
    /// Lifetime of a cached routing decision
    pub cache_ttl: Duration,
    /// Maximum number of cached routing decisions
    pub cache_capacity: usize,
    /// Longest normalized question eligible for caching
    pub cache_max_question_chars: usize,
    /// Time budget for the planning backend call
    pub routing_timeout: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_replans: DEFAULT_MAX_REPLANS,
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_max_question_chars: DEFAULT_CACHE_MAX_QUESTION_CHARS,
            routing_timeout: DEFAULT_ROUTING_TIMEOUT,
        }
    }
}

impl CoreConfig {
    /// Create a configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the replan budget
    #[must_use]
    pub fn with_max_replans(mut self, max_replans: u32) -> Self {
        self.max_replans = max_replans;
        self
    }

    /// Set the per-stage timeout
    #[must_use]
    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    /// Set the cache TTL
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Set the cache capacity
    #[must_use]
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set the cacheable question length threshold
    #[must_use]
    pub fn with_cache_max_question_chars(mut self, chars: usize) -> Self {
        self.cache_max_question_chars = chars;
        self
    }

    /// Set the routing timeout
    #[must_use]
    pub fn with_routing_timeout(mut self, timeout: Duration) -> Self {
        self.routing_timeout = timeout;
        self
    }

    /// Worst-case latency of the pipeline part of one request
    ///
    /// One routing call plus up to `max_replans + 1` attempts of four stages,
    /// with one extra present call for the terminal notice.
    #[must_use]
    pub fn latency_ceiling(&self) -> Duration {
        let stage_calls = (self.max_replans + 1) * 4 + 1;
        self.routing_timeout + self.stage_timeout * stage_calls
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_replans > MAX_REPLANS_CEILING {
            return Err(Error::InvalidConfig {
                field: "max_replans".to_string(),
                message: format!("must be at most {MAX_REPLANS_CEILING}"),
            });
        }
        if self.stage_timeout.is_zero() {
            return Err(Error::InvalidConfig {
                field: "stage_timeout".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.routing_timeout.is_zero() {
            return Err(Error::InvalidConfig {
                field: "routing_timeout".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.cache_capacity == 0 {
            return Err(Error::InvalidConfig {
                field: "cache_capacity".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.max_replans, 2);
        assert_eq!(config.stage_timeout, Duration::from_secs(30));
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.cache_capacity, 1024);
        assert_eq!(config.cache_max_question_chars, 160);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_and_validation() {
        let config = CoreConfig::new().with_max_replans(50);
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidConfig { ref field, .. }) if field == "max_replans"
        ));

        let config = CoreConfig::new().with_cache_capacity(0);
        assert!(config.validate().is_err());

        let config = CoreConfig::new().with_stage_timeout(Duration::ZERO);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_latency_ceiling() {
        let config = CoreConfig::new()
            .with_max_replans(1)
            .with_stage_timeout(Duration::from_secs(10))
            .with_routing_timeout(Duration::from_secs(5));
        // 2 attempts * 4 stages + 1 notice = 9 stage calls
        assert_eq!(config.latency_ceiling(), Duration::from_secs(95));
    }
}
