//! FX rate caching with TTL support.

use chrono::Duration;
use edufund_common::{constants, RateTable, Timestamp};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// A fetched rate table and the instant it was fetched.
///
/// Always replaced as a whole, so the pair is never seen half-updated.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedRates {
    pub rates: Arc<RateTable>,
    pub fetched_at: Timestamp,
}

impl CachedRates {
    fn is_fresh(&self, now: Timestamp, ttl: Duration) -> bool {
        now.signed_duration_since(self.fetched_at) < ttl
    }
}

/// Configuration for rate cache.
#[derive(Debug, Clone)]
pub struct RateCacheConfig {
    /// How long a fetched table is served without refreshing.
    pub ttl: Duration,
}

impl Default for RateCacheConfig {
    fn default() -> Self {
        Self {
            ttl: constants::rate_cache_duration(),
        }
    }
}

/// Thread-safe single-entry cache of the latest live rate table.
pub struct RateCache {
    entry: RwLock<Option<Arc<CachedRates>>>,
    config: RateCacheConfig,
}

impl RateCache {
    /// Create a new rate cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(RateCacheConfig::default())
    }

    /// Create a new rate cache with custom configuration.
    pub fn with_config(config: RateCacheConfig) -> Self {
        Self {
            entry: RwLock::new(None),
            config,
        }
    }

    /// Get the cached rates if they are still fresh at `now`.
    pub fn fresh(&self, now: Timestamp) -> Option<Arc<CachedRates>> {
        let entry = self.entry.read().clone()?;
        if entry.is_fresh(now, self.config.ttl) {
            debug!(fetched_at = %entry.fetched_at, "Cache hit");
            Some(entry)
        } else {
            debug!(fetched_at = %entry.fetched_at, "Cache entry stale");
            None
        }
    }

    /// Replace the cached rates.
    pub fn store(&self, rates: RateTable, fetched_at: Timestamp) -> Arc<CachedRates> {
        let entry = Arc::new(CachedRates {
            rates: Arc::new(rates),
            fetched_at,
        });
        *self.entry.write() = Some(entry.clone());
        entry
    }

    /// Get the cached rates regardless of freshness.
    pub fn current(&self) -> Option<Arc<CachedRates>> {
        self.entry.read().clone()
    }

    /// Drop the cached rates.
    pub fn clear(&self) {
        *self.entry.write() = None;
    }

    /// Configured time to live.
    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }
}

impl Default for RateCache {
    fn default() -> Self {
        Self::new()
    }
}
