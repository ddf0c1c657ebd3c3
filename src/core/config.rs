//! # Scheduler configuration.
//!
//! [`Config`] centralizes every tunable of the loading scheduler. It is consumed by
//! [`BundleOptimizer::builder`](crate::BundleOptimizer::builder) and shared (read-only)
//! with the scheduler, the cache store and the trigger sources.
//!
//! ## Sentinel values
//! - `max_concurrent = 0` → unlimited admission (backlog never used)
//! - `load_timeout = 0s` → no timeout

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Global configuration for the loading scheduler.
///
/// ## Field semantics
/// - `max_concurrent`: in-flight cap for non-critical loads (`0` = unlimited)
/// - `load_timeout`: deadline for one attempt (`0s` = none)
/// - `retry_attempts`: extra attempts after a retryable failure (`0` = fail fast)
/// - `backoff`: delay between those attempts
/// - `cache_enabled` / `cache_ttl` / `cache_capacity`: cache store behaviour
/// - `bus_capacity`: event ring buffer size (min 1)
/// - `navigation_settle`: delay between a navigation and page detection
/// - `viewport_margin_px`: distance at which a section counts as near the viewport
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of non-critical loads in flight.
    ///
    /// `critical` requests ignore this cap and may transiently exceed it.
    pub max_concurrent: usize,

    /// Deadline for a single load attempt.
    pub load_timeout: Duration,

    /// Number of additional attempts for `Timeout` / `Failed` errors.
    ///
    /// The admission slot is held across retries.
    pub retry_attempts: u32,

    /// Delay policy between retries.
    pub backoff: BackoffPolicy,

    /// When `false` the cache store never hits and never stores.
    pub cache_enabled: bool,

    /// Maximum age of a cache entry.
    pub cache_ttl: Duration,

    /// Maximum number of cache entries; the earliest inserted is evicted beyond it.
    pub cache_capacity: usize,

    /// Capacity of the event bus broadcast channel.
    pub bus_capacity: usize,

    /// Delay applied after a navigation before required modules are resolved.
    pub navigation_settle: Duration,

    /// Root margin used by the viewport trigger, in CSS pixels.
    pub viewport_margin_px: u32,
}

impl Config {
    /// Returns the admission cap as an `Option` (`None` = unlimited).
    #[inline]
    pub fn concurrency_limit(&self) -> Option<usize> {
        if self.max_concurrent == 0 {
            None
        } else {
            Some(self.max_concurrent)
        }
    }

    /// Returns the per-attempt timeout as an `Option` (`None` = no timeout).
    #[inline]
    pub fn timeout(&self) -> Option<Duration> {
        if self.load_timeout == Duration::ZERO {
            None
        } else {
            Some(self.load_timeout)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// - `max_concurrent = 4`
    /// - `load_timeout = 10s`
    /// - `retry_attempts = 0`
    /// - `cache_enabled = true`, `cache_ttl = 24h`, `cache_capacity = 50`
    /// - `bus_capacity = 1024`
    /// - `navigation_settle = 100ms`, `viewport_margin_px = 100`
    fn default() -> Self {
        Self {
            max_concurrent: 4,
            load_timeout: Duration::from_secs(10),
            retry_attempts: 0,
            backoff: BackoffPolicy::default(),
            cache_enabled: true,
            cache_ttl: Duration::from_secs(60 * 60 * 24),
            cache_capacity: 50,
            bus_capacity: 1024,
            navigation_settle: Duration::from_millis(100),
            viewport_margin_px: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.concurrency_limit(), Some(4));
        assert_eq!(cfg.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(cfg.cache_capacity, 50);
        assert_eq!(cfg.retry_attempts, 0);
    }

    #[test]
    fn test_sentinels() {
        let cfg = Config {
            max_concurrent: 0,
            load_timeout: Duration::ZERO,
            bus_capacity: 0,
            ..Config::default()
        };
        assert_eq!(cfg.concurrency_limit(), None);
        assert_eq!(cfg.timeout(), None);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
