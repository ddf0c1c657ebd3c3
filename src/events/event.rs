//! # Events emitted by the loading scheduler.
//!
//! The [`EventKind`] enum classifies events across three groups:
//! - **Request events**: what happened to a request before any network work
//!   (cache hit, unknown module, queued)
//! - **Load lifecycle events**: admitted, succeeded, failed, timeout, retry
//! - **Management events**: cache clears, navigation, teardown
//!
//! The [`Event`] struct carries optional metadata (module, location, priority,
//! timings). Fields that do not apply to a kind stay `None`.
//!
//! ## Ordering guarantees
//! Each event carries a globally unique, monotonically increasing `seq`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use bundlevisor::{Event, EventKind, Priority};
//!
//! let ev = Event::new(EventKind::LoadFailed)
//!     .with_module("tarot")
//!     .with_location("/js/tarot.js")
//!     .with_priority(Priority::High)
//!     .with_reason("404")
//!     .with_attempt(1);
//!
//! assert_eq!(ev.kind, EventKind::LoadFailed);
//! assert_eq!(ev.module.as_deref(), Some("tarot"));
//! assert_eq!(ev.priority, Some(Priority::High));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::policies::Priority;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of scheduler events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Request events ===
    /// Request answered from the cache store.
    ///
    /// Sets: `module`, `priority`
    CacheHit,

    /// Name is not registered; the request was dropped.
    ///
    /// Sets: `module`, `priority`
    UnknownModule,

    /// No admission slot was free; the request joined the backlog.
    ///
    /// Sets: `module`, `location`, `priority`
    LoadQueued,

    // === Load lifecycle events ===
    /// Load admitted and handed to the host.
    ///
    /// Sets: `module`, `location`, `priority`, `attempt`
    LoadStarting,

    /// Unit loaded and cached.
    ///
    /// Sets: `module`, `location`, `attempt`, `elapsed_ms`, `bytes`
    LoadSucceeded,

    /// Load failed for good (after any retries).
    ///
    /// Sets: `module`, `location`, `attempt`, `reason`
    /// (`attempt` is absent when the host panicked).
    LoadFailed,

    /// An attempt exceeded the load timeout.
    ///
    /// Sets: `location`, `timeout_ms`, `attempt`
    TimeoutHit,

    /// Another attempt scheduled after a retryable failure.
    ///
    /// Sets: `module`, `location`, `attempt` (the failed one), `delay_ms`, `reason`
    RetryScheduled,

    /// Dependents of a freshly loaded module were requested.
    ///
    /// Sets: `module` (the parent), `reason` (comma-separated dependents)
    DependentsRequested,

    // === Management events ===
    /// The cache store was emptied.
    CacheCleared,

    /// Host reported a navigation.
    ///
    /// Sets: `location` (the new page path)
    NavigationDetected,

    /// Scheduler state was dropped.
    Destroyed,
}

/// Scheduler event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Logical module name.
    pub module: Option<Arc<str>>,
    /// Unit location or page path.
    pub location: Option<Arc<str>>,
    /// Request priority.
    pub priority: Option<Priority>,
    /// Attempt number (starting from 1).
    pub attempt: Option<u32>,
    /// Load timeout in milliseconds.
    pub timeout_ms: Option<u32>,
    /// Retry delay in milliseconds.
    pub delay_ms: Option<u32>,
    /// Time from request to completion in milliseconds.
    pub elapsed_ms: Option<u32>,
    /// Estimated unit size in bytes.
    pub bytes: Option<u64>,
    /// Human-readable reason (errors, dependents, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            module: None,
            location: None,
            priority: None,
            attempt: None,
            timeout_ms: None,
            delay_ms: None,
            elapsed_ms: None,
            bytes: None,
            reason: None,
        }
    }

    #[inline]
    pub fn with_module(mut self, module: impl Into<Arc<str>>) -> Self {
        self.module = Some(module.into());
        self
    }

    #[inline]
    pub fn with_location(mut self, location: impl Into<Arc<str>>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[inline]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Attaches a timeout (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(millis(d));
        self
    }

    /// Attaches a retry delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(millis(d));
        self
    }

    /// Attaches the load duration (stored as milliseconds).
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed_ms = Some(millis(d));
        self
    }

    #[inline]
    pub fn with_bytes(mut self, bytes: u64) -> Self {
        self.bytes = Some(bytes);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// True for events that describe a failure.
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::LoadFailed | EventKind::TimeoutHit | EventKind::UnknownModule
        )
    }
}

fn millis(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::CacheHit);
        let b = Event::new(EventKind::CacheHit);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_durations_saturate() {
        let ev = Event::new(EventKind::TimeoutHit).with_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(ev.timeout_ms, Some(u32::MAX));
        assert!(ev.is_failure());
    }
}
