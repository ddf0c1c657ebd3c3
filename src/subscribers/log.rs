//! # LogWriter: renders scheduler events through `tracing`.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! DEBUG bundlevisor: cache hit module="fortune"
//! DEBUG bundlevisor: queued module="tarot" priority="normal"
//!  INFO bundlevisor: loaded module="tarot" elapsed_ms=84 bytes=20480
//!  WARN bundlevisor: timeout location="/js/manseryeok-database.js" timeout_ms=10000
//!  WARN bundlevisor: load failed module="mbti" err="404"
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let module = e.module.as_deref().unwrap_or("-");
        let location = e.location.as_deref().unwrap_or("-");
        let priority = e.priority.map(|p| p.as_str()).unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::CacheHit => tracing::debug!(module, "cache hit"),
            EventKind::UnknownModule => tracing::warn!(module, "unknown module"),
            EventKind::LoadQueued => tracing::debug!(module, priority, "queued"),
            EventKind::LoadStarting => {
                tracing::debug!(module, location, priority, attempt = e.attempt, "starting")
            }
            EventKind::LoadSucceeded => {
                tracing::info!(module, elapsed_ms = e.elapsed_ms, bytes = e.bytes, "loaded")
            }
            EventKind::LoadFailed => tracing::warn!(module, err = reason, "load failed"),
            EventKind::TimeoutHit => tracing::warn!(location, timeout_ms = e.timeout_ms, "timeout"),
            EventKind::RetryScheduled => {
                tracing::info!(module, delay_ms = e.delay_ms, after_attempt = e.attempt, "retry")
            }
            EventKind::DependentsRequested => {
                tracing::debug!(module, dependents = reason, "dependents requested")
            }
            EventKind::CacheCleared => tracing::info!("cache cleared"),
            EventKind::NavigationDetected => tracing::debug!(path = location, "navigation"),
            EventKind::Destroyed => tracing::info!("destroyed"),
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
