//! # Code-unit loader: one unit, with deadline and optional retries.
//!
//! ## Event flow
//! ```text
//! attempt n:
//!   publish LoadStarting
//!   host.find_active(location) ── Some ──► Ok(handle)          (no fetch)
//!          │ None
//!          ▼
//!   timeout(host.inject(location))
//!          ├─ Ok(handle)  ──► Ok(handle)
//!          ├─ Err(e)      ──► retryable and attempts left?
//!          └─ elapsed     ──► publish TimeoutHit, Err(Timeout) ─┘
//!                                   ├─ yes: publish RetryScheduled, sleep(backoff.next(n-1)), attempt n+1
//!                                   └─ no:  return the error
//! ```
//!
//! ## Rules
//! - The already-active check runs before every attempt and never hits the network.
//! - A timed-out inject future is dropped; nothing is left running on our side.
//! - The number of attempts is `1 + retry_attempts`.

use std::time::Duration;

use tokio::time;

use crate::{
    error::LoadError,
    events::{Bus, Event, EventKind},
    policies::{BackoffPolicy, Priority},
    units::{UnitHandle, UnitHost},
};

/// Per-load parameters taken from [`Config`](crate::Config).
#[derive(Clone, Copy, Debug)]
pub struct LoadParams {
    /// Deadline for one attempt (`None` = no deadline).
    pub timeout: Option<Duration>,
    /// Extra attempts after a retryable failure.
    pub retry_attempts: u32,
    /// Delay between attempts.
    pub backoff: BackoffPolicy,
}

/// Identifies the request a load belongs to (for events only).
#[derive(Clone, Copy, Debug)]
pub struct LoadTarget<'a> {
    pub module: &'a str,
    pub location: &'a str,
    pub priority: Priority,
}

/// Final result of [`load_with_retry`] and the number of attempts it took.
#[derive(Debug)]
pub struct LoadReport {
    pub attempts: u32,
    pub result: Result<UnitHandle, LoadError>,
}

/// Runs a single attempt against the host.
pub async fn load_once(
    host: &dyn UnitHost,
    location: &str,
    timeout: Option<Duration>,
    attempt: u32,
    bus: &Bus,
) -> Result<UnitHandle, LoadError> {
    if let Some(active) = host.find_active(location) {
        return Ok(active);
    }

    match timeout.filter(|d| *d > Duration::ZERO) {
        Some(dur) => match time::timeout(dur, host.inject(location)).await {
            Ok(res) => res,
            Err(_elapsed) => {
                bus.publish(
                    Event::new(EventKind::TimeoutHit)
                        .with_location(location)
                        .with_timeout(dur)
                        .with_attempt(attempt),
                );
                Err(LoadError::Timeout {
                    location: location.to_string(),
                    timeout: dur,
                })
            }
        },
        None => host.inject(location).await,
    }
}

/// Runs attempts until success, a non-retryable error, or the retry budget is spent.
pub async fn load_with_retry(
    host: &dyn UnitHost,
    target: LoadTarget<'_>,
    params: LoadParams,
    bus: &Bus,
) -> LoadReport {
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        bus.publish(
            Event::new(EventKind::LoadStarting)
                .with_module(target.module)
                .with_location(target.location)
                .with_priority(target.priority)
                .with_attempt(attempt),
        );

        let err = match load_once(host, target.location, params.timeout, attempt, bus).await {
            Ok(handle) => {
                return LoadReport {
                    attempts: attempt,
                    result: Ok(handle),
                };
            }
            Err(e) => e,
        };
        if !err.is_retryable() || attempt > params.retry_attempts {
            return LoadReport {
                attempts: attempt,
                result: Err(err),
            };
        }

        let delay = params.backoff.next(attempt - 1);
        bus.publish(
            Event::new(EventKind::RetryScheduled)
                .with_module(target.module)
                .with_location(target.location)
                .with_attempt(attempt)
                .with_delay(delay)
                .with_reason(err.to_string()),
        );
        time::sleep(delay).await;
    }
}
