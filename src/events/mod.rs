//! Scheduler events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to everything the scheduler does.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Scheduler` (cache hits, queueing, completion), `loader::load_once`
//!   (timeouts), `BundleOptimizer` (unknown modules, cache clears, destroy),
//!   `PageDetector` (navigation).
//! - **Consumers**: `DependencyExpander` (reacts to `LoadSucceeded`) and the
//!   optimizer listener that fans events out to the [`SubscriberSet`](crate::SubscriberSet).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
