//! # bundlevisor
//!
//! **Bundlevisor** is a client-side loading scheduler for optional code units
//! ("modules") of a content website.
//!
//! It decides which units to fetch, in what order and how many at once: requests are
//! resolved through a static registry, answered from a TTL cache when possible,
//! deduplicated while in flight, admitted under a concurrency cap with a priority
//! backlog, and followed by low-priority loads of declared dependents.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌─────────────┐ ┌──────────────┐ ┌──────────────────┐ ┌────────────────┐
//!  │PageDetector │ │HoverPrefetch │ │ ClickInterceptor │ │ ViewportLoader │
//!  │  (normal)   │ │    (low)     │ │      (high)      │ │     (low)      │
//!  └──────┬──────┘ └──────┬───────┘ └────────┬─────────┘ └───────┬────────┘
//!         ▼               ▼                  ▼                   ▼
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │  BundleOptimizer (facade)                                             │
//! │  - ModuleRegistry (name → location, pages, dependents, critical)      │
//! │  - Scheduler (cache store, in-flight map, backlog, metrics)           │
//! │  - SubscriberSet (fans out to user subscribers)                       │
//! └──────────────────────────────────┬────────────────────────────────────┘
//!                                    ▼
//!                     ┌────────────────────────────┐
//!                     │ loader: find_active/inject │──► UnitHost (host adapter)
//!                     │ timeout, retry, backoff    │
//!                     └──────────────┬─────────────┘
//!                                    │ LoadStarting / LoadSucceeded / LoadFailed / ...
//!                                    ▼
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                        │
//! └──────────────┬─────────────────────────────────────┬──────────────────┘
//!                ▼                                     ▼
//!       DependencyExpander                      subscriber listener
//!   (LoadSucceeded → dependents, low)                  ▼
//!                                                SubscriberSet
//! ```
//!
//! ### Request lifecycle
//! ```text
//! preload_module(name, priority)
//!   ├─► already loaded ─► Ok(None)
//!   ├─► unknown name   ─► warn, errors += 1, Ok(None)
//!   └─► Scheduler::request(name, location, priority)
//!         ├─ cache hit        ─► Ok(from_cache)
//!         ├─ in flight        ─► await the shared load
//!         ├─ slot free / critical ─► load now
//!         └─ saturated        ─► backlog (priority desc, FIFO) ─► load when admitted
//! ```
//!
//! ## Features
//! | Area              | Description                                               | Key types / traits                              |
//! |-------------------|-----------------------------------------------------------|-------------------------------------------------|
//! | **Facade**        | Load, preload, metrics, cache and teardown.               | [`BundleOptimizer`], [`MetricsSnapshot`]        |
//! | **Registry**      | Static module, page and dependency tables (JSON or code). | [`ModuleRegistry`], [`ModuleDescriptor`]        |
//! | **Host adapter**  | How units are injected and detected.                      | [`UnitHost`], [`HostFn`], [`UnitHandle`]        |
//! | **Triggers**      | Page, hover, click and viewport signals.                  | [`PageDetector`], [`ClickInterceptor`], …       |
//! | **Policies**      | Priority tiers and retry backoff.                         | [`Priority`], [`BackoffPolicy`]                 |
//! | **Subscriber API**| Hook into scheduler events.                               | [`Subscribe`], [`Event`], [`EventKind`]         |
//! | **Errors**        | Typed load and registry errors.                           | [`LoadError`], [`RegistryError`]                |
//! | **Configuration** | Centralized tunables.                                     | [`Config`]                                      |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] subscriber.
//!
//! ## Example
//! ```rust
//! use bundlevisor::{BundleOptimizer, Config, HostFn, HostRef, LoadError, ModuleRegistry, Priority, UnitHandle};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = ModuleRegistry::builder()
//!         .module("mbti", "/js/mbti-test.js")
//!         .module("tarot", "/js/tarot.js")
//!         .page("/tests/mbti/", ["mbti"])
//!         .dependents("mbti", ["tarot"])
//!         .build();
//!
//!     // The host adapter injects the unit and reports when it is active.
//!     let host: HostRef = HostFn::arc(|location: String| async move {
//!         Ok::<_, LoadError>(UnitHandle::new(location))
//!     });
//!
//!     let optimizer = BundleOptimizer::builder(Config::default(), host)
//!         .with_registry(registry)
//!         .build();
//!
//!     let outcome = optimizer.preload_module("mbti", Priority::High).await?;
//!     assert!(outcome.is_some());
//!     assert!(optimizer.loaded_modules().contains(&"mbti".to_string()));
//!
//!     optimizer.destroy();
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod policies;
mod subscribers;
mod triggers;
mod units;

// ---- Public re-exports ----

pub use crate::core::{
    BundleOptimizer, CacheEntry, CacheStore, Config, LoadOutcome, MetricsSnapshot,
    ModuleDescriptor, ModuleRegistry, OptimizerBuilder, RegistryBuilder,
    module_name_from_location,
};
pub use error::{LoadError, RegistryError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy, Priority};
pub use subscribers::{Subscribe, SubscriberSet};
pub use triggers::{
    ClickDecision, ClickInterceptor, HoverPrefetch, NavigationChannel, NavigationSource,
    PageDetector, SectionRect, ViewportLoader,
};
pub use units::{HostFn, HostRef, UnitHandle, UnitHost};

// Optional: expose a simple built-in logger subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
