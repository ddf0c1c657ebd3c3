//! Loading core: registry, cache, scheduling and the facade.
//!
//! The only entry point most callers need is [`BundleOptimizer`], which wires the
//! pieces together and owns their background tasks.
//!
//! Internal modules:
//! - [`registry`]: static module/page/dependency tables;
//! - [`cache`]: TTL + insertion-order bounded cache store;
//! - [`loader`]: one unit load with deadline, retries and event publishing;
//! - [`scheduler`]: admission, priority backlog, in-flight dedup, metrics;
//! - [`expander`]: dependent loads driven by `LoadSucceeded` events;
//! - [`optimizer`] / [`builder`]: the facade and its construction.

mod builder;
mod cache;
mod config;
mod expander;
mod loader;
mod optimizer;
mod registry;
mod scheduler;

pub use builder::OptimizerBuilder;
pub use cache::{CacheEntry, CacheStore};
pub use config::Config;
pub use optimizer::BundleOptimizer;
pub use registry::{ModuleDescriptor, ModuleRegistry, RegistryBuilder, module_name_from_location};
pub use scheduler::{LoadOutcome, MetricsSnapshot};
