use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{
    config::Config, expander::DependencyExpander, optimizer::BundleOptimizer,
    registry::ModuleRegistry, scheduler::Scheduler,
};
use crate::{
    events::Bus,
    subscribers::{Subscribe, SubscriberSet},
    units::HostRef,
};

/// Builder for constructing a [`BundleOptimizer`].
pub struct OptimizerBuilder {
    cfg: Config,
    host: HostRef,
    registry: ModuleRegistry,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl BundleOptimizer {
    /// Starts building an optimizer that injects units through `host`.
    pub fn builder(cfg: Config, host: HostRef) -> OptimizerBuilder {
        OptimizerBuilder::new(cfg, host)
    }
}

impl OptimizerBuilder {
    /// Creates a new builder with an empty registry and no subscribers.
    pub fn new(cfg: Config, host: HostRef) -> Self {
        Self {
            cfg,
            host,
            registry: ModuleRegistry::default(),
            subscribers: Vec::new(),
        }
    }

    /// Sets the module registry (names, pages, dependents, critical locations).
    pub fn with_registry(mut self, registry: ModuleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive scheduler events through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the optimizer and spawns its background listeners.
    ///
    /// Must be called inside a tokio runtime:
    /// - event bus
    /// - scheduler (cache store, backlog, metrics)
    /// - dependency expander listener
    /// - subscriber workers and their bus listener
    pub fn build(self) -> Arc<BundleOptimizer> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let registry = Arc::new(self.registry);
        let token = CancellationToken::new();

        let scheduler = Scheduler::new(&self.cfg, Arc::clone(&registry), self.host, bus.clone());
        DependencyExpander::new(Arc::clone(&registry), Arc::clone(&scheduler), bus.clone())
            .spawn_listener(token.child_token());

        let optimizer = Arc::new(BundleOptimizer {
            cfg: self.cfg,
            registry,
            scheduler,
            bus,
            token,
        });
        optimizer.subscriber_listener(SubscriberSet::new(self.subscribers));

        tracing::debug!(
            modules = optimizer.registry.len(),
            max_concurrent = optimizer.cfg.max_concurrent,
            "bundle optimizer initialized"
        );
        optimizer
    }
}
