//! # BundleOptimizer: the application-facing facade.
//!
//! One instance is built by the entry point ([`BundleOptimizer::builder`]) and shared as
//! `Arc<BundleOptimizer>` with every trigger source. It resolves logical names through
//! the registry and hands requests to the scheduler.
//!
//! ## Background tasks (spawned by the builder)
//! ```text
//! Bus ──► subscriber listener ──► SubscriberSet (user subscribers)
//!     └─► DependencyExpander listener
//! start(nav) ──► critical preload + PageDetector listener
//! ```
//! All of them stop when [`BundleOptimizer::destroy`] cancels the runtime token. The
//! subscriber listener owns the [`SubscriberSet`]: on cancel it closes the queues and
//! waits for the workers to drain what they already received.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        config::Config,
        registry::{ModuleRegistry, module_name_from_location},
        scheduler::{LoadOutcome, MetricsSnapshot, Scheduler},
    },
    error::LoadError,
    events::{Bus, Event, EventKind},
    policies::Priority,
    subscribers::SubscriberSet,
    triggers::{ClickInterceptor, HoverPrefetch, NavigationSource, PageDetector, ViewportLoader},
};

/// Dynamic code-unit loading scheduler.
pub struct BundleOptimizer {
    pub(crate) cfg: Config,
    pub(crate) registry: Arc<ModuleRegistry>,
    pub(crate) scheduler: Arc<Scheduler>,
    pub(crate) bus: Bus,
    pub(crate) token: CancellationToken,
}

impl BundleOptimizer {
    /// Configuration the optimizer was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Raw event stream. Receivers only see events published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Requests a registered module by name.
    ///
    /// Returns `Ok(None)` when the module is already loaded, or when the name is unknown
    /// (logged, counted as an error, published as `UnknownModule`).
    pub async fn preload_module(
        &self,
        name: &str,
        priority: Priority,
    ) -> Result<Option<LoadOutcome>, LoadError> {
        if self.scheduler.is_loaded(name) {
            return Ok(None);
        }
        let Some(location) = self.registry.resolve(name) else {
            let err = LoadError::UnknownModule {
                name: name.to_string(),
            };
            tracing::warn!(module = name, label = err.as_label(), "{}", err.as_message());
            self.scheduler.record_error();
            self.bus.publish(
                Event::new(EventKind::UnknownModule)
                    .with_module(name)
                    .with_priority(priority),
            );
            return Ok(None);
        };
        self.scheduler.request(name, location, priority).await.map(Some)
    }

    /// Requests a module at `normal` priority.
    pub async fn load_module(&self, name: &str) -> Result<Option<LoadOutcome>, LoadError> {
        self.preload_module(name, Priority::Normal).await
    }

    /// Requests a module at `high` priority.
    pub async fn require_module(&self, name: &str) -> Result<Option<LoadOutcome>, LoadError> {
        self.preload_module(name, Priority::High).await
    }

    /// Loads every critical location at `critical` priority, concurrently.
    ///
    /// Returns the first failure once all of them have settled.
    pub async fn preload_critical_modules(&self) -> Result<(), LoadError> {
        let loads = self.registry.critical_locations().iter().map(|location| {
            let name = module_name_from_location(location);
            async move {
                self.scheduler
                    .request(&name, location, Priority::Critical)
                    .await
            }
        });

        let failed = join_all(loads).await.into_iter().find_map(Result::err);
        match failed {
            Some(e) => {
                tracing::warn!(err = %e, "critical modules did not all load");
                Err(e)
            }
            None => {
                let count = self.registry.critical_locations().len();
                tracing::debug!(count, "critical modules loaded");
                Ok(())
            }
        }
    }

    /// Diagnostic: requests every registered module at `low` priority.
    ///
    /// Returns the first failure once all requests have settled.
    pub async fn load_all_modules(&self) -> Result<(), LoadError> {
        let loads = self
            .registry
            .modules()
            .iter()
            .map(|desc| self.preload_module(&desc.name, Priority::Low));

        let failed = join_all(loads).await.into_iter().find_map(Result::err);
        match failed {
            Some(e) => Err(e),
            None => {
                tracing::info!(count = self.registry.len(), "all modules loaded");
                Ok(())
            }
        }
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.scheduler.metrics()
    }

    /// Empties the cache store; loaded names are kept.
    pub fn clear_cache(&self) {
        self.scheduler.clear_cache();
        self.bus.publish(Event::new(EventKind::CacheCleared));
        tracing::info!("module cache cleared");
    }

    /// Names of loaded modules, in load order.
    pub fn loaded_modules(&self) -> Vec<String> {
        self.scheduler.loaded_modules()
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.scheduler.is_loaded(name)
    }

    /// Drops all scheduler state and stops the background listeners.
    ///
    /// Units already injected into the host stay active. Requests issued afterwards
    /// are still served, without dependency expansion or page detection.
    pub fn destroy(&self) {
        self.scheduler.destroy();
        self.bus.publish(Event::new(EventKind::Destroyed));
        self.token.cancel();
    }

    /// Starts the entry-point behaviour: critical preload and page detection.
    ///
    /// The critical preload runs in the background; its failures are logged and counted
    /// by the scheduler.
    pub fn start(self: &Arc<Self>, nav: Arc<dyn NavigationSource>) -> JoinHandle<()> {
        let me = Arc::clone(self);
        tokio::spawn(async move {
            let _ = me.preload_critical_modules().await;
        });
        PageDetector::new(Arc::clone(self)).spawn(nav, self.token.child_token())
    }

    pub fn page_detector(self: &Arc<Self>) -> PageDetector {
        PageDetector::new(Arc::clone(self))
    }

    pub fn hover_prefetch(self: &Arc<Self>) -> HoverPrefetch {
        HoverPrefetch::new(Arc::clone(self))
    }

    pub fn click_interceptor(self: &Arc<Self>) -> ClickInterceptor {
        ClickInterceptor::new(Arc::clone(self))
    }

    pub fn viewport_loader(self: &Arc<Self>) -> ViewportLoader {
        ViewportLoader::new(Arc::clone(self))
    }

    /// Forwards bus events to `set` until the token is cancelled, then shuts it down.
    pub(crate) fn subscriber_listener(&self, set: SubscriberSet) {
        if set.is_empty() {
            return;
        }
        let mut rx = self.bus.subscribe();
        let token = self.token.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    msg = rx.recv() => match msg {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Closed) => break,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "subscriber listener lagged behind the bus");
                        }
                    },
                    _ = token.cancelled() => break,
                }
            }
            set.shutdown().await;
            tracing::debug!("subscriber workers drained");
        });
    }
}
