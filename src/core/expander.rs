//! # Dependency expander: follow-up loads for freshly loaded modules.
//!
//! The expander listens on the bus and reacts to `LoadSucceeded`. For every
//! declared dependent of the loaded module that is neither loaded nor in flight,
//! it spawns a `low` priority request and forgets about it.
//!
//! ## Architecture
//! ```text
//! Bus → DependencyExpander listener
//!         └─► LoadSucceeded(X) → for d in dependents(X):
//!                                  ├─ loaded or in flight → skip
//!                                  ├─ unregistered        → warn, errors += 1
//!                                  └─ spawn request(d, low), result dropped
//!                                publish DependentsRequested(X, "d1,d2")
//! ```
//!
//! ## Rules
//! - The parent request has already resolved when the expander sees the event;
//!   a failing dependent can only reach the error counter.
//! - Lagging behind the bus drops events with a warning; nothing is replayed.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{registry::ModuleRegistry, scheduler::Scheduler},
    events::{Bus, Event, EventKind},
    policies::Priority,
};

/// Event-driven loader of declared dependents.
pub struct DependencyExpander {
    registry: Arc<ModuleRegistry>,
    scheduler: Arc<Scheduler>,
    bus: Bus,
}

impl DependencyExpander {
    pub fn new(registry: Arc<ModuleRegistry>, scheduler: Arc<Scheduler>, bus: Bus) -> Arc<Self> {
        Arc::new(Self {
            registry,
            scheduler,
            bus,
        })
    }

    /// Spawns the bus listener. It runs until `token` is cancelled or the bus closes.
    pub fn spawn_listener(self: Arc<Self>, token: CancellationToken) -> JoinHandle<()> {
        let mut rx = self.bus.subscribe();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(ev) => self.handle_event(&ev),
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "dependency expander lagged behind the bus");
                            continue;
                        }
                    }
                }
            }
        })
    }

    fn handle_event(&self, ev: &Event) {
        if ev.kind != EventKind::LoadSucceeded {
            return;
        }
        let Some(parent) = ev.module.as_deref() else {
            return;
        };

        let requested = self.expand(parent);
        if !requested.is_empty() {
            self.bus.publish(
                Event::new(EventKind::DependentsRequested)
                    .with_module(parent)
                    .with_reason(requested.join(",")),
            );
        }
    }

    /// Requests the missing dependents of `parent` and returns their names.
    pub fn expand(&self, parent: &str) -> Vec<String> {
        let mut requested = Vec::new();

        for dep in self.registry.dependents(parent) {
            if self.scheduler.is_loaded(dep) || self.scheduler.is_in_flight(dep) {
                continue;
            }
            let Some(location) = self.registry.resolve(dep) else {
                tracing::warn!(module = %dep, parent, "dependent is not registered");
                self.scheduler.record_error();
                continue;
            };

            let scheduler = Arc::clone(&self.scheduler);
            let (name, location) = (dep.clone(), location.to_string());
            tokio::spawn(async move {
                if let Err(e) = scheduler.request(&name, &location, Priority::Low).await {
                    tracing::debug!(module = %name, err = %e, "dependent load dropped");
                }
            });
            requested.push(dep.clone());
        }
        requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::error::LoadError;
    use crate::units::{HostFn, HostRef, UnitHandle};
    use std::sync::Mutex;
    use std::time::Duration;

    fn recording_host(calls: Arc<Mutex<Vec<String>>>) -> HostRef {
        HostFn::arc(move |location: String| {
            let calls = Arc::clone(&calls);
            async move {
                calls.lock().unwrap().push(location.clone());
                if location.contains("broken") {
                    return Err(LoadError::failed(location, "script error"));
                }
                Ok(UnitHandle::new(location))
            }
        })
    }

    async fn wait_until(mut cond: impl FnMut() -> bool) {
        for _ in 0..2_000 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("condition not reached");
    }

    fn setup(host: HostRef) -> (Arc<Scheduler>, Bus, CancellationToken) {
        let registry = Arc::new(
            ModuleRegistry::builder()
                .module("saju", "/js/saju.js")
                .module("manseryeok", "/js/manseryeok.js")
                .module("calendar", "/js/calendar.js")
                .module("broken", "/js/broken.js")
                .dependents("saju", ["manseryeok", "calendar"])
                .dependents("tarot", ["broken", "ghost"])
                .module("tarot", "/js/tarot.js")
                .build(),
        );
        let bus = Bus::new(64);
        let scheduler = Scheduler::new(&Config::default(), Arc::clone(&registry), host, bus.clone());
        let token = CancellationToken::new();
        DependencyExpander::new(registry, Arc::clone(&scheduler), bus.clone())
            .spawn_listener(token.clone());
        (scheduler, bus, token)
    }

    #[tokio::test]
    async fn test_loads_dependents_after_parent() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (scheduler, bus, token) = setup(recording_host(Arc::clone(&calls)));
        let mut rx = bus.subscribe();

        scheduler.request("saju", "/js/saju.js", Priority::Normal).await.unwrap();
        wait_until(|| scheduler.loaded_modules().len() == 3).await;

        assert_eq!(calls.lock().unwrap()[0], "/js/saju.js");
        assert!(scheduler.is_loaded("manseryeok"));
        assert!(scheduler.is_loaded("calendar"));

        let mut dependents = None;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::DependentsRequested {
                dependents = ev.reason.clone();
            }
        }
        assert_eq!(dependents.as_deref(), Some("manseryeok,calendar"));
        token.cancel();
    }

    #[tokio::test]
    async fn test_skips_already_loaded_dependents() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (scheduler, _bus, token) = setup(recording_host(Arc::clone(&calls)));

        scheduler.request("calendar", "/js/calendar.js", Priority::Normal).await.unwrap();
        scheduler.request("saju", "/js/saju.js", Priority::Normal).await.unwrap();
        wait_until(|| scheduler.is_loaded("manseryeok")).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let calendar_calls = calls
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.as_str() == "/js/calendar.js")
            .count();
        assert_eq!(calendar_calls, 1);
        token.cancel();
    }

    #[tokio::test]
    async fn test_dependent_failures_only_reach_error_counter() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (scheduler, _bus, token) = setup(recording_host(Arc::clone(&calls)));

        let parent = scheduler.request("tarot", "/js/tarot.js", Priority::Normal).await;
        assert!(parent.is_ok());

        // one failed load, one unregistered dependent
        wait_until(|| scheduler.metrics().errors == 2).await;
        assert_eq!(scheduler.loaded_modules(), ["tarot"]);
        token.cancel();
    }
}
