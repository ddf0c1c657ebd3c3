//! # Page-path detection.
//!
//! Requests the modules a page needs, once at start and after every navigation.
//!
//! ```text
//! spawn(nav):
//!   detect(nav.current_path())
//!   loop:
//!     nav.recv(path) → publish NavigationDetected(path)
//!                    → sleep(navigation_settle)
//!                    → detect(nav.current_path())
//! ```
//! Names in the page table that the registry does not know are skipped silently.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    core::BundleOptimizer,
    events::{Event, EventKind},
    policies::Priority,
    triggers::NavigationSource,
};

/// Loads page modules at `normal` priority.
pub struct PageDetector {
    optimizer: Arc<BundleOptimizer>,
    settle: Duration,
}

impl PageDetector {
    pub fn new(optimizer: Arc<BundleOptimizer>) -> Self {
        let settle = optimizer.config().navigation_settle;
        Self { optimizer, settle }
    }

    /// Requests every registered module required by `path` and returns their names.
    pub fn detect(&self, path: &str) -> Vec<String> {
        let registry = self.optimizer.registry();
        let names: Vec<String> = registry
            .required_modules(path)
            .iter()
            .filter(|name| registry.resolve(name).is_some())
            .cloned()
            .collect();

        for name in &names {
            let optimizer = Arc::clone(&self.optimizer);
            let name = name.clone();
            tokio::spawn(async move {
                let _ = optimizer.preload_module(&name, Priority::Normal).await;
            });
        }
        names
    }

    /// Detects the current page, then follows navigations until `token` is cancelled.
    pub fn spawn(self, nav: Arc<dyn NavigationSource>, token: CancellationToken) -> JoinHandle<()> {
        let mut rx = nav.subscribe();

        tokio::spawn(async move {
            self.detect(&nav.current_path());
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    msg = rx.recv() => match msg {
                        Ok(path) => {
                            self.optimizer
                                .bus
                                .publish(Event::new(EventKind::NavigationDetected).with_location(path));
                            tokio::select! {
                                _ = token.cancelled() => break,
                                _ = tokio::time::sleep(self.settle) => {}
                            }
                            self.detect(&nav.current_path());
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "navigation stream lagged");
                            self.detect(&nav.current_path());
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Config, ModuleRegistry};
    use crate::triggers::NavigationChannel;
    use crate::units::{HostFn, UnitHandle};
    use crate::LoadError;
    use std::sync::Mutex;

    fn optimizer(calls: Arc<Mutex<Vec<String>>>) -> Arc<BundleOptimizer> {
        let host = HostFn::arc(move |location: String| {
            let calls = Arc::clone(&calls);
            async move {
                calls.lock().unwrap().push(location.clone());
                Ok::<_, LoadError>(UnitHandle::new(location))
            }
        });
        let registry = ModuleRegistry::builder()
            .module("mbti", "/js/mbti-test.js")
            .module("fortune", "/js/fortune.js")
            .module("zodiac", "/js/zodiac.js")
            .page("/tests/mbti/", ["mbti", "missing"])
            .page("/fortune/zodiac/", ["fortune", "zodiac"])
            .build();
        BundleOptimizer::builder(Config::default(), host)
            .with_registry(registry)
            .build()
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

    #[tokio::test]
    async fn test_detect_skips_unregistered_names() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let opt = optimizer(Arc::clone(&calls));

        let requested = opt.page_detector().detect("/tests/mbti/");

        assert_eq!(requested, ["mbti"]);
        wait_until(|| opt.is_loaded("mbti")).await;
        assert_eq!(opt.metrics().errors, 0);
        assert!(opt.page_detector().detect("/about/").is_empty());
    }

    #[tokio::test]
    async fn test_follows_navigation_after_settle() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let opt = optimizer(Arc::clone(&calls));
        let nav = Arc::new(NavigationChannel::new("/tests/mbti/"));
        let mut events = opt.subscribe();
        let token = CancellationToken::new();

        let handle = opt.page_detector().spawn(nav.clone(), token.clone());
        wait_until(|| opt.is_loaded("mbti")).await;

        nav.navigate("/fortune/zodiac/");
        wait_until(|| opt.is_loaded("fortune") && opt.is_loaded("zodiac")).await;

        let mut navigated = false;
        while let Ok(ev) = events.try_recv() {
            if ev.kind == EventKind::NavigationDetected {
                assert_eq!(ev.location.as_deref(), Some("/fortune/zodiac/"));
                navigated = true;
            }
        }
        assert!(navigated);

        token.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_navigation_waits_for_settle_delay() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let opt = optimizer(Arc::clone(&calls));
        let nav = Arc::new(NavigationChannel::new("/"));
        let token = CancellationToken::new();
        let _handle = opt.page_detector().spawn(nav.clone(), token.clone());
        tokio::task::yield_now().await;

        nav.navigate("/tests/mbti/");
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(calls.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(*calls.lock().unwrap(), ["/js/mbti-test.js"]);
        token.cancel();
    }
}
