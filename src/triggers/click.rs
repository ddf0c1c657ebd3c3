//! # Click-to-load interception.
//!
//! The host calls [`ClickInterceptor::on_click`] synchronously from its click handler,
//! passing the module marker of the clicked element (if any) and a closure that replays
//! the click.
//!
//! ```text
//! on_click(marker, replay)
//!   ├─ no marker / module loaded ──► PassThrough (host keeps the default action)
//!   └─ otherwise ──► Deferred (host cancels the default action)
//!                      └─ task: preload(module, high)
//!                               ├─ Ok  ──► replay()
//!                               └─ Err ──► error log, no replay
//! ```

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{core::BundleOptimizer, policies::Priority};

/// What the host should do with the original click.
#[derive(Debug)]
pub enum ClickDecision {
    /// Let the default action run.
    PassThrough,
    /// Default action must be cancelled; the handle resolves to `true` once replayed.
    Deferred(JoinHandle<bool>),
}

impl ClickDecision {
    pub fn is_deferred(&self) -> bool {
        matches!(self, ClickDecision::Deferred(_))
    }
}

/// Defers clicks on elements whose module is not loaded yet.
pub struct ClickInterceptor {
    optimizer: Arc<BundleOptimizer>,
}

impl ClickInterceptor {
    pub fn new(optimizer: Arc<BundleOptimizer>) -> Self {
        Self { optimizer }
    }

    pub fn on_click<F>(&self, module: Option<&str>, replay: F) -> ClickDecision
    where
        F: FnOnce() + Send + 'static,
    {
        let Some(module) = module.filter(|m| !m.is_empty()) else {
            return ClickDecision::PassThrough;
        };
        if self.optimizer.is_loaded(module) {
            return ClickDecision::PassThrough;
        }

        let optimizer = Arc::clone(&self.optimizer);
        let module = module.to_string();
        ClickDecision::Deferred(tokio::spawn(async move {
            match optimizer.preload_module(&module, Priority::High).await {
                Ok(_) => {
                    replay();
                    true
                }
                Err(e) => {
                    tracing::error!(module = %module, label = e.as_label(), err = %e, "click target module failed to load");
                    false
                }
            }
        }))
    }
}
