//! # Link hover pre-fetch.
//!
//! The first hover over a same-origin link (`/`-prefixed href) requests the modules of
//! the target page at `low` priority. Each href fires at most once, whether or not the
//! page is known.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::{core::BundleOptimizer, policies::Priority};

/// One-shot hover trigger per link target.
pub struct HoverPrefetch {
    optimizer: Arc<BundleOptimizer>,
    seen: Mutex<HashSet<String>>,
}

impl HoverPrefetch {
    pub fn new(optimizer: Arc<BundleOptimizer>) -> Self {
        Self {
            optimizer,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Handles a hover over a link to `href` and returns the module names requested.
    pub fn on_hover(&self, href: &str) -> Vec<String> {
        if !href.starts_with('/') {
            return Vec::new();
        }
        let first = self
            .seen
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(href.to_string());
        if !first {
            return Vec::new();
        }

        let names = self.optimizer.registry().required_modules(href).to_vec();
        for name in &names {
            let optimizer = Arc::clone(&self.optimizer);
            let name = name.clone();
            tokio::spawn(async move {
                let _ = optimizer.preload_module(&name, Priority::Low).await;
            });
        }
        names
    }
}
