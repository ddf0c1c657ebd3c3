//! # Viewport-proximity loading.
//!
//! Sections declare the module they need with [`ViewportLoader::observe`]. On every
//! layout report the host passes the vertical extent of each observed section, relative
//! to the top of the viewport. A section within `viewport_margin_px` of the viewport
//! fires once: it is unobserved and its module is requested at `low` priority unless
//! already loaded.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::{core::BundleOptimizer, policies::Priority};

/// Vertical extent of a section in CSS pixels, relative to the viewport top.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SectionRect {
    pub top: f64,
    pub bottom: f64,
}

impl SectionRect {
    pub fn new(top: f64, bottom: f64) -> Self {
        Self { top, bottom }
    }

    /// True if the rect intersects the viewport grown by `margin` on both edges.
    pub fn is_near(&self, viewport_height: f64, margin: f64) -> bool {
        self.bottom >= -margin && self.top <= viewport_height + margin
    }
}

/// Requests section modules as they approach the viewport.
pub struct ViewportLoader {
    optimizer: Arc<BundleOptimizer>,
    margin: f64,
    /// section id → module name, for sections that have not fired yet
    observed: Mutex<HashMap<String, String>>,
}

impl ViewportLoader {
    pub fn new(optimizer: Arc<BundleOptimizer>) -> Self {
        let margin = f64::from(optimizer.config().viewport_margin_px);
        Self {
            optimizer,
            margin,
            observed: Mutex::new(HashMap::new()),
        }
    }

    /// Starts watching `section_id`, which needs `module`.
    pub fn observe(&self, section_id: impl Into<String>, module: impl Into<String>) {
        self.observed().insert(section_id.into(), module.into());
    }

    /// Number of sections that have not fired yet.
    pub fn pending(&self) -> usize {
        self.observed().len()
    }

    /// Handles a layout report and returns the modules requested.
    pub fn on_layout<'a, I>(&self, viewport_height: f64, sections: I) -> Vec<String>
    where
        I: IntoIterator<Item = (&'a str, SectionRect)>,
    {
        let fired: Vec<String> = {
            let mut observed = self.observed();
            sections
                .into_iter()
                .filter(|(_, rect)| rect.is_near(viewport_height, self.margin))
                .filter_map(|(id, _)| observed.remove(id))
                .collect()
        };

        let mut requested = Vec::new();
        for module in fired {
            if self.optimizer.is_loaded(&module) || requested.contains(&module) {
                continue;
            }
            let optimizer = Arc::clone(&self.optimizer);
            let name = module.clone();
            tokio::spawn(async move {
                let _ = optimizer.preload_module(&name, Priority::Low).await;
            });
            requested.push(module);
        }
        requested
    }

    fn observed(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.observed.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
