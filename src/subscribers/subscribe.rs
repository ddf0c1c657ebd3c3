//! # Core subscriber trait
//!
//! Each subscriber is driven by its own worker fed through a bounded queue owned
//! by the [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Contract
//! - Implementations may be slow; they never block the scheduler nor each other.
//! - On queue overflow the event is **dropped** for that subscriber (warn).
//!
//! ## Example
//! ```rust
//! use bundlevisor::{Event, EventKind, Subscribe};
//!
//! struct Analytics;
//!
//! #[async_trait::async_trait]
//! impl Subscribe for Analytics {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::LoadSucceeded {
//!             // track "module_loaded" with ev.module / ev.elapsed_ms / ev.bytes
//!         }
//!     }
//!     fn name(&self) -> &'static str { "analytics" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        256
    }
}
