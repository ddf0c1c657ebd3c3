//! # Event bus for broadcasting scheduler events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that lets the scheduler,
//! the loader and the trigger sources publish without blocking.
//!
//! ## Architecture
//! ```text
//! Publishers (many):                  Receivers:
//!   Scheduler ──┐
//!   Loader    ──┼──────► Bus ───────┬──► DependencyExpander (LoadSucceeded → low-priority requests)
//!   Optimizer ──┤  (broadcast chan) └──► fan-out listener ──► SubscriberSet
//!   Triggers  ──┘
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks or fails.
//! - **Bounded capacity**: one ring buffer shared by all receivers.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip `n` oldest items.
//! - **No persistence**: events sent with no receiver attached are dropped.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for scheduler events.
///
/// Cheap to clone; every clone publishes into the same channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    ///
    /// If there are no receivers the event is dropped.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of attached receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_receiver_sees_later_events_only() {
        let bus = Bus::new(8);
        bus.publish(Event::new(EventKind::CacheCleared));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::LoadQueued).with_module("tarot"));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::LoadQueued);
        assert_eq!(ev.module.as_deref(), Some("tarot"));
    }

    #[test]
    fn test_publish_without_receivers_is_silent() {
        let bus = Bus::new(0);
        assert_eq!(bus.receiver_count(), 0);
        bus.publish(Event::new(EventKind::Destroyed));
    }
}
