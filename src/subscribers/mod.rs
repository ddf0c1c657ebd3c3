//! # Event subscribers.
//!
//! [`Subscribe`] is the extension point for reacting to scheduler events
//! (analytics, logging, debugging overlays) without touching the load path.
//!
//! ## Architecture
//! ```text
//! Scheduler ── publish(Event) ──► Bus ──► optimizer listener ──► SubscriberSet::emit(&Event)
//!                                                                  ┌─────────┼─────────┐
//!                                                                  ▼         ▼         ▼
//!                                                              [queue 1] [queue 2] [queue N]
//!                                                                  │         │         │
//!                                                              on_event  on_event  on_event
//! ```
//!
//! Enable the `logging` feature for the built-in [`LogWriter`].

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
