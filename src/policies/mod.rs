//! Admission and retry policies.
//!
//! This module groups the knobs that control **which** pending load is admitted
//! first and **how long** to wait before re-trying a failed unit.
//!
//! ## Contents
//! - [`Priority`]      admission tier (critical / high / normal / low)
//! - [`BackoffPolicy`] how retry delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization of retry delays
//!
//! ## Quick wiring
//! ```text
//! request(name, location, Priority)
//!      └─► core::scheduler uses:
//!           - priority to bypass the cap (critical) or order the backlog
//!           - backoff.next(retry) between attempts when Config::retry_attempts > 0
//! ```
//!
//! ## Defaults
//! - `Priority::Normal`.
//! - `BackoffPolicy::default()` → first=250ms, factor=2.0, max=5s, jitter=None.

mod backoff;
mod jitter;
mod priority;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use priority::Priority;
