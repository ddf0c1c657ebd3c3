//! Host adapter for fetching and executing code units.
//!
//! - [`UnitHost`] the seam to the host environment (script injection in a browser,
//!   dynamic import, a plugin loader…).
//! - [`HostFn`] closure-backed host, handy for tests and simple adapters.
//! - [`UnitHandle`] what a successful load yields.

mod handle;
mod host;
mod host_fn;

pub use handle::UnitHandle;
pub use host::{HostRef, UnitHost};
pub use host_fn::HostFn;
