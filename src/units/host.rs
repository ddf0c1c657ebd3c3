//! # The host seam.
//!
//! A [`UnitHost`] knows how to bring a unit at some location into the running
//! page and how to tell whether it is already there. It does **not** apply
//! timeouts or retries; `core::loader` wraps every call.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LoadError;
use crate::units::UnitHandle;

/// Shared handle to a host adapter.
pub type HostRef = Arc<dyn UnitHost>;

/// # Environment that fetches and executes code units.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use bundlevisor::{LoadError, UnitHandle, UnitHost};
///
/// struct Injector;
///
/// #[async_trait]
/// impl UnitHost for Injector {
///     fn find_active(&self, _location: &str) -> Option<UnitHandle> {
///         None
///     }
///
///     async fn inject(&self, location: &str) -> Result<UnitHandle, LoadError> {
///         // append a script element and wait for onload / onerror...
///         Ok(UnitHandle::new(location))
///     }
/// }
/// ```
#[async_trait]
pub trait UnitHost: Send + Sync + 'static {
    /// Returns a handle if a unit for `location` is already active in the host.
    ///
    /// Called before every injection; must be cheap and side-effect free.
    fn find_active(&self, location: &str) -> Option<UnitHandle>;

    /// Fetches and executes the unit, resolving once the host reports completion.
    ///
    /// Transport or execution failures should be reported as [`LoadError::Failed`].
    async fn inject(&self, location: &str) -> Result<UnitHandle, LoadError>;
}
