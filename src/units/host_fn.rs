//! # Function-backed host (`HostFn`)
//!
//! [`HostFn`] wraps a closure `F: Fn(String) -> Fut`, producing a fresh future per
//! injection. It never reports units as already active.
//!
//! ## Example
//! ```rust
//! use bundlevisor::{HostFn, HostRef, LoadError, UnitHandle};
//!
//! let host: HostRef = HostFn::arc(|location: String| async move {
//!     Ok::<_, LoadError>(UnitHandle::new(location))
//! });
//! assert!(host.find_active("/js/tarot.js").is_none());
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::LoadError;
use crate::units::{UnitHandle, UnitHost};

/// Closure-backed host adapter.
pub struct HostFn<F> {
    f: F,
}

impl<F> HostFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the host and returns it as a shared handle.
    pub fn arc(f: F) -> Arc<Self> {
        Arc::new(Self::new(f))
    }
}

#[async_trait]
impl<F, Fut> UnitHost for HostFn<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<UnitHandle, LoadError>> + Send + 'static,
{
    fn find_active(&self, _location: &str) -> Option<UnitHandle> {
        None
    }

    async fn inject(&self, location: &str) -> Result<UnitHandle, LoadError> {
        (self.f)(location.to_string()).await
    }
}
