//! Error types produced by the loading scheduler.
//!
//! [`LoadError`] covers every way a module request can fail:
//!
//! - [`LoadError::UnknownModule`]: the name is not in the registry (absorbed by the facade);
//! - [`LoadError::Timeout`]: the host did not finish the unit within the deadline;
//! - [`LoadError::Failed`]: transport or execution failure reported by the host;
//! - [`LoadError::Destroyed`]: the scheduler was torn down while the request waited.
//!
//! The type is `Clone` because one in-flight load hands the same result to every waiter.
//! Helper methods (`as_label`, `as_message`) are meant for logs and events.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced while resolving or loading a module.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Module name is not present in the registry.
    #[error("unknown module '{name}'")]
    UnknownModule {
        /// The requested logical name.
        name: String,
    },

    /// Unit did not complete within the configured deadline.
    #[error("module load timeout: {location} (after {timeout:?})")]
    Timeout {
        /// Location that was being loaded.
        location: String,
        /// The deadline that was exceeded.
        timeout: Duration,
    },

    /// Host reported a transport or execution failure.
    #[error("module load failed: {location}: {error}")]
    Failed {
        /// Location that was being loaded.
        location: String,
        /// The underlying error message.
        error: String,
    },

    /// Scheduler state was dropped before the request was admitted.
    #[error("scheduler destroyed before the load was admitted")]
    Destroyed,
}

impl LoadError {
    /// Shorthand for a [`LoadError::Failed`] raised by a host adapter.
    pub fn failed(location: impl Into<String>, error: impl Into<String>) -> Self {
        LoadError::Failed {
            location: location.into(),
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/events.
    ///
    /// # Example
    /// ```
    /// use bundlevisor::LoadError;
    /// use std::time::Duration;
    ///
    /// let err = LoadError::Timeout { location: "/js/tarot.js".into(), timeout: Duration::from_secs(10) };
    /// assert_eq!(err.as_label(), "load_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            LoadError::UnknownModule { .. } => "unknown_module",
            LoadError::Timeout { .. } => "load_timeout",
            LoadError::Failed { .. } => "load_failed",
            LoadError::Destroyed => "scheduler_destroyed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            LoadError::UnknownModule { name } => format!("unknown module: {name}"),
            LoadError::Timeout { location, timeout } => {
                format!("timeout: {location} after {timeout:?}")
            }
            LoadError::Failed { location, error } => format!("error: {location}: {error}"),
            LoadError::Destroyed => "scheduler destroyed".to_string(),
        }
    }

    /// Indicates whether another attempt may succeed.
    ///
    /// Returns `true` for [`LoadError::Timeout`] and [`LoadError::Failed`],
    /// `false` otherwise.
    ///
    /// # Example
    /// ```
    /// use bundlevisor::LoadError;
    ///
    /// assert!(LoadError::failed("/js/mbti-test.js", "404").is_retryable());
    /// assert!(!LoadError::UnknownModule { name: "nope".into() }.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, LoadError::Timeout { .. } | LoadError::Failed { .. })
    }
}

/// # Errors produced while building a [`ModuleRegistry`](crate::ModuleRegistry) from a manifest.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Manifest is not valid JSON or does not match the expected shape.
    #[error("invalid registry manifest: {0}")]
    Parse(#[from] serde_json::Error),

    /// The same module name is declared twice.
    #[error("module '{name}' declared more than once")]
    DuplicateModule {
        /// The repeated name.
        name: String,
    },
}

impl RegistryError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RegistryError::Parse(_) => "registry_parse",
            RegistryError::DuplicateModule { .. } => "registry_duplicate_module",
        }
    }
}
