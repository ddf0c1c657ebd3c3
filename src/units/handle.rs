use std::sync::Arc;

/// Opaque reference to a unit that is active in the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitHandle {
    location: Arc<str>,
    bytes: Option<u64>,
}

impl UnitHandle {
    pub fn new(location: impl Into<Arc<str>>) -> Self {
        Self {
            location: location.into(),
            bytes: None,
        }
    }

    /// Records the transferred size reported by the host.
    pub fn with_bytes(mut self, bytes: u64) -> Self {
        self.bytes = Some(bytes);
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Size reported by the host, if any.
    pub fn bytes(&self) -> Option<u64> {
        self.bytes
    }
}
