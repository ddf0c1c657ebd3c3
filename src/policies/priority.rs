//! # Admission priority for module requests.
//!
//! [`Priority`] is an ordinal tier; a higher tier always drains from the backlog first,
//! and requests inside one tier are admitted in submission order.
//!
//! ```text
//! Critical (3)  → never queued, may exceed max_concurrent
//! High     (2)  → user is waiting (click interception)
//! Normal   (1)  → modules the current page needs
//! Low      (0)  → speculative (hover, viewport, dependents)
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// Admission tier of a module request.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Speculative work.
    Low = 0,
    /// Default tier.
    #[default]
    Normal = 1,
    /// A user interaction is blocked on the module.
    High = 2,
    /// Required on every page; bypasses the concurrency cap.
    Critical = 3,
}

impl Priority {
    /// Numeric rank (`critical=3 … low=0`).
    #[inline]
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// True if the request must be admitted regardless of the cap.
    #[inline]
    pub fn bypasses_cap(self) -> bool {
        matches!(self, Priority::Critical)
    }

    /// Stable lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiers_are_ordered() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
        assert_eq!(Priority::Critical.rank(), 3);
        assert_eq!(Priority::Low.rank(), 0);
    }

    #[test]
    fn test_only_critical_bypasses() {
        assert!(Priority::Critical.bypasses_cap());
        assert!(!Priority::High.bypasses_cap());
        assert_eq!(Priority::default(), Priority::Normal);
    }

    #[test]
    fn test_serde_lowercase() {
        let p: Priority = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(p, Priority::High);
        assert_eq!(serde_json::to_string(&Priority::Low).unwrap(), "\"low\"");
    }
}
