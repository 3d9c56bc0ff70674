//! Overflow policies for the delivery queue
//!
//! When the bounded queue is full at enqueue time, the policy decides
//! whether the producer waits or which record is lost.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Policy for handling queue overflow in async logging
///
/// # Example
///
/// ```
/// use chika_log::{LoggerConfig, OverflowPolicy};
///
/// let config = LoggerConfig::default().with_overflow_policy(OverflowPolicy::Block);
/// assert_eq!(config.overflow_policy, OverflowPolicy::Block);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Block until space is available
    ///
    /// Warning: this applies backpressure to the application.
    Block,

    /// Drop the incoming record; queued records are untouched
    DropNewest,

    /// Evict the oldest queued record to make room for the incoming one
    ///
    /// This is the default: the most recent records are usually the most
    /// useful when diagnosing a problem.
    DropOldest,
}

impl Default for OverflowPolicy {
    fn default() -> Self {
        OverflowPolicy::DropOldest
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverflowPolicy::Block => write!(f, "Block"),
            OverflowPolicy::DropNewest => write!(f, "DropNewest"),
            OverflowPolicy::DropOldest => write!(f, "DropOldest"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overflow_policy_default() {
        assert_eq!(OverflowPolicy::default(), OverflowPolicy::DropOldest);
    }

    #[test]
    fn test_overflow_policy_display() {
        assert_eq!(OverflowPolicy::DropNewest.to_string(), "DropNewest");
        assert_eq!(OverflowPolicy::DropOldest.to_string(), "DropOldest");
        assert_eq!(OverflowPolicy::Block.to_string(), "Block");
    }
}
