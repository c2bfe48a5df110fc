/*
    versioned.rs - Versioned values for multi-version storage

    A VersionedValue pairs a document value with the vector clock that
    stamped it and the wall-clock time at which this node stored it.
    A key's entry in the store is a list of these, one per surviving
    concurrent sibling.
*/

use crate::store::vector_clock::VectorClock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("System clock is before UNIX epoch")
        .as_millis() as u64
}

/// A value stamped with its causal version and arrival time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedValue {
    /// The stored document value
    pub value: Value,

    /// Causal version of this write
    pub vector_clock: VectorClock,

    /// Wall-clock arrival time in milliseconds, used for the
    /// last-write-wins read view
    pub timestamp: u64,
}

impl VersionedValue {
    /// Create a versioned value stamped with the current wall clock
    pub fn new(value: Value, vector_clock: VectorClock) -> Self {
        VersionedValue {
            value,
            vector_clock,
            timestamp: now_millis(),
        }
    }

    /// Create a versioned value with an explicit timestamp
    pub fn with_timestamp(value: Value, vector_clock: VectorClock, timestamp: u64) -> Self {
        VersionedValue {
            value,
            vector_clock,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_new_stamps_current_time() {
        let before = now_millis();
        let versioned = VersionedValue::new(json!({"a": 1}), VectorClock::new());
        let after = now_millis();

        assert!(versioned.timestamp >= before);
        assert!(versioned.timestamp <= after);
    }

    #[test]
    fn test_with_timestamp() {
        let versioned = VersionedValue::with_timestamp(json!(42), VectorClock::new(), 1000);
        assert_eq!(versioned.timestamp, 1000);
        assert_eq!(versioned.value, json!(42));
    }
}
