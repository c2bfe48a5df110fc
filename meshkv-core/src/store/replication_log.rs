/*
    replication_log.rs - Bounded recent-history operation log

    Every accepted SET and DELETE is appended here in arrival order.
    The log is the source for anti-entropy: each sync round re-sends
    the most recent entries to every peer. It is a bounded in-memory
    ring, not a durability mechanism.
*/

use crate::store::vector_clock::VectorClock;
use crate::store::versioned::now_millis;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

/// Operation kind recorded in the log and carried by REPLICATE frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogOperation {
    Set,
    Delete,
}

/// A single replicated operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationLogEntry {
    pub operation: LogOperation,
    pub key: String,

    /// Present for SET entries only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    /// Present for SET entries only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_clock: Option<VectorClock>,

    /// Wall-clock time the operation was applied locally (milliseconds)
    pub timestamp: u64,
}

impl ReplicationLogEntry {
    /// Build a SET entry stamped with the current wall clock
    pub fn set(key: &str, value: Value, vector_clock: VectorClock) -> Self {
        ReplicationLogEntry {
            operation: LogOperation::Set,
            key: key.to_string(),
            value: Some(value),
            vector_clock: Some(vector_clock),
            timestamp: now_millis(),
        }
    }

    /// Build a DELETE entry stamped with the current wall clock
    pub fn delete(key: &str) -> Self {
        ReplicationLogEntry {
            operation: LogOperation::Delete,
            key: key.to_string(),
            value: None,
            vector_clock: None,
            timestamp: now_millis(),
        }
    }
}

/// Bounded in-memory log of recent operations
#[derive(Debug)]
pub struct ReplicationLog {
    entries: VecDeque<ReplicationLogEntry>,
    capacity: usize,
}

impl ReplicationLog {
    /// Create a log that retains at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        ReplicationLog {
            entries: VecDeque::with_capacity(capacity.min(256)),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest when at capacity
    pub fn append(&mut self, entry: ReplicationLogEntry) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// The last `n` entries in append order
    pub fn recent(&self, n: usize) -> Vec<ReplicationLogEntry> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
