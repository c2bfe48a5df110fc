/*
    vector_clock.rs - Vector clock implementation for causal ordering

    A vector clock tracks logical time across the nodes of the cluster.
    Each write is stamped with a clock; comparing two clocks tells us
    whether one write causally precedes the other or whether the two
    happened concurrently on different nodes.

    Used by the store to decide whether an incoming version supersedes,
    is superseded by, or coexists with a stored one.
*/

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Node identifier for vector clock entries
pub type NodeId = String;

/// Outcome of comparing two vector clocks under the causal partial order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Causality {
    /// Every counter <= the other's and at least one strictly less
    Before,
    /// Every counter >= the other's and at least one strictly greater
    After,
    /// Neither clock dominates the other
    Concurrent,
    /// All counters match
    Equal,
}

/// Vector clock for tracking causal order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorClock {
    /// Map from node ID to logical timestamp
    clocks: HashMap<NodeId, u64>,
}

impl VectorClock {
    /// Create a new empty vector clock
    pub fn new() -> Self {
        VectorClock {
            clocks: HashMap::new(),
        }
    }

    /// Increment the counter for a given node
    pub fn increment(&mut self, node_id: &str) {
        let counter = self.clocks.entry(node_id.to_string()).or_insert(0);
        *counter += 1;
    }

    /// Get the counter for a node (0 if the node is not tracked)
    pub fn get(&self, node_id: &str) -> u64 {
        self.clocks.get(node_id).copied().unwrap_or(0)
    }

    /// Set the counter for a node
    pub fn set(&mut self, node_id: &str, counter: u64) {
        self.clocks.insert(node_id.to_string(), counter);
    }

    /// Merge another clock into this one (pointwise maximum)
    pub fn merge(&mut self, other: &VectorClock) {
        for (node_id, &counter) in &other.clocks {
            let current = self.clocks.entry(node_id.clone()).or_insert(0);
            *current = (*current).max(counter);
        }
    }

    /// Compare this clock with another under the causal partial order.
    ///
    /// Scans the union of tracked nodes; a node absent from a clock
    /// counts as 0 there.
    pub fn compare(&self, other: &VectorClock) -> Causality {
        let mut before = false;
        let mut after = false;

        for node_id in self.clocks.keys().chain(other.clocks.keys()) {
            let ours = self.get(node_id);
            let theirs = other.get(node_id);
            if ours < theirs {
                before = true;
            } else if ours > theirs {
                after = true;
            }
        }

        match (before, after) {
            (false, false) => Causality::Equal,
            (true, false) => Causality::Before,
            (false, true) => Causality::After,
            (true, true) => Causality::Concurrent,
        }
    }

    /// Check if the clock tracks no nodes
    pub fn is_empty(&self) -> bool {
        self.clocks.is_empty()
    }

    /// Number of nodes tracked
    pub fn len(&self) -> usize {
        self.clocks.len()
    }
}
