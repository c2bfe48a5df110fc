/*
    kv_store.rs - Versioned key-value store with conflict resolution

    The single authoritative in-memory mapping from key to version
    history. Every mutation also maintains the three secondary indexes
    and appends to the replication log.

    The struct carries no interior locking; the node layer wraps it in
    one Arc<Mutex<_>> and every public operation runs under that lock
    for its full duration.
*/

use crate::index::{EmbeddingIndex, InvertedIndex, SearchMode, ValueIndex, DEFAULT_DIMENSIONS};
use crate::store::errors::{StoreError, StoreResult};
use crate::store::replication_log::{LogOperation, ReplicationLog, ReplicationLogEntry};
use crate::store::vector_clock::{Causality, NodeId, VectorClock};
use crate::store::versioned::VersionedValue;
use metrics::counter;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Tuning knobs for a store instance
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum replication-log entries retained
    pub replication_log_capacity: usize,

    /// Embedding vector dimension count
    pub embedding_dimensions: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            replication_log_capacity: 1024,
            embedding_dimensions: DEFAULT_DIMENSIONS,
        }
    }
}

/// Result of applying a SET
#[derive(Debug, Clone, PartialEq)]
pub enum SetOutcome {
    /// The write was stored; carries the surviving sibling count and
    /// the clock the write was stamped with
    Stored { versions: usize, clock: VectorClock },

    /// The write was causally older than stored state and ignored
    Outdated,
}

/// Versioned key-value store with secondary indexes and a replication log
#[derive(Debug)]
pub struct KvStore {
    node_id: NodeId,
    versions: HashMap<String, Vec<VersionedValue>>,
    indexes: HashMap<String, ValueIndex>,
    inverted: InvertedIndex,
    embeddings: EmbeddingIndex,
    log: ReplicationLog,
}

impl KvStore {
    pub fn new(node_id: &str, config: StoreConfig) -> Self {
        KvStore {
            node_id: node_id.to_string(),
            versions: HashMap::new(),
            indexes: HashMap::new(),
            inverted: InvertedIndex::new(),
            embeddings: EmbeddingIndex::new(config.embedding_dimensions),
            log: ReplicationLog::new(config.replication_log_capacity),
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Number of keys currently stored
    pub fn key_count(&self) -> usize {
        self.versions.len()
    }

    /// Store a value under a key, resolving conflicts against existing
    /// siblings by vector clock.
    ///
    /// The local node's counter is incremented on every application,
    /// including replicated writes, so the clock tracks how many times
    /// this node has processed writes to the causal lineage rather
    /// than only the originating node's edit count.
    ///
    /// Only the new value is indexed; a concurrent sibling that is
    /// never re-submitted stays retrievable through `get` but is not
    /// guaranteed to remain searchable.
    pub fn set(&mut self, key: &str, value: Value, clock: Option<VectorClock>) -> SetOutcome {
        let mut clock = clock.unwrap_or_default();
        clock.increment(&self.node_id);

        if let Some(existing) = self.versions.get(key) {
            let outdated = existing
                .iter()
                .any(|sibling| clock.compare(&sibling.vector_clock) == Causality::Before);
            if outdated {
                debug!(key, "ignoring causally outdated write");
                counter!("store.operations.outdated").increment(1);
                return SetOutcome::Outdated;
            }
        }

        let mut survivors = Vec::new();
        if let Some(existing) = self.versions.remove(key) {
            for sibling in existing {
                match clock.compare(&sibling.vector_clock) {
                    Causality::After => {
                        // Dominated sibling: drop it and its index entries
                        for index in self.indexes.values_mut() {
                            index.remove(key, &sibling.value);
                        }
                        self.inverted.remove(key);
                        self.embeddings.remove(key);
                    }
                    Causality::Concurrent => survivors.push(sibling),
                    // Before was ruled out above; an equal-clock sibling
                    // is replaced outright by the incoming version
                    Causality::Before | Causality::Equal => {}
                }
            }
        }

        survivors.push(VersionedValue::new(value.clone(), clock.clone()));
        let sibling_count = survivors.len();
        self.versions.insert(key.to_string(), survivors);

        for index in self.indexes.values_mut() {
            index.add(key, &value);
        }
        self.inverted.add(key, &value);
        self.embeddings.add(key, &value);

        self.log
            .append(ReplicationLogEntry::set(key, value, clock.clone()));
        counter!("store.operations.set").increment(1);

        SetOutcome::Stored {
            versions: sibling_count,
            clock,
        }
    }

    /// All current siblings of a key (empty when absent)
    pub fn get(&self, key: &str) -> &[VersionedValue] {
        self.versions.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Last-write-wins read view: the value of the sibling with the
    /// greatest wall-clock timestamp, not the causally dominant one.
    /// Timestamp ties keep the first-stored sibling.
    pub fn get_latest(&self, key: &str) -> Option<&Value> {
        let mut latest: Option<&VersionedValue> = None;
        for version in self.get(key) {
            match latest {
                Some(current) if version.timestamp <= current.timestamp => {}
                _ => latest = Some(version),
            }
        }
        latest.map(|v| &v.value)
    }

    /// Remove a key and all its siblings unconditionally.
    ///
    /// No tombstone is retained, so an anti-entropy replay of a
    /// pre-delete SET log entry can resurrect the key. Returns whether
    /// the key existed.
    pub fn delete(&mut self, key: &str) -> bool {
        let Some(existing) = self.versions.remove(key) else {
            return false;
        };

        for sibling in &existing {
            for index in self.indexes.values_mut() {
                index.remove(key, &sibling.value);
            }
        }
        self.inverted.remove(key);
        self.embeddings.remove(key);

        self.log.append(ReplicationLogEntry::delete(key));
        counter!("store.operations.delete").increment(1);
        true
    }

    /// Register a value index over `field_path` and backfill it from
    /// each key's most recently stored sibling. Creating an index
    /// under an existing name is a no-op.
    pub fn create_index(&mut self, name: &str, field_path: &str) {
        if self.indexes.contains_key(name) {
            return;
        }

        let mut index = ValueIndex::new(field_path);
        for (key, versions) in &self.versions {
            if let Some(latest) = versions.last() {
                index.add(key, &latest.value);
            }
        }
        self.indexes.insert(name.to_string(), index);
    }

    /// Exact lookup through a named value index
    pub fn search(&self, index_name: &str, value: &Value) -> StoreResult<HashSet<String>> {
        let index = self
            .indexes
            .get(index_name)
            .ok_or_else(|| StoreError::IndexNotFound(index_name.to_string()))?;
        Ok(index.search(value))
    }

    /// Numeric range lookup through a named value index
    pub fn range_search(&self, index_name: &str, min: f64, max: f64) -> StoreResult<HashSet<String>> {
        let index = self
            .indexes
            .get(index_name)
            .ok_or_else(|| StoreError::IndexNotFound(index_name.to_string()))?;
        Ok(index.range_search(min, max))
    }

    /// Full-text lookup with OR or AND semantics
    pub fn fulltext_search(&self, query: &str, mode: SearchMode) -> HashSet<String> {
        match mode {
            SearchMode::Or => self.inverted.search(query),
            SearchMode::And => self.inverted.search_and(query),
        }
    }

    /// Top-K similarity lookup through the embedding index
    pub fn semantic_search(&mut self, query: &str, top_k: usize) -> Vec<(String, f32)> {
        self.embeddings.search(query, top_k)
    }

    /// The last `n` replication-log entries in append order
    pub fn recent_log(&self, n: usize) -> Vec<ReplicationLogEntry> {
        self.log.recent(n)
    }

    /// Replay a batch of foreign log entries in order, applying each
    /// through the normal set/delete path
    pub fn merge_replication_log(&mut self, entries: Vec<ReplicationLogEntry>) {
        for entry in entries {
            match entry.operation {
                LogOperation::Set => {
                    if let Some(value) = entry.value {
                        self.set(&entry.key, value, entry.vector_clock);
                    }
                }
                LogOperation::Delete => {
                    self.delete(&entry.key);
                }
            }
        }
    }
}
