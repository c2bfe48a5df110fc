/*
    store - Versioned key-value data model

    Owns the per-key version history, vector-clock conflict resolution,
    the replication log, and fan-out into the secondary indexes.
*/

pub mod errors;
pub mod kv_store;
pub mod replication_log;
pub mod vector_clock;
pub mod versioned;

#[cfg(test)]
mod tests;

pub use errors::{StoreError, StoreResult};
pub use kv_store::{KvStore, SetOutcome, StoreConfig};
pub use replication_log::{LogOperation, ReplicationLog, ReplicationLogEntry};
pub use vector_clock::{Causality, NodeId, VectorClock};
pub use versioned::VersionedValue;
