/*
    meshkv-core - Masterless replicated key-value store

    Every node accepts writes, replicates them to peers, and reconciles
    concurrent updates with vector clocks. Layers:
    - store: versioned data model, conflict resolution, replication log
    - index: value, inverted, and embedding search structures
    - node: TCP command protocol, peer replication, anti-entropy
    - config / logging / metrics: ambient plumbing
*/

pub mod config;
pub mod index;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod store;

// Re-export the commonly used types
pub use config::{NodeConfig, PeerConfig, ReplicationConfig};
pub use index::SearchMode;
pub use node::{NodeServer, Response};
pub use store::{Causality, KvStore, SetOutcome, StoreConfig, VectorClock, VersionedValue};
