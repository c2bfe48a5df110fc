//! Metric descriptions for store and replication instrumentation
//!
//! Counters are incremented at their call sites with
//! `counter!(name).increment(1)`; this module registers descriptions
//! once at startup. No exporter is wired in here.

use metrics::describe_counter;

/// Register descriptions for all metrics the node emits
pub fn init_metrics() {
    describe_counter!("store.operations.set", "SET operations applied to the store");
    describe_counter!(
        "store.operations.delete",
        "DELETE operations applied to the store"
    );
    describe_counter!(
        "store.operations.outdated",
        "SET operations ignored as causally stale"
    );

    describe_counter!("replication.frames.sent", "Control frames delivered to peers");
    describe_counter!(
        "replication.frames.failed",
        "Control frames dropped after send failure or timeout"
    );
    describe_counter!("replication.sync.rounds", "Anti-entropy rounds that sent entries");
}
