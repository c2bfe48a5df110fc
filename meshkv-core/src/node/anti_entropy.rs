/*
    anti_entropy.rs - Periodic peer resynchronization

    Runs on a fixed interval, independent of client traffic. Each round
    takes the most recent replication-log entries and pushes them to
    every peer in one SYNC frame, regardless of what each peer is
    actually missing. Coarse and stateless: no digests, no deltas, no
    per-peer bookkeeping.
*/

use crate::node::protocol::ControlFrame;
use crate::node::replicator::Replicator;
use crate::store::KvStore;
use metrics::counter;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Background task that re-sends recent history to peers
pub struct AntiEntropyTask {
    store: Arc<Mutex<KvStore>>,
    replicator: Replicator,
    interval: Duration,
    batch_size: usize,
    shutdown: watch::Receiver<bool>,
}

impl AntiEntropyTask {
    pub fn new(
        store: Arc<Mutex<KvStore>>,
        replicator: Replicator,
        interval: Duration,
        batch_size: usize,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        AntiEntropyTask {
            store,
            replicator,
            interval,
            batch_size,
            shutdown,
        }
    }

    /// Spawn the sync loop onto the runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let AntiEntropyTask {
            store,
            replicator,
            interval,
            batch_size,
            mut shutdown,
        } = self;

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; skip it so rounds
        // start one interval after startup
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => sync_round(&store, &replicator, batch_size).await,
                _ = shutdown.changed() => {
                    debug!("anti-entropy task stopping");
                    break;
                }
            }
        }
    }
}

/// One round: snapshot recent entries under the store lock, then send
/// to peers without holding it
async fn sync_round(store: &Mutex<KvStore>, replicator: &Replicator, batch_size: usize) {
    let entries = match store.lock() {
        Ok(store) => store.recent_log(batch_size),
        Err(_) => return,
    };
    if entries.is_empty() {
        return;
    }

    debug!(entries = entries.len(), "anti-entropy sync round");
    counter!("replication.sync.rounds").increment(1);

    let frame = ControlFrame::Sync {
        log_entries: entries,
    };
    replicator.sync(&frame).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReplicationConfig;
    use crate::store::StoreConfig;

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let store = Arc::new(Mutex::new(KvStore::new("n1", StoreConfig::default())));
        let replicator = Replicator::new(Vec::new(), ReplicationConfig::default());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = AntiEntropyTask::new(
            store,
            replicator,
            Duration::from_secs(60),
            100,
            shutdown_rx,
        )
        .spawn();

        shutdown_tx.send(true).expect("receiver alive");
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("task must stop on shutdown")
            .expect("task must not panic");
    }
}
