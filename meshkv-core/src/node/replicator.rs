/*
    replicator.rs - Best-effort peer frame delivery

    Sends control frames to the fixed peer list. Every send is an
    independent task with a bounded timeout; a refused, broken, or
    timed-out peer is dropped silently. This is the contract, not an
    accident: missed frames are healed by the next anti-entropy round
    or a future write touching the same key.
*/

use crate::config::{PeerConfig, ReplicationConfig};
use crate::node::protocol::ControlFrame;
use metrics::counter;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Fans control frames out to the peer list
#[derive(Debug, Clone)]
pub struct Replicator {
    peers: Vec<PeerConfig>,
    config: ReplicationConfig,
}

impl Replicator {
    pub fn new(peers: Vec<PeerConfig>, config: ReplicationConfig) -> Self {
        Replicator { peers, config }
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Push a REPLICATE frame to every peer, honoring the push policy
    pub async fn replicate(&self, frame: &ControlFrame) {
        if !self.config.push_enabled {
            return;
        }
        self.broadcast(frame, self.config.push_timeout).await;
    }

    /// Push an anti-entropy SYNC frame to every peer
    pub async fn sync(&self, frame: &ControlFrame) {
        self.broadcast(frame, self.config.sync_timeout).await;
    }

    /// Send a frame to all peers concurrently and wait for the
    /// attempts to finish. Failures are logged at debug and dropped.
    async fn broadcast(&self, frame: &ControlFrame, timeout: Duration) {
        if self.peers.is_empty() {
            return;
        }

        let line = match serde_json::to_string(frame) {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "failed to encode control frame");
                return;
            }
        };

        let mut attempts = JoinSet::new();
        for peer in self.peers.iter().cloned() {
            let line = line.clone();
            attempts.spawn(async move {
                match send_line(peer.address, &line, timeout).await {
                    Ok(()) => {
                        counter!("replication.frames.sent").increment(1);
                    }
                    Err(err) => {
                        counter!("replication.frames.failed").increment(1);
                        debug!(peer = %peer.node_id, error = %err, "peer send failed, dropping frame");
                    }
                }
            });
        }
        while attempts.join_next().await.is_some() {}
    }
}

/// Connect, write one frame line, and read the acknowledgement line,
/// all within `timeout`
async fn send_line(addr: SocketAddr, line: &str, timeout: Duration) -> io::Result<()> {
    let attempt = async {
        let stream = TcpStream::connect(addr).await?;
        let mut stream = BufReader::new(stream);
        stream.get_mut().write_all(line.as_bytes()).await?;
        stream.get_mut().write_all(b"\n").await?;

        let mut ack = String::new();
        stream.read_line(&mut ack).await?;
        Ok(())
    };

    match tokio::time::timeout(timeout, attempt).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "peer send timed out")),
    }
}
