/*
    server.rs - TCP node service

    Accepts persistent client connections and serves the line protocol:
    one command or control frame per line in, one JSON response per
    line out. Each connection runs on its own task for its lifetime.

    All store state sits behind one exclusive lock. The lock is held
    for the duration of each store operation and released before any
    outbound network call; replication frames are built from state
    captured under the lock.

    Shutdown closes the listener; in-flight connection handlers exit on
    their next read failure.
*/

use crate::config::NodeConfig;
use crate::node::anti_entropy::AntiEntropyTask;
use crate::node::command::{self, Command};
use crate::node::protocol::{is_control_frame, ControlFrame, Response, ScoredKey};
use crate::node::replicator::Replicator;
use crate::store::{KvStore, LogOperation, SetOutcome, StoreConfig};
use serde_json::Value;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// TCP front of one masterless node
pub struct NodeServer {
    listener: TcpListener,
    config: NodeConfig,
    state: Arc<NodeState>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl NodeServer {
    /// Bind the listener at the configured address
    pub async fn bind(config: NodeConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(config.bind_address).await?;
        Ok(Self::new(config, listener))
    }

    /// Build a server around an already-bound listener
    pub fn new(config: NodeConfig, listener: TcpListener) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let store = Arc::new(Mutex::new(KvStore::new(
            &config.node_id,
            StoreConfig {
                replication_log_capacity: config.replication.log_capacity,
                ..StoreConfig::default()
            },
        )));
        let replicator = Replicator::new(config.peers.clone(), config.replication.clone());

        let state = Arc::new(NodeState {
            node_id: config.node_id.clone(),
            store,
            replicator,
            shutdown: shutdown_tx.clone(),
        });

        NodeServer {
            listener,
            config,
            state,
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// The address the listener is bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Handle that stops the listener when sent `true`
    pub fn shutdown_handle(&self) -> watch::Sender<bool> {
        self.shutdown_tx.clone()
    }

    /// Serve connections until shutdown. Also runs the anti-entropy
    /// task for the server's lifetime.
    pub async fn run(self) -> io::Result<()> {
        info!(
            node_id = %self.config.node_id,
            addr = %self.local_addr()?,
            peers = self.config.peers.len(),
            "masterless node listening"
        );

        let anti_entropy = AntiEntropyTask::new(
            Arc::clone(&self.state.store),
            self.state.replicator.clone(),
            self.config.replication.sync_interval,
            self.config.replication.sync_batch_size,
            self.shutdown_rx.clone(),
        )
        .spawn();

        let mut shutdown_rx = self.shutdown_rx.clone();
        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!(node_id = %self.config.node_id, "listener shutting down");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(err) = handle_connection(stream, state).await {
                                debug!(peer = %peer, error = %err, "connection closed with error");
                            }
                        });
                    }
                    Err(err) => warn!(error = %err, "failed to accept connection"),
                }
            }
        }

        let _ = anti_entropy.await;
        Ok(())
    }
}

/// Serve one connection: read lines, write one response line each
async fn handle_connection(stream: TcpStream, state: Arc<NodeState>) -> io::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = state.process_line(line).await;
        let mut payload = response.to_line();
        payload.push('\n');
        write_half.write_all(payload.as_bytes()).await?;
    }

    Ok(())
}

/// Shared per-node state behind the connection handlers
struct NodeState {
    node_id: String,
    store: Arc<Mutex<KvStore>>,
    replicator: Replicator,
    shutdown: watch::Sender<bool>,
}

impl NodeState {
    /// Route one line: control frames to the internal handler,
    /// everything else through command parsing
    async fn process_line(&self, line: &str) -> Response {
        if is_control_frame(line) {
            return self.handle_control(line).await;
        }

        match command::parse(line) {
            Ok(command) => self.handle_command(command).await,
            Err(err) => Response::error(err.to_string()),
        }
    }

    async fn handle_command(&self, command: Command) -> Response {
        match command {
            Command::Set { key, value } => self.handle_set(key, value).await,
            Command::Get { key } => self.handle_get(&key),
            Command::Delete { key } => self.handle_delete(key).await,
            Command::CreateIndex { name, field_path } => {
                let mut store = match self.lock_store() {
                    Ok(store) => store,
                    Err(response) => return response,
                };
                store.create_index(&name, &field_path);
                Response::ok_message(format!("Index '{}' created", name))
            }
            Command::Search { index, value } => {
                let store = match self.lock_store() {
                    Ok(store) => store,
                    Err(response) => return response,
                };
                match store.search(&index, &value) {
                    Ok(keys) => Response::ok().with_keys(keys),
                    Err(err) => Response::error(err.to_string()),
                }
            }
            Command::RangeSearch { index, min, max } => {
                let store = match self.lock_store() {
                    Ok(store) => store,
                    Err(response) => return response,
                };
                match store.range_search(&index, min, max) {
                    Ok(keys) => Response::ok().with_keys(keys),
                    Err(err) => Response::error(err.to_string()),
                }
            }
            Command::Fulltext { query, mode } => {
                let store = match self.lock_store() {
                    Ok(store) => store,
                    Err(response) => return response,
                };
                Response::ok().with_keys(store.fulltext_search(&query, mode))
            }
            Command::Semantic { query, top_k } => {
                let mut store = match self.lock_store() {
                    Ok(store) => store,
                    Err(response) => return response,
                };
                let results = store
                    .semantic_search(&query, top_k)
                    .into_iter()
                    .map(|(key, score)| ScoredKey { key, score })
                    .collect();
                Response::ok().with_results(results)
            }
            Command::Status => Response::ok().with_node_status(
                self.node_id.clone(),
                "masterless",
                self.replicator.peer_count(),
            ),
            Command::Ping => Response::ok_message("PONG"),
            Command::Shutdown => {
                let _ = self.shutdown.send(true);
                Response::ok_message("Shutting down")
            }
        }
    }

    async fn handle_set(&self, key: String, value: Value) -> Response {
        let outcome = {
            let mut store = match self.lock_store() {
                Ok(store) => store,
                Err(response) => return response,
            };
            store.set(&key, value.clone(), None)
        };

        match outcome {
            SetOutcome::Stored { versions, clock } => {
                let frame = ControlFrame::Replicate {
                    operation: LogOperation::Set,
                    key,
                    value: Some(value),
                    vector_clock: Some(clock),
                };
                self.replicator.replicate(&frame).await;
                Response::ok().with_versions(versions)
            }
            SetOutcome::Outdated => Response::ok_message("Outdated version ignored"),
        }
    }

    fn handle_get(&self, key: &str) -> Response {
        let store = match self.lock_store() {
            Ok(store) => store,
            Err(response) => return response,
        };
        match store.get_latest(key) {
            Some(value) => Response::ok().with_value(value.clone()),
            None => Response::error(format!("Key '{}' not found", key)),
        }
    }

    async fn handle_delete(&self, key: String) -> Response {
        let deleted = {
            let mut store = match self.lock_store() {
                Ok(store) => store,
                Err(response) => return response,
            };
            store.delete(&key)
        };

        if !deleted {
            return Response::error(format!("Key '{}' not found", key));
        }

        let frame = ControlFrame::Replicate {
            operation: LogOperation::Delete,
            key,
            value: None,
            vector_clock: None,
        };
        self.replicator.replicate(&frame).await;
        Response::ok()
    }

    /// Apply a frame received from a peer
    async fn handle_control(&self, line: &str) -> Response {
        let frame: ControlFrame = match serde_json::from_str(line) {
            Ok(frame) => frame,
            Err(_) => return Response::error("Unknown internal command"),
        };

        let mut store = match self.lock_store() {
            Ok(store) => store,
            Err(response) => return response,
        };

        match frame {
            ControlFrame::Replicate {
                operation,
                key,
                value,
                vector_clock,
            } => {
                match operation {
                    LogOperation::Set => {
                        if let Some(value) = value {
                            store.set(&key, value, vector_clock);
                        }
                    }
                    LogOperation::Delete => {
                        store.delete(&key);
                    }
                }
                Response::ok()
            }
            ControlFrame::Sync { log_entries } => {
                store.merge_replication_log(log_entries);
                Response::ok()
            }
        }
    }

    fn lock_store(&self) -> Result<MutexGuard<'_, KvStore>, Response> {
        self.store
            .lock()
            .map_err(|_| Response::error("Store lock poisoned"))
    }
}
