//! Configuration management for meshkv
//!
//! Node configuration resolves in layers: built-in defaults, then an
//! optional TOML file, then `MESHKV_*` environment variables. The
//! binary applies CLI flags on top of the result.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Main node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Identifier of this node; appears in vector clocks
    pub node_id: String,

    /// Address the TCP listener binds to
    pub bind_address: SocketAddr,

    /// All other nodes of the cluster
    #[serde(default)]
    pub peers: Vec<PeerConfig>,

    /// Replication and anti-entropy policy
    #[serde(default)]
    pub replication: ReplicationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// A peer node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerConfig {
    pub node_id: String,
    pub address: SocketAddr,
}

impl PeerConfig {
    /// Parse the `id@host:port` form used by MESHKV_PEERS and the CLI
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let (node_id, address) = spec.split_once('@').ok_or_else(|| {
            ConfigError::InvalidValue(format!("Peer must be id@host:port, got '{}'", spec))
        })?;
        let address = address.parse().map_err(|e| {
            ConfigError::InvalidValue(format!("Invalid peer address '{}': {}", spec, e))
        })?;
        Ok(PeerConfig {
            node_id: node_id.to_string(),
            address,
        })
    }
}

/// Replication and anti-entropy policy.
///
/// Pushes and syncs are best-effort by contract: a failed or timed-out
/// send is dropped, never retried, never rolled back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Push a REPLICATE frame to peers on every local SET/DELETE
    pub push_enabled: bool,

    /// Per-peer timeout for a REPLICATE push
    #[serde(with = "humantime_serde")]
    pub push_timeout: Duration,

    /// Anti-entropy round interval
    #[serde(with = "humantime_serde")]
    pub sync_interval: Duration,

    /// Per-peer timeout for an anti-entropy SYNC
    #[serde(with = "humantime_serde")]
    pub sync_timeout: Duration,

    /// Log entries re-sent per anti-entropy round
    pub sync_batch_size: usize,

    /// Replication-log retention
    pub log_capacity: usize,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        ReplicationConfig {
            push_enabled: true,
            push_timeout: Duration::from_secs(1),
            sync_interval: Duration::from_secs(10),
            sync_timeout: Duration::from_secs(2),
            sync_batch_size: 100,
            log_capacity: 1024,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            node_id: "node1".to_string(),
            bind_address: "127.0.0.1:6701".parse().expect("default bind address"),
            peers: Vec::new(),
            replication: ReplicationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `MESHKV_*` environment variables on top of this config
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(node_id) = env::var("MESHKV_NODE_ID") {
            self.node_id = node_id;
        }
        if let Ok(addr) = env::var("MESHKV_BIND_ADDRESS") {
            self.bind_address = addr
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid bind address: {}", e)))?;
        }
        if let Ok(peers) = env::var("MESHKV_PEERS") {
            self.peers = peers
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(|s| PeerConfig::parse(s.trim()))
                .collect::<Result<Vec<_>, _>>()?;
        }
        if let Ok(enabled) = env::var("MESHKV_REPLICATION_PUSH_ENABLED") {
            self.replication.push_enabled = enabled
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid push flag: {}", e)))?;
        }
        if let Ok(batch) = env::var("MESHKV_REPLICATION_SYNC_BATCH_SIZE") {
            self.replication.sync_batch_size = batch
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid sync batch size: {}", e)))?;
        }
        if let Ok(level) = env::var("MESHKV_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(json) = env::var("MESHKV_LOG_JSON") {
            self.logging.json_format = json
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid JSON flag: {}", e)))?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node_id.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "node_id must not be empty".to_string(),
            ));
        }

        for peer in &self.peers {
            if peer.node_id == self.node_id {
                return Err(ConfigError::ValidationFailed(format!(
                    "peer list must not contain the local node '{}'",
                    self.node_id
                )));
            }
        }
        let mut seen = std::collections::HashSet::new();
        for peer in &self.peers {
            if !seen.insert(&peer.node_id) {
                return Err(ConfigError::ValidationFailed(format!(
                    "duplicate peer id '{}'",
                    peer.node_id
                )));
            }
        }

        if self.replication.log_capacity == 0 {
            return Err(ConfigError::ValidationFailed(
                "log_capacity must be greater than 0".to_string(),
            ));
        }
        if self.replication.sync_batch_size == 0 {
            return Err(ConfigError::ValidationFailed(
                "sync_batch_size must be greater than 0".to_string(),
            ));
        }
        if self.replication.sync_batch_size > self.replication.log_capacity {
            return Err(ConfigError::ValidationFailed(
                "sync_batch_size must not exceed log_capacity".to_string(),
            ));
        }
        if self.replication.sync_interval.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "sync_interval must be greater than 0".to_string(),
            ));
        }
        if self.replication.push_timeout.is_zero() || self.replication.sync_timeout.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "peer timeouts must be greater than 0".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }
}
