use anyhow::{Context, Result};
use clap::Parser;
use meshkv_core::config::{NodeConfig, PeerConfig};
use meshkv_core::logging::{init_logging_with_config, LogConfig};
use meshkv_core::metrics::init_metrics;
use meshkv_core::node::NodeServer;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "meshkv")]
#[command(author, version, about = "Masterless replicated key-value store node", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Node identifier (appears in vector clocks)
    #[arg(long)]
    node_id: Option<String>,

    /// Address to listen on
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Peer node as id@host:port; repeatable
    #[arg(long = "peer")]
    peers: Vec<String>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,
}

impl Args {
    /// Resolve configuration: file (or defaults), then environment,
    /// then CLI flags
    fn resolve_config(&self) -> Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::from_file(path)
                .with_context(|| format!("loading config file {}", path.display()))?,
            None => NodeConfig::default(),
        };
        config
            .apply_env_overrides()
            .context("applying MESHKV_* environment overrides")?;

        if let Some(node_id) = &self.node_id {
            config.node_id = node_id.clone();
        }
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if !self.peers.is_empty() {
            config.peers = self
                .peers
                .iter()
                .map(|spec| PeerConfig::parse(spec))
                .collect::<Result<Vec<_>, _>>()
                .context("parsing --peer flags")?;
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        if self.json_logs {
            config.logging.json_format = true;
        }

        config.validate().context("validating configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.resolve_config()?;

    init_logging_with_config(LogConfig::from_settings(&config.logging))
        .context("initializing logging")?;
    init_metrics();

    let server = NodeServer::bind(config.clone())
        .await
        .with_context(|| format!("binding {}", config.bind_address))?;

    // Ctrl-C stops the listener the same way a SHUTDOWN command does
    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received interrupt, shutting down");
            let _ = shutdown.send(true);
        }
    });

    server.run().await.context("serving connections")?;
    info!(node_id = %config.node_id, "node stopped");
    Ok(())
}
