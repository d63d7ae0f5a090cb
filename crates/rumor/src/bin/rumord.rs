//! Rumor node daemon.
//!
//! ## Usage
//!
//! ```bash
//! # Two nodes on one machine, each knowing the other
//! rumord --listen 127.0.0.1:8080 --endpoint http://127.0.0.1:8080/gossip \
//!        --peer http://127.0.0.1:8081/gossip --database a.db
//! rumord --listen 127.0.0.1:8081 --endpoint http://127.0.0.1:8081/gossip \
//!        --peer http://127.0.0.1:8080/gossip --database b.db
//!
//! # Or from a JSON file, with flags overriding it
//! rumord --config node.json --interval-secs 5
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rumor::store::{MemoryStore, SqliteStore, Store};
use rumor::{http, Endpoint, HttpTransport, Node, NodeConfig};

/// Rumor - anti-entropy gossip node
#[derive(Parser, Debug)]
#[command(name = "rumord")]
#[command(version)]
#[command(about = "Replicates append-only streams with peers by anti-entropy gossip")]
struct Cli {
    /// JSON config file; flags below override its values
    #[arg(short, long, env = "RUMOR_CONFIG")]
    config: Option<PathBuf>,

    /// URL peers POST gossip to (this node's reply endpoint)
    #[arg(long, env = "RUMOR_ENDPOINT")]
    endpoint: Option<String>,

    /// Address the HTTP server binds
    #[arg(long, env = "RUMOR_LISTEN")]
    listen: Option<String>,

    /// Name stamped on records published here
    #[arg(long, env = "RUMOR_ORIGINATOR")]
    originator: Option<String>,

    /// Seconds between anti-entropy rounds
    #[arg(long, env = "RUMOR_INTERVAL_SECS")]
    interval_secs: Option<u64>,

    /// Seed peer endpoint (repeatable, or comma-separated in the env var)
    #[arg(long = "peer", env = "RUMOR_PEERS", value_delimiter = ',')]
    peers: Vec<String>,

    /// SQLite database file (in-memory when omitted)
    #[arg(long, env = "RUMOR_DATABASE")]
    database: Option<PathBuf>,

    /// Delivery queue capacity, in batches
    #[arg(long, env = "RUMOR_QUEUE_CAPACITY")]
    queue_capacity: Option<usize>,

    /// Outbound request timeout in seconds
    #[arg(long, env = "RUMOR_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Accept self-signed or otherwise invalid TLS certificates
    #[arg(long, env = "RUMOR_INSECURE")]
    insecure: bool,
}

impl Cli {
    fn into_config(self) -> Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::from_file(path)
                .with_context(|| format!("load config {}", path.display()))?,
            None => NodeConfig::default(),
        };

        if let Some(endpoint) = self.endpoint {
            config.endpoint = Endpoint::new(endpoint);
        }
        if let Some(listen) = self.listen {
            config.listen = listen;
        }
        if let Some(originator) = self.originator {
            config.originator = originator;
        }
        if let Some(secs) = self.interval_secs {
            config.anti_entropy_interval = Duration::from_secs(secs);
        }
        if !self.peers.is_empty() {
            config.seed_peers = self.peers.into_iter().map(Endpoint::new).collect();
        }
        if self.database.is_some() {
            config.database = self.database;
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        if let Some(secs) = self.timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if self.insecure {
            config.accept_invalid_certs = true;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config()?;

    match config.database.clone() {
        Some(path) => {
            let store = SqliteStore::open(&path)
                .with_context(|| format!("open database {}", path.display()))?;
            run(config, store).await
        }
        None => {
            tracing::warn!("no database configured, records will not survive a restart");
            run(config, MemoryStore::new()).await
        }
    }
}

async fn run<S: Store + 'static>(config: NodeConfig, store: S) -> Result<()> {
    let transport = HttpTransport::from_config(&config).context("build http client")?;
    let node = Arc::new(
        Node::start(config, store, transport)
            .await
            .context("start node")?,
    );

    let listen = node.config().listen.clone();
    let listener = tokio::net::TcpListener::bind(&listen)
        .await
        .with_context(|| format!("bind to {}", listen))?;
    tracing::info!("gossip server listening on {}", listen);

    axum::serve(listener, http::router(Arc::clone(&node)))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down");
        })
        .await
        .context("serve")?;

    node.shutdown().await.context("stop node")?;
    Ok(())
}
