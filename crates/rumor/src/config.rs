//! Node configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use rumor_core::{validate_endpoint, validate_originator, Endpoint};
use rumor_sync::{DEFAULT_INTERVAL, DEFAULT_QUEUE_CAPACITY};

use crate::error::{NodeError, Result};

/// Default per-request timeout for outbound gossip.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound for the round interval and the request timeout.
pub const MAX_DURATION: Duration = Duration::from_secs(24 * 60 * 60);

/// Everything a node needs to start.
///
/// Durations are expressed in whole seconds in config files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// URL peers POST gossip to; sent as `replyEndpoint` on every message.
    pub endpoint: Endpoint,
    /// Address the HTTP server binds.
    pub listen: String,
    /// Name stamped on locally published records.
    pub originator: String,
    #[serde(with = "secs")]
    pub anti_entropy_interval: Duration,
    /// Peers known before any gossip arrives.
    pub seed_peers: Vec<Endpoint>,
    /// SQLite file; `None` keeps everything in memory.
    pub database: Option<PathBuf>,
    pub queue_capacity: usize,
    #[serde(with = "secs")]
    pub request_timeout: Duration,
    /// Skip TLS certificate checks on outbound requests.
    pub accept_invalid_certs: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::new("http://127.0.0.1:8080/gossip"),
            listen: "127.0.0.1:8080".into(),
            originator: "rumor".into(),
            anti_entropy_interval: DEFAULT_INTERVAL,
            seed_peers: Vec::new(),
            database: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            accept_invalid_certs: false,
        }
    }
}

impl NodeConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| NodeError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<()> {
        validate_endpoint(&self.endpoint)?;
        for peer in &self.seed_peers {
            validate_endpoint(peer)?;
        }
        validate_originator(&self.originator)?;
        check_duration("anti_entropy_interval", self.anti_entropy_interval)?;
        check_duration("request_timeout", self.request_timeout)?;
        if self.queue_capacity == 0 {
            return Err(NodeError::Config("queue_capacity must be positive".into()));
        }
        Ok(())
    }
}

fn check_duration(field: &str, value: Duration) -> Result<()> {
    if value.is_zero() || value > MAX_DURATION {
        return Err(NodeError::Config(format!(
            "{} must be between 1 and {} seconds",
            field,
            MAX_DURATION.as_secs()
        )));
    }
    Ok(())
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
