//! # Node Configuration
//!
//! Unified configuration for every subsystem and the runtime itself.
//!
//! ## Sources
//!
//! 1. Built-in defaults
//! 2. Optional TOML file named by `SNARTNET_CONFIG`
//! 3. `SNARTNET_*` environment overrides
//!
//! Every section is `#[serde(default)]`, so a file only needs the keys it
//! changes.

use serde::{Deserialize, Serialize};
use shared_types::Contact;
use sn_01_head_updates::PipelineConfig;
use sn_02_transport::{parse_multiaddr, TransportConfig};
use sn_03_index_sync::SyncConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the TOML configuration file.
pub const CONFIG_PATH_VAR: &str = "SNARTNET_CONFIG";

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Local publishing identity.
    pub identity: IdentityConfig,
    /// Head-update pipeline limits.
    pub pipeline: PipelineSection,
    /// Broadcast transport.
    pub transport: TransportSection,
    /// Index publishing and contact sync.
    pub sync: SyncSection,
    /// On-disk state.
    pub storage: StorageConfig,
    /// Contacts followed from startup.
    pub contacts: Vec<ContactConfig>,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("Cannot read config file {path}: {reason}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        reason: String,
    },

    /// Configuration file is not valid TOML for [`NodeConfig`].
    #[error("Cannot parse config file {path}: {reason}")]
    Parse {
        /// File path.
        path: PathBuf,
        /// Parser message.
        reason: String,
    },

    /// An environment override has an unusable value.
    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },

    /// A setting is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl NodeConfig {
    /// Load defaults, the optional file, then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&text).map_err(|e| match e {
            ConfigError::Parse { reason, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            reason: e.to_string(),
        })
    }

    /// Apply `SNARTNET_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("SNARTNET_ENABLE_GOSSIP") {
            self.transport.enable_gossip = parse_bool(&value).ok_or(ConfigError::InvalidEnv {
                var: "SNARTNET_ENABLE_GOSSIP",
                value,
            })?;
        }
        if let Some(value) = lookup("SNARTNET_BOOTSTRAP_PEERS") {
            self.transport.bootstrap_peers = value
                .split(',')
                .map(str::trim)
                .filter(|peer| !peer.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(value) = lookup("SNARTNET_LISTEN_ADDR") {
            if parse_multiaddr(&value).is_err() {
                return Err(ConfigError::InvalidEnv {
                    var: "SNARTNET_LISTEN_ADDR",
                    value,
                });
            }
            self.transport.listen_addr = value;
        }
        if let Some(value) = lookup("SNARTNET_SOURCE_ID") {
            self.identity.source_id = value;
        }
        if let Some(value) = lookup("SNARTNET_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(value);
        }
        Ok(())
    }

    /// Reject settings that would stall or disable a subsystem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.source_id.trim().is_empty() {
            return Err(ConfigError::Invalid("identity.source_id is empty".into()));
        }
        let positive = [
            ("pipeline.replay_capacity", self.pipeline.replay_capacity as u64),
            ("pipeline.rate_window_secs", self.pipeline.rate_window_secs),
            ("pipeline.rate_max_per_window", self.pipeline.rate_max_per_window as u64),
            ("transport.heartbeat_interval_ms", self.transport.heartbeat_interval_ms),
            ("transport.max_message_bytes", self.transport.max_message_bytes as u64),
            ("sync.fetch_concurrency", self.sync.fetch_concurrency as u64),
            ("sync.contact_workers", self.sync.contact_workers as u64),
            ("sync.fetch_timeout_ms", self.sync.fetch_timeout_ms),
            ("sync.publish_timeout_ms", self.sync.publish_timeout_ms),
            ("sync.default_max_items", self.sync.default_max_items as u64),
            ("sync.snapshot_entries", self.sync.snapshot_entries as u64),
        ];
        if let Some((name, _)) = positive.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Invalid(format!("{name} must be greater than zero")));
        }
        for addr in std::iter::once(&self.transport.listen_addr)
            .chain(&self.transport.bootstrap_peers)
        {
            parse_multiaddr(addr).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        if self.contacts.iter().any(|c| c.source_id.trim().is_empty()) {
            return Err(ConfigError::Invalid("contact with empty source_id".into()));
        }
        Ok(())
    }

    /// Pipeline limits.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            replay_capacity: self.pipeline.replay_capacity,
            rate_window: chrono::Duration::seconds(self.pipeline.rate_window_secs as i64),
            rate_max_per_window: self.pipeline.rate_max_per_window,
            max_skew: chrono::Duration::seconds(self.pipeline.max_skew_secs as i64),
        }
    }

    /// Transport settings.
    pub fn transport_config(&self) -> TransportConfig {
        let t = &self.transport;
        TransportConfig {
            enable_gossip: t.enable_gossip,
            topic: t.topic.clone(),
            listen_addr: t.listen_addr.clone(),
            bootstrap_peers: t.bootstrap_peers.clone(),
            start_timeout: Duration::from_millis(t.start_timeout_ms),
            publish_timeout: Duration::from_millis(t.publish_timeout_ms),
            heartbeat_interval: Duration::from_millis(t.heartbeat_interval_ms),
            idle_connection_timeout: Duration::from_secs(t.idle_connection_timeout_secs),
            max_message_bytes: t.max_message_bytes,
        }
    }

    /// Index publishing and sync bounds.
    pub fn sync_config(&self) -> SyncConfig {
        let s = &self.sync;
        SyncConfig {
            fetch_concurrency: s.fetch_concurrency,
            contact_workers: s.contact_workers,
            fetch_timeout: Duration::from_millis(s.fetch_timeout_ms),
            publish_timeout: Duration::from_millis(s.publish_timeout_ms),
            default_max_items: s.default_max_items,
            default_lookback: chrono::Duration::days(s.default_lookback_days as i64),
            snapshot_entries: s.snapshot_entries,
        }
    }

    /// Contacts to register at startup.
    pub fn initial_contacts(&self) -> Vec<Contact> {
        self.contacts.iter().map(ContactConfig::to_contact).collect()
    }

    /// Small limits, loopback transport and short timeouts.
    pub fn for_testing(source_id: &str) -> Self {
        let pipeline = PipelineConfig::for_testing();
        let sync = SyncConfig::for_testing();
        Self {
            identity: IdentityConfig {
                source_id: source_id.to_string(),
            },
            pipeline: PipelineSection {
                replay_capacity: pipeline.replay_capacity,
                rate_window_secs: pipeline.rate_window.num_seconds() as u64,
                rate_max_per_window: pipeline.rate_max_per_window,
                max_skew_secs: pipeline.max_skew.num_seconds() as u64,
            },
            sync: SyncSection {
                fetch_timeout_ms: sync.fetch_timeout.as_millis() as u64,
                publish_timeout_ms: sync.publish_timeout.as_millis() as u64,
                ..SyncSection::default()
            },
            ..Self::default()
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Local identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Source id this node publishes under.
    pub source_id: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            source_id: "local".to_string(),
        }
    }
}

/// Head-update pipeline section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// Signatures remembered for replay protection.
    pub replay_capacity: usize,
    /// Rate window length in seconds.
    pub rate_window_secs: u64,
    /// Updates accepted per source per window.
    pub rate_max_per_window: u32,
    /// Allowed clock skew in seconds.
    pub max_skew_secs: u64,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            replay_capacity: sn_01_head_updates::DEFAULT_REPLAY_CAPACITY,
            rate_window_secs: sn_01_head_updates::DEFAULT_RATE_WINDOW_SECS,
            rate_max_per_window: sn_01_head_updates::DEFAULT_RATE_MAX_PER_WINDOW,
            max_skew_secs: sn_01_head_updates::DEFAULT_MAX_SKEW_SECS,
        }
    }
}

/// Transport section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSection {
    /// Use libp2p gossip instead of loopback.
    pub enable_gossip: bool,
    /// Gossip topic.
    pub topic: String,
    /// Local listen multiaddr.
    pub listen_addr: String,
    /// Peer multiaddrs dialed after start.
    pub bootstrap_peers: Vec<String>,
    /// Bound on transport start.
    pub start_timeout_ms: u64,
    /// Bound on each broadcast.
    pub publish_timeout_ms: u64,
    /// Gossipsub heartbeat.
    pub heartbeat_interval_ms: u64,
    /// Idle connections are closed after this long.
    pub idle_connection_timeout_secs: u64,
    /// Largest gossip message.
    pub max_message_bytes: usize,
}

impl Default for TransportSection {
    fn default() -> Self {
        let defaults = TransportConfig::default();
        Self {
            enable_gossip: defaults.enable_gossip,
            topic: defaults.topic,
            listen_addr: defaults.listen_addr,
            bootstrap_peers: defaults.bootstrap_peers,
            start_timeout_ms: defaults.start_timeout.as_millis() as u64,
            publish_timeout_ms: defaults.publish_timeout.as_millis() as u64,
            heartbeat_interval_ms: defaults.heartbeat_interval.as_millis() as u64,
            idle_connection_timeout_secs: defaults.idle_connection_timeout.as_secs(),
            max_message_bytes: defaults.max_message_bytes,
        }
    }
}

/// Index sync section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    /// Content fetches in flight per contact.
    pub fetch_concurrency: usize,
    /// Contacts synced concurrently.
    pub contact_workers: usize,
    /// Bound on each fetch.
    pub fetch_timeout_ms: u64,
    /// Bound on each content publish.
    pub publish_timeout_ms: u64,
    /// Entries collected per sync by default.
    pub default_max_items: usize,
    /// Default lookback in days.
    pub default_lookback_days: u64,
    /// Entries per published snapshot.
    pub snapshot_entries: usize,
}

impl Default for SyncSection {
    fn default() -> Self {
        let defaults = SyncConfig::default();
        Self {
            fetch_concurrency: defaults.fetch_concurrency,
            contact_workers: defaults.contact_workers,
            fetch_timeout_ms: defaults.fetch_timeout.as_millis() as u64,
            publish_timeout_ms: defaults.publish_timeout.as_millis() as u64,
            default_max_items: defaults.default_max_items,
            default_lookback_days: defaults.default_lookback.num_days() as u64,
            snapshot_entries: defaults.snapshot_entries,
        }
    }
}

/// Storage section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding posts, the keypair and the local head.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
        }
    }
}

impl StorageConfig {
    /// Directory of post records.
    pub fn posts_dir(&self) -> PathBuf {
        self.data_dir.join("posts")
    }

    /// Keypair file.
    pub fn keypair_path(&self) -> PathBuf {
        self.data_dir.join("keypair.json")
    }

    /// Head of the local index chain.
    pub fn head_path(&self) -> PathBuf {
        self.data_dir.join("head.json")
    }
}

/// A contact followed from startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactConfig {
    /// Contact identity.
    pub source_id: String,
    /// Known head, if any.
    #[serde(default)]
    pub head: Option<String>,
    /// Entries collected per sync.
    #[serde(default)]
    pub sync_max_items: Option<usize>,
    /// Lookback in days.
    #[serde(default)]
    pub sync_lookback_days: Option<u64>,
}

impl ContactConfig {
    fn to_contact(&self) -> Contact {
        let mut contact = Contact::new(self.source_id.clone());
        contact.current_head_locator = self.head.clone();
        contact.sync_max_items = self.sync_max_items;
        contact.sync_lookback_secs = self.sync_lookback_days.map(|days| days * 86_400);
        contact
    }
}
