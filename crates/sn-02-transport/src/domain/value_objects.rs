//! Transport configuration.

use std::time::Duration;

/// Pub/sub topic carrying head updates.
pub const HEAD_UPDATE_TOPIC: &str = "snartnet.head.v1";

/// Default listen address of the gossip node.
pub const DEFAULT_LISTEN_ADDR: &str = "/ip4/0.0.0.0/tcp/4747";

/// Default start timeout.
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(10);

/// Default publish timeout.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);

/// Default gossipsub heartbeat.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(1);

/// Default idle timeout of peer connections.
pub const DEFAULT_IDLE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(60);

/// Default largest gossip message.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024;

/// Publishes held while the gossip node is starting.
pub const MAX_PENDING_PUBLISHES: usize = 256;

/// Which transport implementation is in use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportKind {
    /// In-process delivery only.
    Loopback,
    /// Peer-to-peer gossip network.
    Gossip,
}

impl TransportKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransportKind::Loopback => "loopback",
            TransportKind::Gossip => "gossip",
        }
    }
}

/// Transport configuration.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// Use the gossip network instead of loopback.
    pub enable_gossip: bool,
    /// Topic head updates are exchanged on.
    pub topic: String,
    /// Multiaddr the gossip node listens on.
    pub listen_addr: String,
    /// Multiaddrs dialed after start.
    pub bootstrap_peers: Vec<String>,
    /// Bound on node construction and start.
    pub start_timeout: Duration,
    /// Bound on each publish.
    pub publish_timeout: Duration,
    /// Gossipsub heartbeat.
    pub heartbeat_interval: Duration,
    /// Connections without traffic are closed after this long.
    pub idle_connection_timeout: Duration,
    /// Largest message sent or accepted.
    pub max_message_bytes: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            enable_gossip: false,
            topic: HEAD_UPDATE_TOPIC.to_string(),
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            bootstrap_peers: Vec::new(),
            start_timeout: DEFAULT_START_TIMEOUT,
            publish_timeout: DEFAULT_PUBLISH_TIMEOUT,
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            idle_connection_timeout: DEFAULT_IDLE_CONNECTION_TIMEOUT,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

impl TransportConfig {
    /// Gossip on an ephemeral localhost port with short timeouts.
    pub fn for_testing() -> Self {
        Self {
            enable_gossip: true,
            listen_addr: "/ip4/127.0.0.1/tcp/0".to_string(),
            start_timeout: Duration::from_secs(5),
            publish_timeout: Duration::from_secs(1),
            heartbeat_interval: Duration::from_millis(100),
            ..Self::default()
        }
    }
}
