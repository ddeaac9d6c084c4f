//! # SnartNet Node Binary
//!
//! Loads configuration, wires the subsystems and runs until Ctrl+C.
//!
//! ## Environment
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `SNARTNET_CONFIG` | TOML configuration file |
//! | `SNARTNET_ENABLE_GOSSIP` | `true` to use libp2p gossip |
//! | `SNARTNET_BOOTSTRAP_PEERS` | Comma-separated peer multiaddrs |
//! | `SNARTNET_LISTEN_ADDR` | Local gossip listen multiaddr |
//! | `SNARTNET_SOURCE_ID` | Local publishing identity |
//! | `SNARTNET_DATA_DIR` | Posts, keypair and head directory |
//! | `RUST_LOG` | Log filter (default `info`) |

use anyhow::{Context, Result};
use node_runtime::{init_logging, NodeComponents, NodeConfig, SnartnetNode};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    init_logging().context("failed to install log subscriber")?;

    let config = NodeConfig::load().context("failed to load configuration")?;

    info!("===========================================");
    info!("  SnartNet Node v{}", env!("CARGO_PKG_VERSION"));
    info!("===========================================");
    info!(
        source_id = %config.identity.source_id,
        data_dir = %config.storage.data_dir.display(),
        gossip = config.transport.enable_gossip,
        contacts = config.contacts.len(),
        "Configuration loaded"
    );

    let components = NodeComponents::from_config(&config);
    let node = SnartnetNode::new(config, components);

    let fingerprint = node
        .fingerprint()
        .await
        .context("failed to provision the local keypair")?;
    let head = node
        .restore_head()
        .await
        .context("failed to read the local index head")?;
    let transport = node.start_transport().await;
    info!(
        fingerprint = %fingerprint,
        head = ?head,
        transport = transport.as_str(),
        "Node started"
    );

    let queued = node
        .sync_all_contacts()
        .await
        .context("failed to read contacts")?;
    info!(queued, "Initial contact sync queued");

    info!("Node is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;

    node.shutdown().await;
    info!("Shutdown complete");
    Ok(())
}
