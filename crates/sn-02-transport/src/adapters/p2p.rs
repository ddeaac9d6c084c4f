//! # libp2p Gossip Node
//!
//! [`PubSubNode`] over a libp2p swarm: TCP secured with Noise and multiplexed
//! with Yamux, gossipsub for topic fan-out, identify and ping for peer upkeep.
//!
//! The swarm is owned by a single driver task. [`Libp2pGossipNode`] talks to
//! it over a command channel, each command carrying a oneshot for its result.
//!
//! Messages are signed with the node's peer key and validated strictly.
//! Message ids are derived from the payload, so one head update relayed
//! along two paths is delivered once.
//!
//! Publishing with no subscribed peers is not an error: the update is simply
//! not sent, and contacts catch up on their next sync.

use async_trait::async_trait;
use futures::StreamExt;
use libp2p::{
    gossipsub, identify, identity,
    multiaddr::Protocol,
    noise, ping,
    swarm::{NetworkBehaviour, SwarmEvent},
    tcp, yamux, Multiaddr, PeerId, Swarm, SwarmBuilder,
};
use parking_lot::Mutex;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::domain::{GossipMessage, TransportConfig, TransportError};
use crate::ports::{PubSubNode, PubSubNodeFactory};

const IDENTIFY_PROTOCOL: &str = "/snartnet/id/1.0.0";
const PING_INTERVAL: Duration = Duration::from_secs(30);
const COMMAND_BUFFER: usize = 64;

type Reply = oneshot::Sender<Result<(), TransportError>>;

/// Parse a multiaddr such as `/ip4/10.0.0.5/tcp/4747/p2p/12D3Koo...`.
pub fn parse_multiaddr(addr: &str) -> Result<Multiaddr, TransportError> {
    addr.trim()
        .parse()
        .map_err(|e| TransportError::InvalidPeer(format!("{addr}: {e}")))
}

#[derive(NetworkBehaviour)]
struct SnartnetBehaviour {
    gossipsub: gossipsub::Behaviour,
    identify: identify::Behaviour,
    ping: ping::Behaviour,
}

impl SnartnetBehaviour {
    fn new(key: &identity::Keypair, config: &TransportConfig) -> Result<Self, TransportError> {
        let message_id_fn = |message: &gossipsub::Message| {
            let mut hasher = DefaultHasher::new();
            message.data.hash(&mut hasher);
            gossipsub::MessageId::from(hasher.finish().to_string())
        };

        let gossip_config = gossipsub::ConfigBuilder::default()
            .heartbeat_interval(config.heartbeat_interval)
            .validation_mode(gossipsub::ValidationMode::Strict)
            .max_transmit_size(config.max_message_bytes)
            .message_id_fn(message_id_fn)
            .build()
            .map_err(|e| TransportError::Init(format!("gossipsub config: {e}")))?;

        let gossipsub = gossipsub::Behaviour::new(
            gossipsub::MessageAuthenticity::Signed(key.clone()),
            gossip_config,
        )
        .map_err(|e| TransportError::Init(format!("gossipsub: {e}")))?;

        let identify = identify::Behaviour::new(identify::Config::new(
            IDENTIFY_PROTOCOL.to_string(),
            key.public(),
        ));
        let ping = ping::Behaviour::new(ping::Config::new().with_interval(PING_INTERVAL));

        Ok(Self {
            gossipsub,
            identify,
            ping,
        })
    }
}

enum Command {
    Subscribe { topic: String, reply: Reply },
    Publish { topic: String, payload: Vec<u8>, reply: Reply },
    Dial { addr: Multiaddr, reply: Reply },
}

/// Owns the swarm; runs until every command sender is gone.
struct SwarmDriver {
    swarm: Swarm<SnartnetBehaviour>,
    commands: mpsc::Receiver<Command>,
    inbound: mpsc::Sender<GossipMessage>,
    max_message_bytes: usize,
}

impl SwarmDriver {
    async fn run(mut self) {
        loop {
            tokio::select! {
                event = self.swarm.select_next_some() => self.handle_event(event),
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
            }
        }
        debug!("Gossip swarm driver exiting");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Subscribe { topic, reply } => {
                let result = self
                    .swarm
                    .behaviour_mut()
                    .gossipsub
                    .subscribe(&gossipsub::IdentTopic::new(topic.as_str()))
                    .map(|_| debug!(topic = %topic, "Subscribed to gossip topic"))
                    .map_err(|e| TransportError::Init(format!("subscribe {topic}: {e:?}")));
                let _ = reply.send(result);
            }
            Command::Publish {
                topic,
                payload,
                reply,
            } => {
                let size = payload.len();
                let result = match self
                    .swarm
                    .behaviour_mut()
                    .gossipsub
                    .publish(gossipsub::IdentTopic::new(topic.as_str()), payload)
                {
                    Ok(id) => {
                        trace!(topic = %topic, id = ?id, "Gossip message published");
                        Ok(())
                    }
                    Err(gossipsub::PublishError::InsufficientPeers) => {
                        debug!(topic = %topic, "No gossip peers on topic, message not sent");
                        Ok(())
                    }
                    Err(gossipsub::PublishError::Duplicate) => {
                        debug!(topic = %topic, "Duplicate gossip message ignored");
                        Ok(())
                    }
                    Err(gossipsub::PublishError::MessageTooLarge) => {
                        Err(TransportError::MessageTooLarge {
                            size,
                            max: self.max_message_bytes,
                        })
                    }
                    Err(e) => Err(TransportError::PublishFailed(format!("{e:?}"))),
                };
                let _ = reply.send(result);
            }
            Command::Dial { addr, reply } => {
                let result = self
                    .swarm
                    .dial(addr.clone())
                    .map_err(|e| TransportError::InvalidPeer(format!("{addr}: {e}")));
                let _ = reply.send(result);
            }
        }
    }

    fn handle_event(&mut self, event: SwarmEvent<SnartnetBehaviourEvent>) {
        match event {
            SwarmEvent::Behaviour(SnartnetBehaviourEvent::Gossipsub(
                gossipsub::Event::Message {
                    propagation_source,
                    message,
                    ..
                },
            )) => self.deliver(propagation_source, message),
            SwarmEvent::Behaviour(SnartnetBehaviourEvent::Gossipsub(
                gossipsub::Event::Subscribed { peer_id, topic },
            )) => debug!(peer = %peer_id, topic = %topic, "Peer joined gossip topic"),
            SwarmEvent::Behaviour(SnartnetBehaviourEvent::Identify(
                identify::Event::Received { peer_id, info, .. },
            )) => trace!(peer = %peer_id, agent = %info.agent_version, "Peer identified"),
            SwarmEvent::NewListenAddr { address, .. } => {
                info!(address = %address, "Gossip node listening")
            }
            SwarmEvent::ConnectionEstablished {
                peer_id, endpoint, ..
            } => debug!(
                peer = %peer_id,
                address = %endpoint.get_remote_address(),
                "Gossip peer connected"
            ),
            SwarmEvent::ConnectionClosed { peer_id, .. } => {
                debug!(peer = %peer_id, "Gossip peer disconnected")
            }
            SwarmEvent::OutgoingConnectionError { peer_id, error, .. } => {
                warn!(peer = ?peer_id, error = %error, "Gossip dial failed")
            }
            _ => {}
        }
    }

    fn deliver(&self, source: PeerId, message: gossipsub::Message) {
        let message = GossipMessage {
            topic: message.topic.into_string(),
            data: message.data,
        };
        match self.inbound.try_send(message) {
            Ok(()) => trace!(peer = %source, "Gossip message received"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(peer = %source, "Gossip inbound queue full, message dropped")
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Gossip consumer gone, message dropped")
            }
        }
    }
}

/// A running libp2p gossipsub node.
pub struct Libp2pGossipNode {
    commands: mpsc::Sender<Command>,
    driver: Mutex<Option<JoinHandle<()>>>,
    peer_id: PeerId,
    listen_addr: Multiaddr,
    max_message_bytes: usize,
}

impl Libp2pGossipNode {
    /// Build the swarm, bind the listen address and spawn the driver.
    ///
    /// Returns once the first listen address is known, so the node is
    /// reachable as soon as this resolves.
    pub async fn start(
        config: &TransportConfig,
        inbound: mpsc::Sender<GossipMessage>,
    ) -> Result<Self, TransportError> {
        let listen = parse_multiaddr(&config.listen_addr)?;
        let key = identity::Keypair::generate_ed25519();
        let peer_id = key.public().to_peer_id();
        let behaviour = SnartnetBehaviour::new(&key, config)?;
        let idle_timeout = config.idle_connection_timeout;

        let mut swarm = SwarmBuilder::with_existing_identity(key)
            .with_tokio()
            .with_tcp(
                tcp::Config::default(),
                noise::Config::new,
                yamux::Config::default,
            )
            .map_err(|e| TransportError::Init(format!("tcp transport: {e}")))?
            .with_behaviour(|_| behaviour)
            .map_err(|e| TransportError::Init(format!("behaviour: {e}")))?
            .with_swarm_config(|c| c.with_idle_connection_timeout(idle_timeout))
            .build();

        swarm
            .listen_on(listen.clone())
            .map_err(|e| TransportError::Init(format!("listen on {listen}: {e}")))?;

        let timeout_ms = config.start_timeout.as_millis() as u64;
        let listen_addr = tokio::time::timeout(config.start_timeout, async {
            loop {
                match swarm.select_next_some().await {
                    SwarmEvent::NewListenAddr { address, .. } => return Ok(address),
                    SwarmEvent::ListenerError { error, .. } => {
                        return Err(TransportError::Init(format!("listener: {error}")))
                    }
                    _ => {}
                }
            }
        })
        .await
        .map_err(|_| TransportError::StartTimeout(timeout_ms))??;

        let (commands, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let driver = SwarmDriver {
            swarm,
            commands: commands_rx,
            inbound,
            max_message_bytes: config.max_message_bytes,
        };
        let handle = tokio::spawn(driver.run());

        info!(peer_id = %peer_id, listen_addr = %listen_addr, "Gossip node started");
        Ok(Self {
            commands,
            driver: Mutex::new(Some(handle)),
            peer_id,
            listen_addr,
            max_message_bytes: config.max_message_bytes,
        })
    }

    pub fn peer_id(&self) -> PeerId {
        self.peer_id
    }

    /// Address the swarm is listening on.
    pub fn listen_addr(&self) -> &Multiaddr {
        &self.listen_addr
    }

    /// Listen address with the peer id appended, ready for another node to dial.
    pub fn dial_addr(&self) -> Multiaddr {
        self.listen_addr.clone().with(Protocol::P2p(self.peer_id))
    }

    async fn request(&self, command: impl FnOnce(Reply) -> Command) -> Result<(), TransportError> {
        let (reply, result) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| TransportError::Stopped)?;
        result.await.map_err(|_| TransportError::Stopped)?
    }
}

#[async_trait]
impl PubSubNode for Libp2pGossipNode {
    async fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        let topic = topic.to_string();
        self.request(|reply| Command::Subscribe { topic, reply })
            .await
    }

    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if payload.len() > self.max_message_bytes {
            return Err(TransportError::MessageTooLarge {
                size: payload.len(),
                max: self.max_message_bytes,
            });
        }
        let topic = topic.to_string();
        self.request(|reply| Command::Publish {
            topic,
            payload,
            reply,
        })
        .await
    }

    async fn dial(&self, peer: &str) -> Result<(), TransportError> {
        let addr = parse_multiaddr(peer)?;
        debug!(peer = %addr, "Dialing gossip peer");
        self.request(|reply| Command::Dial { addr, reply }).await
    }

    async fn stop(&self) -> Result<(), TransportError> {
        if let Some(driver) = self.driver.lock().take() {
            driver.abort();
            info!(peer_id = %self.peer_id, "Gossip node stopped");
        }
        Ok(())
    }
}

impl Drop for Libp2pGossipNode {
    fn drop(&mut self) {
        if let Some(driver) = self.driver.lock().take() {
            driver.abort();
        }
    }
}

/// Starts a [`Libp2pGossipNode`] per transport start.
pub struct Libp2pNodeFactory {
    config: TransportConfig,
}

impl Libp2pNodeFactory {
    pub fn new(config: &TransportConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

#[async_trait]
impl PubSubNodeFactory for Libp2pNodeFactory {
    async fn create(
        &self,
        inbound: mpsc::Sender<GossipMessage>,
    ) -> Result<Arc<dyn PubSubNode>, TransportError> {
        let node = Libp2pGossipNode::start(&self.config, inbound).await?;
        Ok(Arc::new(node))
    }
}
