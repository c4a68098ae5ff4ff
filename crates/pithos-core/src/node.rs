//! The running node: an opened repository bound to a libp2p swarm.
//!
//! [`Node::spawn`] is the single node-construction path. The bootstrap
//! orchestrator uses it to bring up the long-lived online node, and the
//! provisioner reuses it for the short-lived offline nodes that seed
//! default content and initialize the naming keyspace.
//!
//! An online node's swarm lives in a background driver task; the [`Node`]
//! handle talks to it over a command channel. The handle is an explicitly
//! owned value threaded to whoever needs node access; nothing here is
//! process-global.

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::time::Duration;

use futures::StreamExt;
use libp2p::{
    noise,
    swarm::{dial_opts::DialOpts, SwarmEvent},
    tcp, yamux, Multiaddr, PeerId, Swarm, SwarmBuilder,
};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::assets;
use crate::config::RoutingMode;
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::network::{NodeBehaviour, NodeEvent};
use crate::peers::PeerTarget;
use crate::repo::{ContentAddress, NameRecord, Repo};

/// How long to wait for the listener to come up during spawn.
const LISTEN_TIMEOUT: Duration = Duration::from_secs(10);

/// Idle connections are kept around this long so freshly dialed peers stay
/// visible in the peer list.
const IDLE_CONNECTION_TIMEOUT: Duration = Duration::from_secs(60);

/// How a node instance is constructed.
#[derive(Debug, Clone, Copy)]
pub struct NodeOptions {
    /// Whether the node brings up its network layer.
    pub online: bool,
    /// Routing participation for this instance. Overrides whatever the
    /// persisted profile recorded.
    pub routing: RoutingMode,
}

impl NodeOptions {
    /// A full network participant: the long-lived daemon node. Always a
    /// routing participant; this is a policy of the spawner, not a knob.
    pub fn online() -> Self {
        Self {
            online: true,
            routing: RoutingMode::Participant,
        }
    }

    /// A transient offline node used during provisioning: storage and
    /// naming operations only, no listeners, no dials.
    pub fn offline() -> Self {
        Self {
            online: false,
            routing: RoutingMode::Client,
        }
    }
}

enum Command {
    Connect {
        target: PeerTarget,
        reply: oneshot::Sender<Result<()>>,
    },
    ConnectedPeers {
        reply: oneshot::Sender<Vec<PeerId>>,
    },
    ListenAddrs {
        reply: oneshot::Sender<Vec<Multiaddr>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// A running node bound to an opened repository.
pub struct Node {
    identity: Identity,
    repo: Repo,
    commands: Option<mpsc::Sender<Command>>,
    driver: Option<JoinHandle<()>>,
}

impl Node {
    /// Opens the swarm (when online) and returns the capability handle.
    pub async fn spawn(repo: Repo, options: NodeOptions) -> Result<Self> {
        let identity = repo.config().identity()?;
        info!(
            peer_id = %identity.peer_id,
            online = options.online,
            "constructing node"
        );

        if !options.online {
            return Ok(Self {
                identity,
                repo,
                commands: None,
                driver: None,
            });
        }

        let behaviour = NodeBehaviour::new(&identity, options.routing)?;
        let mut swarm = SwarmBuilder::with_existing_identity(identity.p2p_keypair.clone())
            .with_tokio()
            .with_tcp(
                tcp::Config::default(),
                noise::Config::new,
                yamux::Config::default,
            )
            .map_err(|e| Error::Construction(format!("transport setup failed: {e}")))?
            .with_behaviour(|_| behaviour)
            .map_err(|e| Error::Construction(format!("behaviour setup failed: {e}")))?
            .with_swarm_config(|cfg| cfg.with_idle_connection_timeout(IDLE_CONNECTION_TIMEOUT))
            .build();

        let listen_addr = &repo.config().network.listen_addr;
        let listen: Multiaddr = listen_addr.parse().map_err(|e: libp2p::multiaddr::Error| {
            Error::Config(format!("invalid listen address {listen_addr}: {e}"))
        })?;
        swarm
            .listen_on(listen)
            .map_err(|e| Error::Construction(format!("failed to bind listener: {e}")))?;

        if let Some(external) = &repo.config().network.external_address {
            let addr: Multiaddr = external.parse().map_err(|e: libp2p::multiaddr::Error| {
                Error::Config(format!("invalid external address {external}: {e}"))
            })?;
            swarm.add_external_address(addr);
        }

        // Wait for the listener before handing the swarm to the driver so
        // a bind failure surfaces as a spawn failure, not a late log line.
        let first_listen = tokio::time::timeout(LISTEN_TIMEOUT, async {
            loop {
                match swarm.select_next_some().await {
                    SwarmEvent::NewListenAddr { address, .. } => break Ok(address),
                    SwarmEvent::ListenerError { error, .. } => {
                        break Err(Error::Construction(format!("listener error: {error}")))
                    }
                    SwarmEvent::ListenerClosed { reason, .. } => {
                        break Err(Error::Construction(format!(
                            "listener closed during startup: {reason:?}"
                        )))
                    }
                    other => trace!(event = ?other, "swarm event during startup"),
                }
            }
        })
        .await
        .map_err(|_| Error::Construction("timed out waiting for the network listener".to_string()))??;
        info!(address = %first_listen, "node listening");

        let (commands, command_rx) = mpsc::channel(32);
        let driver = tokio::spawn(drive_swarm(swarm, command_rx, vec![first_listen]));

        Ok(Self {
            identity,
            repo,
            commands: Some(commands),
            driver: Some(driver),
        })
    }

    pub fn peer_id(&self) -> PeerId {
        self.identity.peer_id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn repo(&self) -> &Repo {
        &self.repo
    }

    /// Dials a peer target, succeeding once any of its addresses yields an
    /// established connection. Dialing an already-connected peer succeeds
    /// immediately.
    pub async fn connect(&self, target: PeerTarget) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send_command(Command::Connect { target, reply }).await?;
        rx.await
            .map_err(|_| Error::Construction("node driver dropped the dial".to_string()))?
    }

    /// Peers with at least one live connection.
    pub async fn connected_peers(&self) -> Result<Vec<PeerId>> {
        let (reply, rx) = oneshot::channel();
        self.send_command(Command::ConnectedPeers { reply }).await?;
        rx.await
            .map_err(|_| Error::Construction("node driver stopped".to_string()))
    }

    /// Addresses the node is currently listening on.
    pub async fn listen_addrs(&self) -> Result<Vec<Multiaddr>> {
        let (reply, rx) = oneshot::channel();
        self.send_command(Command::ListenAddrs { reply }).await?;
        rx.await
            .map_err(|_| Error::Construction("node driver stopped".to_string()))
    }

    /// Seeds the introductory documents into this node's repository and
    /// reports the resulting content address to `out`.
    pub fn seed_default_assets(&self, out: &mut dyn Write) -> Result<ContentAddress> {
        assets::seed_default_assets(&self.repo, out)
    }

    /// Initializes the naming keyspace for this node's identity: an empty
    /// root manifest plus a sequence-zero publish record, so the node can
    /// later publish name updates.
    pub fn init_name_keyspace(&self) -> Result<()> {
        let empty_root = serde_json::to_vec(&BTreeMap::<String, ContentAddress>::new())?;
        let value = self.repo.put_block(&empty_root)?;
        let record = NameRecord { value, sequence: 0 };
        self.repo.write_name_record(&self.identity.peer_id, &record)?;
        debug!(peer_id = %self.identity.peer_id, "naming keyspace initialized");
        Ok(())
    }

    /// Shuts the node down, stopping the swarm driver. Offline nodes close
    /// trivially.
    pub async fn close(mut self) -> Result<()> {
        if let Some(commands) = self.commands.take() {
            let (reply, rx) = oneshot::channel();
            if commands.send(Command::Shutdown { reply }).await.is_ok() {
                let _ = rx.await;
            }
        }
        if let Some(driver) = self.driver.take() {
            driver
                .await
                .map_err(|e| Error::Construction(format!("swarm driver task failed: {e}")))?;
        }
        Ok(())
    }

    async fn send_command(&self, command: Command) -> Result<()> {
        let commands = self.commands.as_ref().ok_or_else(|| {
            Error::Construction("peer operations require an online node".to_string())
        })?;
        commands
            .send(command)
            .await
            .map_err(|_| Error::Construction("node driver stopped".to_string()))
    }
}

async fn drive_swarm(
    mut swarm: Swarm<NodeBehaviour>,
    mut commands: mpsc::Receiver<Command>,
    mut listen_addrs: Vec<Multiaddr>,
) {
    let mut pending_dials: HashMap<PeerId, Vec<oneshot::Sender<Result<()>>>> = HashMap::new();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                None => break,
                Some(Command::Connect { target, reply }) => {
                    handle_connect(&mut swarm, &mut pending_dials, target, reply);
                }
                Some(Command::ConnectedPeers { reply }) => {
                    let _ = reply.send(swarm.connected_peers().copied().collect());
                }
                Some(Command::ListenAddrs { reply }) => {
                    let _ = reply.send(listen_addrs.clone());
                }
                Some(Command::Shutdown { reply }) => {
                    let _ = reply.send(());
                    break;
                }
            },
            event = swarm.select_next_some() => match event {
                SwarmEvent::NewListenAddr { address, .. } => {
                    info!(address = %address, "listening");
                    listen_addrs.push(address);
                }
                SwarmEvent::ConnectionEstablished { peer_id, endpoint, .. } => {
                    debug!(peer = %peer_id, address = %endpoint.get_remote_address(), "connection established");
                    // Feed the confirmed address into the routing table.
                    swarm
                        .behaviour_mut()
                        .kademlia
                        .add_address(&peer_id, endpoint.get_remote_address().clone());
                    if let Some(waiters) = pending_dials.remove(&peer_id) {
                        for waiter in waiters {
                            let _ = waiter.send(Ok(()));
                        }
                    }
                }
                SwarmEvent::OutgoingConnectionError { peer_id: Some(peer_id), error, .. } => {
                    if let Some(waiters) = pending_dials.remove(&peer_id) {
                        for waiter in waiters {
                            let _ = waiter.send(Err(Error::Dial {
                                peer: peer_id.to_string(),
                                reason: error.to_string(),
                            }));
                        }
                    }
                }
                SwarmEvent::ConnectionClosed { peer_id, cause, .. } => {
                    debug!(peer = %peer_id, cause = ?cause, "connection closed");
                }
                SwarmEvent::Behaviour(NodeEvent::Kademlia(event)) => {
                    trace!(event = ?event, "kademlia event");
                }
                SwarmEvent::Behaviour(NodeEvent::Ping(event)) => {
                    trace!(event = ?event, "ping event");
                }
                _ => {}
            }
        }
    }

    // Abandoned dials get an explicit answer instead of a dropped channel.
    for (peer_id, waiters) in pending_dials {
        for waiter in waiters {
            let _ = waiter.send(Err(Error::Dial {
                peer: peer_id.to_string(),
                reason: "node shut down before the dial completed".to_string(),
            }));
        }
    }
    debug!("swarm driver stopped");
}

fn handle_connect(
    swarm: &mut Swarm<NodeBehaviour>,
    pending_dials: &mut HashMap<PeerId, Vec<oneshot::Sender<Result<()>>>>,
    target: PeerTarget,
    reply: oneshot::Sender<Result<()>>,
) {
    let peer_id = target.peer_id;
    if swarm.is_connected(&peer_id) {
        let _ = reply.send(Ok(()));
        return;
    }

    for addr in &target.addrs {
        swarm
            .behaviour_mut()
            .kademlia
            .add_address(&peer_id, addr.clone());
    }

    let opts = DialOpts::peer_id(peer_id).addresses(target.addrs).build();
    match swarm.dial(opts) {
        Ok(()) => {
            pending_dials.entry(peer_id).or_default().push(reply);
        }
        Err(e) => {
            warn!(peer = %peer_id, error = %e, "dial rejected by swarm");
            let _ = reply.send(Err(Error::Dial {
                peer: peer_id.to_string(),
                reason: e.to_string(),
            }));
        }
    }
}
