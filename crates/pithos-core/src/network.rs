//! Network behaviour for Pithos nodes.
//!
//! The composite libp2p NetworkBehaviour combines the Kademlia DHT (peer
//! routing) with ping (connection liveness). Whether Kademlia runs in
//! server or client mode is decided per node instance by the spawner, not
//! by the behaviour itself.

use std::time::Duration;

use libp2p::{
    kad::{self, store::MemoryStore},
    ping,
    swarm::NetworkBehaviour,
};

use crate::config::RoutingMode;
use crate::error::Result;
use crate::identity::Identity;

/// The custom event type that the behaviour emits to the swarm owner.
#[derive(Debug)]
pub enum NodeEvent {
    Kademlia(kad::Event),
    Ping(ping::Event),
}

impl From<kad::Event> for NodeEvent {
    fn from(event: kad::Event) -> Self {
        NodeEvent::Kademlia(event)
    }
}

impl From<ping::Event> for NodeEvent {
    fn from(event: ping::Event) -> Self {
        NodeEvent::Ping(event)
    }
}

/// The main network behaviour struct combining all protocols.
#[derive(NetworkBehaviour)]
#[behaviour(to_swarm = "NodeEvent")]
pub struct NodeBehaviour {
    /// Kademlia DHT for peer routing.
    pub kademlia: kad::Behaviour<MemoryStore>,

    /// Ping for connection liveness.
    pub ping: ping::Behaviour,
}

impl NodeBehaviour {
    /// Creates the behaviour for the given identity and routing mode.
    pub fn new(identity: &Identity, routing: RoutingMode) -> Result<Self> {
        let peer_id = identity.peer_id;

        let mut kad_config = kad::Config::default();
        kad_config.set_query_timeout(Duration::from_secs(60));

        let store = MemoryStore::new(peer_id);
        let mut kademlia = kad::Behaviour::with_config(peer_id, store, kad_config);
        kademlia.set_mode(Some(match routing {
            RoutingMode::Participant => kad::Mode::Server,
            RoutingMode::Client => kad::Mode::Client,
        }));

        let ping = ping::Behaviour::new(ping::Config::new());

        Ok(Self { kademlia, ping })
    }
}
