//! Node configuration: the identity material and tunable settings persisted
//! inside a repository.
//!
//! A repository holds exactly one configuration for its whole lifetime. The
//! private key inside it *is* the node's identity, which is why the
//! provisioning layer refuses to ever regenerate a configuration over an
//! existing one.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identity::{Identity, SECP256K1_KEY_BITS};

/// Default key strength requested when provisioning a fresh repository.
pub const DEFAULT_KEY_BITS: u32 = SECP256K1_KEY_BITS;

/// Default listen address for a production node.
pub const DEFAULT_LISTEN_ADDR: &str = "/ip4/0.0.0.0/tcp/4501";

/// How a node participates in routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutingMode {
    /// Full routing participant: stores and serves routing records.
    Participant,
    /// Client-only routing: queries records but never serves them.
    Client,
}

/// The persisted configuration of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub identity: IdentityConfig,
    pub network: NetworkConfig,
}

/// Identity material. The private key is hex-encoded in the configuration
/// file; `key_bits` records the strength that was requested at generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub private_key: String,
    pub key_bits: u32,
}

/// Tunable network settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Multiaddr the node listens on.
    pub listen_addr: String,

    /// External address to advertise (if behind NAT).
    pub external_address: Option<String>,

    /// Bootstrap peers recorded in the repository. The daemon's built-in
    /// list is used when this is empty.
    pub bootstrap_peers: Vec<String>,

    /// Connection manager low watermark.
    pub conn_low_water: u32,

    /// Connection manager high watermark.
    pub conn_high_water: u32,

    /// Grace period before new connections are eligible for trimming.
    pub conn_grace_period_secs: u64,

    /// Routing participation recorded by profiles. The spawner may override
    /// this per node instance.
    pub routing: RoutingMode,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            external_address: None,
            bootstrap_peers: Vec::new(),
            conn_low_water: 64,
            conn_high_water: 256,
            conn_grace_period_secs: 20,
            routing: RoutingMode::Participant,
        }
    }
}

impl NodeConfig {
    /// Generates a fresh configuration with a new identity of the requested
    /// key strength and default network settings.
    pub fn generate(key_bits: u32) -> Result<Self> {
        let identity = Identity::generate_checked(key_bits)?;
        Ok(Self {
            identity: IdentityConfig {
                private_key: identity.to_hex(),
                key_bits,
            },
            network: NetworkConfig::default(),
        })
    }

    /// Reconstructs the node identity from the stored private key.
    pub fn identity(&self) -> Result<Identity> {
        self.identity.private_key.parse()
    }

    /// Serializes the configuration to TOML for persistence.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("failed to encode configuration: {}", e)))
    }

    /// Parses a configuration from its persisted TOML form.
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw)
            .map_err(|e| Error::Config(format!("failed to parse configuration: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_produces_loadable_identity() {
        let config = NodeConfig::generate(DEFAULT_KEY_BITS).unwrap();
        let identity = config.identity().unwrap();

        assert_eq!(identity.to_hex(), config.identity.private_key);
        assert_eq!(config.identity.key_bits, SECP256K1_KEY_BITS);
    }

    #[test]
    fn test_generate_rejects_unsupported_key_bits() {
        assert!(NodeConfig::generate(2048).is_err());
    }

    #[test]
    fn test_network_defaults() {
        let network = NetworkConfig::default();

        assert_eq!(network.listen_addr, DEFAULT_LISTEN_ADDR);
        assert_eq!(network.external_address, None);
        assert!(network.bootstrap_peers.is_empty());
        assert!(network.conn_low_water < network.conn_high_water);
        assert_eq!(network.routing, RoutingMode::Participant);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = NodeConfig::generate(DEFAULT_KEY_BITS).unwrap();
        let encoded = config.to_toml().unwrap();
        let decoded = NodeConfig::from_toml(&encoded).unwrap();

        assert_eq!(config, decoded);
    }

    #[test]
    fn test_toml_round_trip_with_external_address() {
        let mut config = NodeConfig::generate(DEFAULT_KEY_BITS).unwrap();
        config.network.external_address = Some("/ip4/203.0.113.7/tcp/4501".to_string());
        config.network.bootstrap_peers = vec!["/ip4/203.0.113.8/tcp/4501".to_string()];

        let decoded = NodeConfig::from_toml(&config.to_toml().unwrap()).unwrap();
        assert_eq!(config, decoded);
    }

    #[test]
    fn test_routing_mode_serde_names() {
        let encoded = toml::to_string(&NodeConfig::generate(DEFAULT_KEY_BITS).unwrap()).unwrap();
        assert!(encoded.contains("routing = \"participant\""));
    }

    #[test]
    fn test_from_toml_rejects_garbage() {
        assert!(NodeConfig::from_toml("not even toml = [").is_err());
        assert!(NodeConfig::from_toml("[identity]\nprivate_key = \"abc\"").is_err());
    }

    #[test]
    fn test_identity_round_trip_preserves_peer_id() {
        let config = NodeConfig::generate(DEFAULT_KEY_BITS).unwrap();
        let id1 = config.identity().unwrap();
        let id2 = NodeConfig::from_toml(&config.to_toml().unwrap())
            .unwrap()
            .identity()
            .unwrap();

        assert_eq!(id1.peer_id, id2.peer_id);
        assert_eq!(id1.evm_address, id2.evm_address);
    }
}
