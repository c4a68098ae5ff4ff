//! # Pithos Core
//!
//! This crate provides the foundational functionality for Pithos, a private
//! content-addressed peer-to-peer storage network: bringing a local node
//! from "no local state" to "running, connected, routable" exactly once,
//! recovering deterministically from half-initialized state, and joining a
//! known peer set without letting any single unreachable peer stall
//! startup.
//!
//! ## Core Components
//!
//! ### Identity Management ([`identity`])
//!
//! A unified cryptographic identity per node:
//! - secp256k1 key pair generation and management
//! - P2P network identity (PeerId) derivation
//! - EVM-compatible address generation from the same secret
//!
//! ### Configuration ([`config`] and [`profile`])
//!
//! The persisted node configuration and the named transforms ("profiles")
//! applied to it during provisioning:
//! - TOML-persisted identity material and network tunables
//! - an explicit profile registry with `lowpower`, `server`, and `test`
//!   presets, applied in caller-given order
//!
//! ### Repository ([`repo`])
//!
//! The on-disk state of a node:
//! - writability checking for candidate repository roots
//! - the initialized-repository guard that refuses to overwrite node keys
//! - content-addressed block storage and per-identity publish records
//! - the shared-secret file gating membership in the private network
//!
//! ### Provisioning ([`provision`])
//!
//! The one-time initialization state machine: key generation, profile
//! application, persistence, default content seeding, shared-secret
//! provisioning, and naming keyspace setup, in a strict order that is safe
//! to re-run.
//!
//! ### Node ([`node`] and [`network`])
//!
//! The running node instance: a libp2p swarm (Kademlia DHT plus ping)
//! driven by a background task, exposed through an owned capability handle
//! for peer, storage, and naming operations.
//!
//! ### Peer Bootstrap ([`peers`])
//!
//! Resolving peer address lists into deduplicated dial targets and dialing
//! them concurrently, tolerating partial connectivity.
//!
//! ## Usage Examples
//!
//! ### Provision and run a node
//!
//! ```rust,no_run
//! use pithos_core::{
//!     initialize, connect_all, Node, NodeOptions, ProfileRegistry, Repo,
//!     DEFAULT_KEY_BITS,
//! };
//! use std::path::Path;
//!
//! # async fn run() -> pithos_core::Result<()> {
//! let registry = ProfileRegistry::builtin();
//! let root = Path::new("/var/lib/pithos");
//!
//! let mut out = std::io::stdout();
//! initialize(&mut out, root, false, DEFAULT_KEY_BITS, "lowpower", None, &registry).await?;
//!
//! let node = Node::spawn(Repo::open(root)?, NodeOptions::online()).await?;
//! let outcomes = connect_all(&node, &[
//!     "/ip4/203.0.113.5/tcp/4501/p2p/QmeG81bELkgLBZFYZc53ioxtvRS8iNVzPqxUBKSuah2rcQ".to_string(),
//! ]).await?;
//! # let _ = outcomes;
//! # Ok(())
//! # }
//! ```

pub mod assets;
pub mod config;
pub mod error;
pub mod identity;
pub mod network;
pub mod node;
pub mod peers;
pub mod profile;
pub mod provision;
pub mod repo;

pub use config::{NodeConfig, RoutingMode, DEFAULT_KEY_BITS};
pub use error::{Error, Result};
pub use identity::Identity;
pub use network::{NodeBehaviour, NodeEvent};
pub use node::{Node, NodeOptions};
pub use peers::{connect_all, parse_peer_addrs, DialOutcome, PeerTarget};
pub use profile::{apply_profiles, ProfileRegistry};
pub use provision::initialize;
pub use repo::{ContentAddress, NameRecord, Repo};

// Re-export commonly used types
pub use libp2p::{Multiaddr, PeerId};
