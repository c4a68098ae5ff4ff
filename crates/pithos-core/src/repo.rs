//! Repository persistence: the on-disk identity and configuration state of
//! a node, plus the minimal block and naming stores behind the node's
//! capability surface.
//!
//! Layout under the repository root:
//!
//! ```text
//! <root>/config.toml    persisted configuration (identity material inside)
//! <root>/swarm.key      pre-shared secret gating the private network
//! <root>/blocks/        content-addressed block files
//! <root>/names/         per-identity publish records
//! ```
//!
//! A repository counts as initialized once `config.toml` exists, so that
//! file is always written last during initialization.

use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use alloy::primitives::keccak256;
use libp2p::PeerId;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::NodeConfig;
use crate::error::{Error, Result};

/// Configuration file name inside the repository root. Its presence marks
/// the repository as initialized.
pub const CONFIG_FILE: &str = "config.toml";

/// Shared-secret file name inside the repository root.
pub const SWARM_KEY_FILE: &str = "swarm.key";

/// Block store directory inside the repository root.
pub const BLOCKS_DIR: &str = "blocks";

/// Naming store directory inside the repository root.
pub const NAMES_DIR: &str = "names";

/// Name of the temporary file used to probe directory writability.
const WRITE_PROBE_FILE: &str = ".write-probe";

/// The pre-shared secret of the private network, hex-encoded. Every member
/// node carries the same value; a node without it cannot join the swarm.
pub const SWARM_KEY_HEX: &str = "9c4e1f0db26a7e5340f6f4a2f1b858cf1d3c2e903db29a741c1f0d8558c6aa21";

/// Version line of the pre-shared-key scheme written to `swarm.key`.
pub const SWARM_KEY_SCHEME: &str = "/key/swarm/psk/1.0.0/";

/// The address of a stored block: the hex-encoded keccak-256 digest of its
/// bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentAddress(String);

impl ContentAddress {
    /// Computes the address of the given bytes.
    pub fn of(bytes: &[u8]) -> Self {
        Self(hex::encode(keccak256(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A mutable name-to-content binding published under a peer identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameRecord {
    /// Content address the name currently points at.
    pub value: ContentAddress,
    /// Monotonic publish sequence number.
    pub sequence: u64,
}

/// Verifies that `dir` is usable as a repository root, creating it when
/// absent.
///
/// An existing directory is probed with a create-then-remove temp file;
/// the probe never survives a successful check. A missing directory is
/// created non-recursively so a typoed parent path fails instead of being
/// silently materialized.
pub fn ensure_writable(dir: &Path) -> Result<()> {
    match fs::metadata(dir) {
        Ok(_) => {
            let probe = dir.join(WRITE_PROBE_FILE);
            match fs::File::create(&probe) {
                Ok(file) => {
                    drop(file);
                    fs::remove_file(&probe).map_err(|e| Error::UnexpectedIo {
                        path: dir.to_path_buf(),
                        source: e,
                    })
                }
                Err(e) if e.kind() == ErrorKind::PermissionDenied => {
                    Err(Error::PermissionDenied {
                        path: dir.to_path_buf(),
                    })
                }
                Err(e) => Err(Error::UnexpectedIo {
                    path: dir.to_path_buf(),
                    source: e,
                }),
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            fs::create_dir(dir).map_err(Error::Io)
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(Error::PermissionDenied {
            path: dir.to_path_buf(),
        }),
        Err(e) => Err(Error::UnexpectedIo {
            path: dir.to_path_buf(),
            source: e,
        }),
    }
}

/// Writes the shared-secret file into the repository root.
pub fn write_swarm_key(root: &Path) -> Result<()> {
    let payload = format!("{SWARM_KEY_SCHEME}\n/base16/\n{SWARM_KEY_HEX}");
    fs::write(root.join(SWARM_KEY_FILE), payload)?;
    Ok(())
}

/// Whether the repository root carries the shared-secret file.
pub fn has_swarm_key(root: &Path) -> bool {
    root.join(SWARM_KEY_FILE).is_file()
}

/// An opened repository: root path plus the loaded configuration.
#[derive(Debug, Clone)]
pub struct Repo {
    root: PathBuf,
    config: NodeConfig,
}

impl Repo {
    /// Whether an initialized repository exists at `root`.
    pub fn is_initialized(root: &Path) -> bool {
        root.join(CONFIG_FILE).is_file()
    }

    /// Initializes a repository at `root` with the given configuration.
    ///
    /// Refuses to touch an already-initialized repository: the persisted
    /// private key is the node's identity, and overwriting it would
    /// silently discard that identity.
    pub fn init(root: &Path, config: &NodeConfig) -> Result<()> {
        if Self::is_initialized(root) {
            return Err(Error::RepoExists {
                path: root.to_path_buf(),
            });
        }

        fs::create_dir_all(root)?;
        fs::create_dir_all(root.join(BLOCKS_DIR))?;
        fs::create_dir_all(root.join(NAMES_DIR))?;

        // The marker file goes last: a repository is only "initialized"
        // once everything it depends on is durable.
        fs::write(root.join(CONFIG_FILE), config.to_toml()?)?;
        debug!(path = %root.display(), "repository persisted");
        Ok(())
    }

    /// Opens the repository at `root`, loading and validating its
    /// configuration.
    pub fn open(root: &Path) -> Result<Self> {
        if !Self::is_initialized(root) {
            return Err(Error::RepoNotFound {
                path: root.to_path_buf(),
            });
        }

        let raw = fs::read_to_string(root.join(CONFIG_FILE))?;
        let config = NodeConfig::from_toml(&raw)?;
        // Fail here rather than at spawn time if the key material is bad.
        config.identity()?;

        Ok(Self {
            root: root.to_path_buf(),
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Stores a block, returning its content address. Storing the same
    /// bytes twice is a no-op yielding the same address.
    pub fn put_block(&self, bytes: &[u8]) -> Result<ContentAddress> {
        let address = ContentAddress::of(bytes);
        let path = self.root.join(BLOCKS_DIR).join(address.as_str());
        if !path.exists() {
            fs::write(&path, bytes)?;
        }
        Ok(address)
    }

    /// Reads a block back by address.
    pub fn get_block(&self, address: &ContentAddress) -> Result<Vec<u8>> {
        let path = self.root.join(BLOCKS_DIR).join(address.as_str());
        fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::Other(format!("block {address} not found")),
            _ => Error::Io(e),
        })
    }

    /// Whether a block with the given address is stored.
    pub fn has_block(&self, address: &ContentAddress) -> bool {
        self.root.join(BLOCKS_DIR).join(address.as_str()).is_file()
    }

    /// Writes the publish record for a peer identity, replacing any
    /// previous record.
    pub fn write_name_record(&self, peer_id: &PeerId, record: &NameRecord) -> Result<()> {
        let path = self.name_record_path(peer_id);
        fs::write(&path, serde_json::to_vec_pretty(record)?)?;
        Ok(())
    }

    /// Reads the publish record for a peer identity, if one exists.
    pub fn read_name_record(&self, peer_id: &PeerId) -> Result<Option<NameRecord>> {
        let path = self.name_record_path(peer_id);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    fn name_record_path(&self, peer_id: &PeerId) -> PathBuf {
        self.root.join(NAMES_DIR).join(format!("{peer_id}.json"))
    }
}
