//! First-time repository provisioning.
//!
//! [`initialize`] takes a path from "no local state" to a fully provisioned
//! repository in one strictly ordered pass: writability check, refuse-to-
//! overwrite guard, key generation, profile application, persistence,
//! default content seeding, shared-secret write, naming keyspace setup.
//!
//! The function is safe to call repeatedly. Nothing is cleaned up on an
//! intermediate failure; instead, the already-initialized guard decides
//! what a re-run may touch. A failure before persistence leaves at most an
//! empty directory and the next run simply starts over. A failure after
//! persistence leaves a repository that refuses re-initialization, which
//! protects the generated keys but strands the partial state; that
//! asymmetry is accepted and documented rather than papered over with a
//! resumability marker.

use std::io::Write;
use std::path::Path;

use tracing::{error, info};

use crate::config::NodeConfig;
use crate::error::{Error, Result};
use crate::node::{Node, NodeOptions};
use crate::profile::{resolve_profiles, ProfileRegistry};
use crate::repo::{self, Repo};

/// Provisions the repository at `repo_root`.
///
/// Progress and operator-facing pointers go to `out`; a failure to write
/// there is fatal because it means the output channel itself is broken.
/// `existing_config` skips key generation and uses the supplied
/// configuration verbatim (profiles still apply to it). `key_bits` is the
/// requested identity key strength for generated configurations.
///
/// Calling this on an already-initialized repository fails with
/// [`Error::RepoExists`] before anything is touched: re-initialization
/// would overwrite the node's keys.
pub async fn initialize(
    out: &mut (dyn Write + Send),
    repo_root: &Path,
    skip_default_assets: bool,
    key_bits: u32,
    profiles: &str,
    existing_config: Option<NodeConfig>,
    registry: &ProfileRegistry,
) -> Result<()> {
    writeln!(out, "initializing pithos node at {}", repo_root.display())?;

    // Resolve profile names up front: a typoed profile must fail before
    // the filesystem is touched, let alone before any transform runs.
    let transforms = resolve_profiles(registry, profiles)?;

    repo::ensure_writable(repo_root)?;

    if Repo::is_initialized(repo_root) {
        return Err(Error::RepoExists {
            path: repo_root.to_path_buf(),
        });
    }

    let mut config = match existing_config {
        Some(config) => config,
        None => NodeConfig::generate(key_bits)?,
    };

    for (name, transform) in transforms {
        transform(&mut config).map_err(|e| Error::Profile(format!("profile {name}: {e}")))?;
    }

    Repo::init(repo_root, &config)?;

    if !skip_default_assets {
        let node = Node::spawn(Repo::open(repo_root)?, NodeOptions::offline()).await?;
        node.seed_default_assets(out)?;
        node.close().await?;
    }

    // A repository without the shared secret joins nothing, and it fails
    // silently much later instead of here. Make this failure loud.
    if let Err(e) = repo::write_swarm_key(repo_root) {
        error!(error = %e, path = %repo_root.display(), "failed to write the shared network secret");
        return Err(e);
    }
    info!("swarm key created");

    let node = Node::spawn(Repo::open(repo_root)?, NodeOptions::offline()).await?;
    node.init_name_keyspace()?;
    node.close().await?;

    info!(path = %repo_root.display(), "repository provisioned");
    Ok(())
}
