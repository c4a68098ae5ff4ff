//! Bootstrap orchestration for the Pithos daemon.
//!
//! The orchestrator owns the top-level sequencing: open the node from the
//! default repository location; when that fails, provision the repository
//! and retry the spawn exactly once. Provisioning failure is unrecoverable
//! for the daemon, and a second consecutive spawn failure is treated the
//! same way. The retry is bounded rather than recursive, since a spawn
//! failure that provisioning cannot fix (the repository now exists) would
//! otherwise loop forever.

use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::{info, warn};

use pithos_core::{
    initialize, Error, Node, NodeOptions, ProfileRegistry, Repo, Result, DEFAULT_KEY_BITS,
};

/// Profiles applied when the orchestrator provisions a fresh repository.
pub const DEFAULT_PROFILES: &str = "lowpower";

/// The built-in bootstrap peer set, dialed on every startup unless the
/// operator overrides it.
pub const DEFAULT_BOOTSTRAP_PEERS: &[&str] = &[
    "/ip4/95.217.134.70/tcp/4501/p2p/QmeG81bELkgLBZFYZc53ioxtvRS8iNVzPqxUBKSuah2rcQ",
    "/ip4/65.108.201.13/tcp/4501/p2p/QmRYw68MzD4jPvner913mLWBdFfpPfNUx8SRFjiUCJNA4f",
    "/ip4/51.38.131.241/tcp/4501/p2p/QmaGGSUqoFpv6wuqvNKNBsxDParVuGgV3n3iPs2eVWeSN4",
    "/ip4/135.181.112.94/tcp/4501/p2p/QmRwQ49Zknc2dQbywrhT8ArMDS9JdmnEyGGy4mZ1wDkgaX",
    "/ip4/51.77.150.202/tcp/4501/p2p/QmUEy4ScCYCgP6GRfVgrLDqXfLXnUUh4eKaS1fDgaCoGQJ",
];

/// Provisioning defaults used when the orchestrator has to initialize a
/// fresh repository.
#[derive(Debug, Clone)]
pub struct BootstrapOpts {
    /// Comma-separated profile list applied during provisioning.
    pub profiles: String,
    /// Skip seeding the introductory documents.
    pub skip_default_assets: bool,
    /// Requested identity key strength.
    pub key_bits: u32,
}

impl Default for BootstrapOpts {
    fn default() -> Self {
        Self {
            profiles: DEFAULT_PROFILES.to_string(),
            skip_default_assets: false,
            key_bits: DEFAULT_KEY_BITS,
        }
    }
}

/// The canonical repository location for this user and platform.
pub fn default_repo_root() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("network", "pithos", "pithos").ok_or_else(|| {
        Error::Config("unable to determine a data directory for the default repository".to_string())
    })?;
    Ok(dirs.data_dir().to_path_buf())
}

/// Brings up the node at `repo_root`, provisioning the repository first if
/// it does not exist yet.
///
/// The first spawn failure is expected on a fresh machine and drives the
/// provisioning path; it is not surfaced unless provisioning (or the one
/// retried spawn) also fails.
pub async fn bootstrap(
    repo_root: &Path,
    registry: &ProfileRegistry,
    opts: &BootstrapOpts,
) -> Result<Node> {
    match spawn_at(repo_root).await {
        Ok(node) => Ok(node),
        Err(spawn_err) => {
            warn!(
                error = %spawn_err,
                path = %repo_root.display(),
                "unable to open node repository, provisioning a fresh one"
            );
            let mut out = io::stdout();
            initialize(
                &mut out,
                repo_root,
                opts.skip_default_assets,
                opts.key_bits,
                &opts.profiles,
                None,
                registry,
            )
            .await?;

            info!("repository provisioned, retrying node deployment");
            spawn_at(repo_root).await
        }
    }
}

async fn spawn_at(repo_root: &Path) -> Result<Node> {
    let repo = Repo::open(repo_root)?;
    Node::spawn(repo, NodeOptions::online()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use pithos_core::{parse_peer_addrs, NodeConfig};
    use tempfile::tempdir;

    fn test_opts() -> BootstrapOpts {
        BootstrapOpts {
            // The test profile moves the listener to a loopback port the
            // OS assigns, so parallel tests never fight over a port.
            profiles: format!("{DEFAULT_PROFILES},test"),
            ..BootstrapOpts::default()
        }
    }

    #[test]
    fn test_default_bootstrap_peers_are_well_formed() {
        let addrs: Vec<String> = DEFAULT_BOOTSTRAP_PEERS.iter().map(|s| s.to_string()).collect();
        let targets = parse_peer_addrs(&addrs).unwrap();

        // One target per entry: the built-in set has no duplicate peers.
        assert_eq!(targets.len(), DEFAULT_BOOTSTRAP_PEERS.len());
    }

    #[test]
    fn test_default_opts() {
        let opts = BootstrapOpts::default();
        assert_eq!(opts.profiles, "lowpower");
        assert!(!opts.skip_default_assets);
        assert_eq!(opts.key_bits, DEFAULT_KEY_BITS);
    }

    #[tokio::test]
    async fn test_bootstrap_provisions_fresh_repository() {
        let parent = tempdir().unwrap();
        let root = parent.path().join("repo");
        let registry = ProfileRegistry::builtin();

        let node = bootstrap(&root, &registry, &test_opts()).await.unwrap();

        assert!(Repo::is_initialized(&root));
        assert!(pithos_core::repo::has_swarm_key(&root));
        assert!(!node.listen_addrs().await.unwrap().is_empty());
        node.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_bootstrap_reuses_existing_repository() {
        let parent = tempdir().unwrap();
        let root = parent.path().join("repo");
        let registry = ProfileRegistry::builtin();

        let node1 = bootstrap(&root, &registry, &test_opts()).await.unwrap();
        let peer_id = node1.peer_id();
        node1.close().await.unwrap();

        // Same repository, same identity: nothing was re-provisioned.
        let node2 = bootstrap(&root, &registry, &test_opts()).await.unwrap();
        assert_eq!(node2.peer_id(), peer_id);
        node2.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_bootstrap_gives_up_after_one_retry() {
        fn broken(config: &mut NodeConfig) -> pithos_core::Result<()> {
            config.network.listen_addr = "not-a-multiaddr".to_string();
            Ok(())
        }

        let parent = tempdir().unwrap();
        let root = parent.path().join("repo");
        let mut registry = ProfileRegistry::builtin();
        registry.register("broken", broken);

        let opts = BootstrapOpts {
            profiles: "broken".to_string(),
            ..BootstrapOpts::default()
        };

        // Provisioning succeeds but the retried spawn fails on the broken
        // listen address; bootstrap must report that instead of looping.
        let result = bootstrap(&root, &registry, &opts).await;
        assert!(result.is_err());
        assert!(Repo::is_initialized(&root));

        // A later bootstrap hits the already-initialized guard instead of
        // re-provisioning over the stranded repository.
        let second = bootstrap(&root, &registry, &opts).await;
        assert!(matches!(second, Err(Error::RepoExists { .. })));
    }

    #[test]
    fn test_default_repo_root_is_stable() {
        let a = default_repo_root().unwrap();
        let b = default_repo_root().unwrap();
        assert_eq!(a, b);
        assert!(a.to_string_lossy().contains("pithos"));
    }
}
