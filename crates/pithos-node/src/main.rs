//! Daemon for the Pithos private storage network.
//!
//! Brings the local node up (provisioning the repository on first run),
//! dials the bootstrap peer set, and keeps the node online until
//! interrupted.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::signal;
use tracing::{error, info};

use pithos_core::{connect_all, ProfileRegistry};
use pithos_node::{bootstrap, default_repo_root, BootstrapOpts, DEFAULT_BOOTSTRAP_PEERS, DEFAULT_PROFILES};

/// Command-line arguments for the Pithos daemon
#[derive(Parser, Debug)]
#[command(author, version, about = "Node daemon for the Pithos private storage network")]
struct Args {
    /// Repository root (defaults to the platform data directory)
    #[arg(long, env = "PITHOS_REPO")]
    repo: Option<PathBuf>,

    /// Bootstrap peer multiaddrs, overriding the built-in set
    #[arg(long = "bootstrap-peer", env = "PITHOS_BOOTSTRAP_PEERS", value_delimiter = ',')]
    bootstrap_peers: Vec<String>,

    /// Profiles applied when a fresh repository is provisioned
    #[arg(long, default_value = DEFAULT_PROFILES, env = "PITHOS_PROFILES")]
    profiles: String,

    /// Skip seeding the introductory documents during provisioning
    #[arg(long, env = "PITHOS_SKIP_DEFAULT_ASSETS")]
    skip_default_assets: bool,

    /// Enable debug logging
    #[arg(short = 'd', long, env = "PITHOS_DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(log_level.parse()?)
                .add_directive("libp2p=info".parse()?),
        )
        .init();

    info!("deploying pithos node");

    let repo_root = match args.repo {
        Some(path) => path,
        None => default_repo_root()?,
    };
    let registry = ProfileRegistry::builtin();
    let opts = BootstrapOpts {
        profiles: args.profiles,
        skip_default_assets: args.skip_default_assets,
        ..BootstrapOpts::default()
    };

    let node = match bootstrap(&repo_root, &registry, &opts).await {
        Ok(node) => node,
        Err(e) => {
            error!(error = %e, path = %repo_root.display(), "node bootstrap failed");
            return Err(e.into());
        }
    };
    info!(peer_id = %node.peer_id(), "node initialization complete");

    let peer_list: Vec<String> = if args.bootstrap_peers.is_empty() {
        DEFAULT_BOOTSTRAP_PEERS.iter().map(|s| s.to_string()).collect()
    } else {
        args.bootstrap_peers
    };

    let interrupted = tokio::select! {
        outcomes = connect_all(&node, &peer_list) => {
            let outcomes = outcomes?;
            let connected = outcomes.iter().filter(|o| o.result.is_ok()).count();
            info!(connected, attempted = outcomes.len(), "bootstrap peer dialing finished");
            false
        }
        _ = signal::ctrl_c() => {
            info!("interrupted during peer bootstrap");
            true
        }
    };

    if !interrupted {
        signal::ctrl_c().await?;
    }
    info!("shutting down");
    node.close().await?;
    Ok(())
}
