//! Introductory documents seeded into a freshly provisioned repository.

use std::collections::BTreeMap;
use std::io::Write;

use tracing::info;

use crate::error::Result;
use crate::repo::{ContentAddress, Repo};

const README: &str = "\
Welcome to Pithos.

This node is a member of a private, content-addressed storage network.
Everything stored here is addressed by the digest of its bytes, so a
piece of content keeps the same address on every node that holds it.

The documents next to this one cover the basics:

  quick-start      first commands to run against a fresh node
  security-notes   what the files in this repository mean for key safety
";

const QUICK_START: &str = "\
Quick start

Your node came up with a fresh identity and joined the network using the
built-in bootstrap peers. Useful first steps:

  pithos-node --debug      rerun the daemon with verbose logging
  cat config.toml          inspect the persisted node configuration

The repository directory holds your node's private key. Back it up;
losing it means losing this node's identity and published names.
";

const SECURITY_NOTES: &str = "\
Security notes

config.toml contains the node's private key in hex. Anyone holding that
key can impersonate this node on the network and publish under its name.

swarm.key is the pre-shared secret of the private network. It is the
same on every member node and gates who may join the swarm. Do not
publish it outside the deployment.
";

/// The documents seeded by default: stable names mapped to their bodies.
pub const DEFAULT_ASSETS: &[(&str, &str)] = &[
    ("readme", README),
    ("quick-start", QUICK_START),
    ("security-notes", SECURITY_NOTES),
];

/// Stores the default documents in the repository's block store, writes a
/// manifest block mapping document names to their addresses, and returns
/// the manifest's address. A pointer for the operator goes to `out`.
pub fn seed_default_assets(repo: &Repo, out: &mut dyn Write) -> Result<ContentAddress> {
    let mut manifest: BTreeMap<&str, ContentAddress> = BTreeMap::new();
    for (name, body) in DEFAULT_ASSETS.iter().copied() {
        let address = repo.put_block(body.as_bytes())?;
        manifest.insert(name, address);
    }

    let manifest_bytes = serde_json::to_vec_pretty(&manifest)?;
    let address = repo.put_block(&manifest_bytes)?;
    info!(address = %address, "seeded introductory documents");

    writeln!(out, "to get started, enter:")?;
    writeln!(out, "\n\tpithos cat /pithos/{address}/readme\n")?;
    Ok(address)
}
