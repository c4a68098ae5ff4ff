//! Peer bootstrap: resolving peer address strings into dial targets and
//! dialing them all without letting any single peer stall the node.
//!
//! Parsing is strict: one malformed address aborts the whole batch before
//! any dial starts, because a bad address is a configuration bug. Dial
//! failures are the opposite: expected network weather, logged per peer
//! and never escalated into an aggregate error.

use std::collections::HashMap;
use std::time::Duration;

use futures::future::join_all;
use libp2p::{multiaddr::Protocol, Multiaddr, PeerId};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::node::Node;

/// Upper bound on a single dial attempt.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(30);

/// A peer identity together with its known set of reachable addresses.
///
/// Multiple address strings naming the same peer collapse into one target
/// so a multi-homed peer is dialed once, not once per address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerTarget {
    pub peer_id: PeerId,
    pub addrs: Vec<Multiaddr>,
}

/// The result of one peer dial.
#[derive(Debug)]
pub struct DialOutcome {
    pub peer_id: PeerId,
    pub result: Result<()>,
}

/// Parses peer address strings into dial targets.
///
/// Each string must be a multiaddr whose final component is
/// `/p2p/<peer-id>`. Targets come back in first-seen order, with duplicate
/// peer identities merged and duplicate addresses dropped.
pub fn parse_peer_addrs(addrs: &[String]) -> Result<Vec<PeerTarget>> {
    let mut targets: Vec<PeerTarget> = Vec::new();
    let mut index: HashMap<PeerId, usize> = HashMap::new();

    for raw in addrs {
        let mut addr: Multiaddr = raw.parse().map_err(|e: libp2p::multiaddr::Error| {
            Error::AddressParse {
                addr: raw.clone(),
                reason: e.to_string(),
            }
        })?;
        let peer_id = match addr.pop() {
            Some(Protocol::P2p(peer_id)) => peer_id,
            _ => {
                return Err(Error::AddressParse {
                    addr: raw.clone(),
                    reason: "missing /p2p/<peer-id> suffix".to_string(),
                })
            }
        };

        match index.get(&peer_id) {
            Some(&i) => {
                if !targets[i].addrs.contains(&addr) {
                    targets[i].addrs.push(addr);
                }
            }
            None => {
                index.insert(peer_id, targets.len());
                targets.push(PeerTarget {
                    peer_id,
                    addrs: vec![addr],
                });
            }
        }
    }

    Ok(targets)
}

/// Dials every peer in `addrs` concurrently and independently.
///
/// Returns after every dial attempt has completed. Per-peer outcomes are
/// logged and returned; partial connectivity is an expected result, so the
/// only error this function itself raises is a parse failure (which aborts
/// the batch with zero dials).
pub async fn connect_all(node: &Node, addrs: &[String]) -> Result<Vec<DialOutcome>> {
    let targets = parse_peer_addrs(addrs)?;
    debug!(targets = targets.len(), addresses = addrs.len(), "dialing bootstrap peers");

    let dials = targets.into_iter().map(|target| async move {
        let peer_id = target.peer_id;
        let result = match tokio::time::timeout(DIAL_TIMEOUT, node.connect(target)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Dial {
                peer: peer_id.to_string(),
                reason: format!("no answer within {DIAL_TIMEOUT:?}"),
            }),
        };
        match &result {
            Ok(()) => info!(peer = %peer_id, "peer connection established"),
            Err(e) => debug!(peer = %peer_id, error = %e, "peer connection failed"),
        }
        DialOutcome { peer_id, result }
    });

    Ok(join_all(dials).await)
}
