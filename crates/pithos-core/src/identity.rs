//! Identity management for Pithos nodes.
//!
//! A node's identity is a single secp256k1 secret that serves two masters:
//! libp2p networking (as the `PeerId` other nodes route to) and the ledger
//! side of the network (as an EVM-compatible account address). Both views
//! must stay derived from the same key, otherwise a node's routing identity
//! and its on-chain identity drift apart.

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;
use libp2p::identity::{secp256k1, Keypair, PeerId};

use crate::error::{Error, Result};

/// Key strength of the secp256k1 identity scheme, in bits.
///
/// The provisioning API accepts a requested key strength so deployments can
/// pin it explicitly, but the identity scheme is fixed-width: any other
/// value is rejected up front rather than silently coerced.
pub const SECP256K1_KEY_BITS: u32 = 256;

/// A unified identity for nodes in the Pithos network.
#[derive(Clone)]
pub struct Identity {
    /// The wallet holding the secp256k1 private key.
    pub wallet: PrivateKeySigner,
    /// The libp2p keypair, derived from the wallet's private key.
    pub p2p_keypair: Keypair,
    /// The libp2p PeerId, derived from the p2p_keypair's public key.
    pub peer_id: PeerId,
    /// The EVM-compatible address, derived from the wallet's public key.
    pub evm_address: Address,
}

impl Identity {
    /// Creates an identity from an existing wallet, deriving the libp2p
    /// keypair and PeerId from the same secret.
    pub fn new(wallet: PrivateKeySigner) -> Result<Self> {
        let private_key_bytes = wallet.to_bytes();
        let mut key_bytes = private_key_bytes.0;

        let secret_key = secp256k1::SecretKey::try_from_bytes(&mut key_bytes)
            .map_err(|e| Error::Config(format!("failed to derive secp256k1 secret key: {:?}", e)))?;

        let p2p_keypair = Keypair::from(secp256k1::Keypair::from(secret_key));
        let peer_id = p2p_keypair.public().to_peer_id();
        let evm_address = wallet.address();

        Ok(Self {
            wallet,
            p2p_keypair,
            peer_id,
            evm_address,
        })
    }

    /// Generates a completely new, random identity.
    pub fn generate() -> Self {
        let wallet = PrivateKeySigner::random();
        Self::new(wallet).expect("freshly generated key must be a valid secp256k1 secret")
    }

    /// Generates a new identity after validating the requested key strength.
    ///
    /// `bits` must equal [`SECP256K1_KEY_BITS`]; the knob exists so callers
    /// state their expectation and get a loud failure if the scheme ever
    /// changes out from under them.
    pub fn generate_checked(bits: u32) -> Result<Self> {
        if bits != SECP256K1_KEY_BITS {
            return Err(Error::Config(format!(
                "unsupported keypair strength {bits}: node identities are fixed-width secp256k1 ({SECP256K1_KEY_BITS}-bit) keys"
            )));
        }
        Ok(Self::generate())
    }

    /// Hex encoding of the private key, as persisted in the repository
    /// configuration.
    pub fn to_hex(&self) -> String {
        hex::encode(self.wallet.to_bytes())
    }
}

impl std::str::FromStr for Identity {
    type Err = Error;

    /// Loads an identity from a hex-encoded private key string.
    fn from_str(private_key: &str) -> Result<Self> {
        let wallet: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("failed to parse private key: {}", e)))?;
        Self::new(wallet)
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("peer_id", &self.peer_id)
            .field("evm_address", &self.evm_address)
            .finish()
    }
}
