use crate::error::OverlayError;
use crate::network::Network;
use crate::strkey;
use ed25519_dalek::Keypair;

/// A node's long-lived identity: its Ed25519 keypair and the network it
/// speaks on. Immutable after construction (spec.md §3, Component A).
pub struct NodeIdentity {
    seed: [u8; 32],
    keypair: Keypair,
    network_id: [u8; 32],
}

impl NodeIdentity {
    /// Load a node identity from a strkey-encoded 32-byte seed and a network
    /// passphrase. Fails with `InvalidSeed` if the strkey checksum or
    /// version byte is wrong.
    pub fn load_from_seed(seed_strkey: &str, passphrase: &str) -> Result<NodeIdentity, OverlayError> {
        let seed = strkey::decode(strkey::VERSION_BYTE_SEED, seed_strkey)
            .map_err(|e| OverlayError::InvalidSeed(e.to_string()))?;

        let secret = ed25519_dalek::SecretKey::from_bytes(&seed)
            .map_err(|e| OverlayError::InvalidSeed(e.to_string()))?;
        let public = ed25519_dalek::PublicKey::from(&secret);
        let keypair = Keypair { secret, public };

        let network_id = Network::new(passphrase).network_id();

        Ok(NodeIdentity {
            seed,
            keypair,
            network_id,
        })
    }

    /// Build a node identity from a raw 32-byte seed (bypassing strkey),
    /// useful for tests and for ephemeral identities.
    pub fn from_raw_seed(seed: [u8; 32], passphrase: &str) -> Result<NodeIdentity, OverlayError> {
        let secret = ed25519_dalek::SecretKey::from_bytes(&seed)
            .map_err(|e| OverlayError::InvalidSeed(e.to_string()))?;
        let public = ed25519_dalek::PublicKey::from(&secret);
        let keypair = Keypair { secret, public };
        let network_id = Network::new(passphrase).network_id();
        Ok(NodeIdentity {
            seed,
            keypair,
            network_id,
        })
    }

    pub fn seed(&self) -> &[u8; 32] {
        &self.seed
    }

    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.keypair.public.to_bytes()
    }

    pub fn network_id(&self) -> &[u8; 32] {
        &self.network_id
    }

    /// Sign `message` with this node's Ed25519 private key.
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        use ed25519_dalek::Signer;
        self.keypair.sign(message).to_bytes()
    }

    pub fn strkey_account_id(&self) -> String {
        strkey::encode(strkey::VERSION_BYTE_ACCOUNT_ID, &self.public_key_bytes())
    }
}
