//! Per-connection session crypto (spec.md §3, §4.C, Component C).
//!
//! Generalized from the key-derivation half of the teacher's
//! `Peer::set_remote_keys`/`new_auth_cert` in `overlay/peer.rs`: same HKDF
//! construction (`hkdf`/`hmac`/`sha2`), same `x25519-dalek` ephemeral
//! keypair, same cached-cert-with-expiration shape, but lifted out of the
//! `Peer` struct so it can be unit-tested and constructed independent of a
//! live socket.

use crate::identity::NodeIdentity;
use crate::xdr;
use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use x25519_dalek::{PublicKey, StaticSecret};

/// Per-connection cryptographic state: ephemeral X25519 keys, the shared
/// secret and directional MAC keys derived from the handshake, and the
/// cached signed auth certificate (spec.md §3 `SessionCrypto`).
pub struct SessionCrypto {
    pub local_nonce: [u8; 32],
    auth_secret: StaticSecret,
    auth_public: PublicKey,
    shared_key: [u8; 32],
    sending_mac_key: [u8; 32],
    receiving_mac_key: [u8; 32],
    cached_auth_cert: Option<xdr::AuthCert>,
    derived: bool,
}

impl SessionCrypto {
    /// Sample a fresh nonce and ephemeral X25519 keypair.
    pub fn new_ephemeral() -> SessionCrypto {
        let mut rng = rand::rngs::OsRng;
        let mut local_nonce = [0u8; 32];
        rng.fill_bytes(&mut local_nonce);

        let auth_secret = StaticSecret::new(&mut rng);
        let auth_public = PublicKey::from(&auth_secret);

        SessionCrypto {
            local_nonce,
            auth_secret,
            auth_public,
            shared_key: [0u8; 32],
            sending_mac_key: [0u8; 32],
            receiving_mac_key: [0u8; 32],
            cached_auth_cert: None,
            derived: false,
        }
    }

    pub fn auth_public_bytes(&self) -> [u8; 32] {
        *self.auth_public.as_bytes()
    }

    /// Derive the shared key and both directional MAC keys from the
    /// remote's ephemeral public key and nonce. Must be called exactly
    /// once per connection (spec.md §4.C).
    ///
    /// Role byte: `0x00` if we initiated the connection, `0x01` if the
    /// remote did. The HKDF-Extract input orders the initiator's public
    /// key first regardless of which side we are.
    pub fn derive_keys(&mut self, remote_public: [u8; 32], remote_nonce: [u8; 32], we_initiated: bool) {
        let (public_a, public_b) = if we_initiated {
            (self.auth_public_bytes(), remote_public)
        } else {
            (remote_public, self.auth_public_bytes())
        };

        let shared_secret = self.auth_secret.diffie_hellman(&PublicKey::from(remote_public));

        let mut extract_input = Vec::with_capacity(96);
        extract_input.extend_from_slice(shared_secret.as_bytes());
        extract_input.extend_from_slice(&public_a);
        extract_input.extend_from_slice(&public_b);

        let (shared_key, hkdf) = Hkdf::<Sha256>::extract(None, &extract_input);
        self.shared_key.copy_from_slice(&shared_key);

        let role_byte: u8 = if we_initiated { 0x00 } else { 0x01 };

        self.sending_mac_key = expand_mac_key(&hkdf, role_byte, &self.local_nonce, &remote_nonce);
        self.receiving_mac_key = expand_mac_key(&hkdf, role_byte, &remote_nonce, &self.local_nonce);
        self.derived = true;
    }

    pub fn sending_mac_key(&self) -> &[u8; 32] {
        &self.sending_mac_key
    }

    pub fn receiving_mac_key(&self) -> &[u8; 32] {
        &self.receiving_mac_key
    }

    pub fn keys_derived(&self) -> bool {
        self.derived
    }

    /// Return the cached auth cert if it is still valid, else sign and
    /// cache a fresh one expiring `ttl` from `now` (spec.md §4.C; `ttl` is
    /// the caller's configured `OverlayConfig::auth_cert_ttl`, default
    /// 3600s).
    pub fn get_or_make_auth_cert(&mut self, identity: &NodeIdentity, now: u64, ttl: Duration) -> xdr::AuthCert {
        if let Some(cert) = &self.cached_auth_cert {
            if cert.expiration > now {
                return cert.clone();
            }
        }

        let expiration = now + ttl.as_secs();
        let auth_public = self.auth_public_bytes();
        let signing_bytes = auth_cert_signing_bytes(identity.network_id(), expiration, &auth_public);
        let signature = identity.sign(&signing_bytes);

        let cert = xdr::AuthCert {
            pubkey: xdr::Curve25519Public { key: auth_public },
            expiration,
            sig: xdr::Signature(signature.to_vec()),
        };

        self.cached_auth_cert = Some(cert.clone());
        cert
    }
}

/// The bytes signed to produce an `AuthCert`'s signature (spec.md §6):
/// `XDR(network_id) ‖ XDR(ENVELOPE_TYPE_AUTH) ‖ XDR(expiration) ‖ XDR(auth_public)`,
/// SHA-256-hashed before signing.
pub fn auth_cert_signing_bytes(network_id: &[u8; 32], expiration: u64, auth_public: &[u8; 32]) -> [u8; 32] {
    let mut buf = Vec::new();
    serde_xdr::to_writer(&mut buf, &xdr::Uint256(*network_id)).expect("xdr encode network id");
    serde_xdr::to_writer(&mut buf, &xdr::EnvelopeType::EnvelopeTypeAuth).expect("xdr encode envelope type");
    serde_xdr::to_writer(&mut buf, &expiration).expect("xdr encode expiration");
    serde_xdr::to_writer(&mut buf, &xdr::Curve25519Public { key: *auth_public }).expect("xdr encode auth public");

    let mut hasher = <sha2::Sha256 as sha2::Digest>::new();
    sha2::Digest::update(&mut hasher, &buf);
    let hash = sha2::Digest::finalize(hasher);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    out
}

fn expand_mac_key(hkdf: &Hkdf<Sha256>, role_byte: u8, nonce_a: &[u8; 32], nonce_b: &[u8; 32]) -> [u8; 32] {
    let mut info = Vec::with_capacity(65);
    info.push(role_byte);
    info.extend_from_slice(nonce_a);
    info.extend_from_slice(nonce_b);

    let mut okm = [0u8; 32];
    hkdf.expand(&info, &mut okm).expect("32 bytes is a valid HKDF-SHA256 output length");
    okm
}

/// HMAC-SHA256 over `key`, used to authenticate outbound messages and
/// (optionally) verify inbound ones (spec.md §6 MAC computation).
pub fn hmac_sha256(key: &[u8; 32], data: &[u8]) -> [u8; 32] {
    let mut mac = Hmac::<Sha256>::new_varkey(key).expect("HMAC-SHA256 accepts any key length");
    mac.input(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&mac.result().code());
    out
}

pub fn current_unix_time() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is after the unix epoch")
        .as_secs()
}

pub fn current_unix_time_with_clock(now: SystemTime) -> u64 {
    now.duration_since(UNIX_EPOCH)
        .expect("provided time is after the unix epoch")
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::NodeIdentity;

    #[test]
    fn derive_keys_swaps_send_and_receive_with_initiator_flag() {
        let mut a = SessionCrypto::new_ephemeral();
        let mut b = SessionCrypto::new_ephemeral();

        let a_public = a.auth_public_bytes();
        let b_public = b.auth_public_bytes();
        let a_nonce = a.local_nonce;
        let b_nonce = b.local_nonce;

        a.derive_keys(b_public, b_nonce, true);
        b.derive_keys(a_public, a_nonce, false);

        assert_eq!(a.sending_mac_key(), b.receiving_mac_key());
        assert_eq!(a.receiving_mac_key(), b.sending_mac_key());
    }

    #[test]
    fn get_or_make_auth_cert_caches_until_expiration() {
        let identity = NodeIdentity::from_raw_seed([4u8; 32], "test passphrase").unwrap();
        let mut crypto = SessionCrypto::new_ephemeral();
        let ttl = Duration::from_secs(3600);

        let cert1 = crypto.get_or_make_auth_cert(&identity, 1_000, ttl);
        let cert2 = crypto.get_or_make_auth_cert(&identity, 1_001, ttl);
        assert_eq!(cert1, cert2);

        let cert3 = crypto.get_or_make_auth_cert(&identity, cert1.expiration + 1, ttl);
        assert_ne!(cert1, cert3);
    }

    #[test]
    fn auth_cert_respects_configured_ttl() {
        let identity = NodeIdentity::from_raw_seed([6u8; 32], "test passphrase").unwrap();
        let mut crypto = SessionCrypto::new_ephemeral();

        let cert = crypto.get_or_make_auth_cert(&identity, 1_000, Duration::from_secs(60));
        assert_eq!(cert.expiration, 1_060);
    }

    #[test]
    fn auth_cert_signature_verifies() {
        let identity = NodeIdentity::from_raw_seed([5u8; 32], "test passphrase").unwrap();
        let mut crypto = SessionCrypto::new_ephemeral();
        let cert = crypto.get_or_make_auth_cert(&identity, 1_000, Duration::from_secs(3600));

        let signing_bytes =
            auth_cert_signing_bytes(identity.network_id(), cert.expiration, &cert.pubkey.key);

        use ed25519_dalek::Verifier;
        let public_key = ed25519_dalek::PublicKey::from_bytes(&identity.public_key_bytes()).unwrap();
        let signature = ed25519_dalek::Signature::from_bytes(cert.sig.0.as_slice()).unwrap();
        assert!(public_key.verify(&signing_bytes, &signature).is_ok());
    }
}
