//! A scripted fake peer used to drive the session end-to-end over a real
//! loopback socket, the way `session::tests` would if the dispatch loop
//! weren't hidden behind a live `TcpStream`. Each scenario spawns the fake
//! peer on its own thread and connects a real `PeerSession` to it.

use std::net::{TcpListener, TcpStream};

use stellar_overlay::crypto::{self, SessionCrypto};
use stellar_overlay::identity::NodeIdentity;
use stellar_overlay::network::PUBLIC_NETWORK_PASSPHRASE;
use stellar_overlay::xdr::{self, AuthenticatedMessage, AuthenticatedMessageV0, StellarMessage};
use stellar_overlay::{framing, OverlayConfig};

pub const FAKE_PEER_SEED: [u8; 32] = [0x42u8; 32];

/// Bind an ephemeral loopback listener and return it along with the address
/// string a `PeerSession::connect` can dial.
pub fn bind_loopback() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
    let address = listener.local_addr().expect("local_addr").to_string();
    (listener, address)
}

pub fn test_config() -> OverlayConfig {
    let mut config = OverlayConfig::default();
    config.request_timeout_secs = 3;
    config.wait_for_timeout_secs = 5;
    config
}

/// Drives the peer side of the handshake: reads the client's `Hello`, replies
/// with a `Hello` of its own signed by a fake identity, then reads the
/// client's `Auth` and (if `accept` is true) answers with `Auth{}`, else with
/// an `ErrorMsg`.
pub struct FakePeer {
    pub stream: TcpStream,
    pub crypto: SessionCrypto,
    pub identity: NodeIdentity,
    pub peer_send_seq: u64,
}

impl FakePeer {
    pub fn accept(listener: &TcpListener) -> FakePeer {
        let (stream, _) = listener.accept().expect("accept client connection");
        let identity = NodeIdentity::from_raw_seed(FAKE_PEER_SEED, PUBLIC_NETWORK_PASSPHRASE)
            .expect("fake peer identity");
        FakePeer {
            stream,
            crypto: SessionCrypto::new_ephemeral(),
            identity,
            peer_send_seq: 0,
        }
    }

    pub fn read_message(&mut self) -> StellarMessage {
        let bytes = framing::read_frame(&mut self.stream).expect("read frame from client");
        let envelope: AuthenticatedMessage = framing::unmarshal(&bytes).expect("decode envelope");
        envelope.into_v0().message
    }

    fn write_envelope(&mut self, message: StellarMessage, mac: [u8; 32]) {
        let envelope = AuthenticatedMessage::V0(AuthenticatedMessageV0 {
            sequence: self.peer_send_seq,
            message,
            mac: xdr::HmacSha256Mac { mac },
        });
        let bytes = framing::marshal(&envelope).expect("marshal envelope");
        framing::write_frame(&mut self.stream, &bytes).expect("write frame to client");
        self.peer_send_seq += 1;
    }

    /// Read the client's `Hello`, reply with our own, and derive session
    /// keys (we did not initiate, so `we_initiated=false`).
    pub fn exchange_hello(&mut self, now: u64) -> xdr::Hello {
        let client_hello = match self.read_message() {
            StellarMessage::Hello(hello) => hello,
            other => panic!("expected client Hello, got {}", other.type_name()),
        };

        let cert = self
            .crypto
            .get_or_make_auth_cert(&self.identity, now, std::time::Duration::from_secs(3600));
        let our_hello = xdr::Hello {
            ledger_version: 9000,
            overlay_version: 9000,
            overlay_min_version: 0,
            network_id: xdr::Uint256(*self.identity.network_id()),
            version_str: "fake-peer/1.0".to_string(),
            listening_port: 11625,
            peer_id: xdr::PublicKey::Ed25519(xdr::Uint256(self.identity.public_key_bytes())),
            cert,
            nonce: xdr::Uint256(self.crypto.local_nonce),
        };

        self.write_envelope(StellarMessage::Hello(our_hello.clone()), [0u8; 32]);

        self.crypto.derive_keys(
            client_hello.cert.pubkey.key,
            client_hello.nonce.0,
            false,
        );

        client_hello
    }

    /// Read the client's `Auth`, verifying its MAC against our derived
    /// receiving key, then answer with `Auth{}` authenticated under our
    /// sending key.
    pub fn exchange_auth_accept(&mut self) {
        self.read_authenticated_auth();
        self.send_authenticated(StellarMessage::Auth(xdr::Auth { unused: 0 }));
    }

    /// Like `exchange_auth_accept`, but rejects with an `ErrorMsg` instead.
    pub fn exchange_auth_reject(&mut self, msg: &str) {
        self.read_authenticated_auth();
        self.write_envelope(
            StellarMessage::ErrorMsg(xdr::Error {
                code: xdr::ErrorCode::ErrAuth,
                msg: msg.to_string(),
            }),
            [0u8; 32],
        );
    }

    fn read_authenticated_auth(&mut self) {
        match self.read_message() {
            StellarMessage::Auth(_) => {}
            other => panic!("expected client Auth, got {}", other.type_name()),
        }
    }

    /// Compute the MAC for an authenticated message we are about to send,
    /// bump our send sequence, and write it.
    pub fn send_authenticated(&mut self, message: StellarMessage) {
        let sending_key = *self.crypto.sending_mac_key();
        let mut mac_input = Vec::new();
        serde_xdr::to_writer(&mut mac_input, &self.peer_send_seq).expect("xdr encode sequence");
        serde_xdr::to_writer(&mut mac_input, &message).expect("xdr encode message");
        let mac = crypto::hmac_sha256(&sending_key, &mac_input);
        self.write_envelope(message, mac);
    }

    /// Read one authenticated client message, returning its claimed
    /// sequence, the message itself, and whether its MAC verifies against
    /// our derived receiving key.
    pub fn read_authenticated(&mut self) -> (u64, StellarMessage, bool) {
        let bytes = framing::read_frame(&mut self.stream).expect("read frame from client");
        let envelope: AuthenticatedMessage = framing::unmarshal(&bytes).expect("decode envelope");
        let v0 = envelope.into_v0();

        let receiving_key = *self.crypto.receiving_mac_key();
        let mut mac_input = Vec::new();
        serde_xdr::to_writer(&mut mac_input, &v0.sequence).expect("xdr encode sequence");
        serde_xdr::to_writer(&mut mac_input, &v0.message).expect("xdr encode message");
        let expected = crypto::hmac_sha256(&receiving_key, &mac_input);

        (v0.sequence, v0.message, expected == v0.mac.mac)
    }
}

pub fn fixed_identity(seed: [u8; 32]) -> NodeIdentity {
    NodeIdentity::from_raw_seed(seed, PUBLIC_NETWORK_PASSPHRASE).expect("test identity")
}
