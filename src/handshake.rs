//! The two-round handshake driver (spec.md §4.D, Component D).
//!
//! Generalized from the teacher's `Peer::start_authentication`: same
//! Hello → Auth exchange, same "we called, so send first" ordering (this
//! crate is outbound-only — spec.md §1 Non-goals exclude accepting
//! inbound connections — so `we_initiated` is always `true` here, unlike
//! the teacher's bidirectional branch).

use crate::crypto;
use crate::error::{OverlayError, Result};
use crate::session::{PeerSession, PeerState};
use crate::xdr::{self, StellarMessage};
use std::net::TcpStream;

/// Perform the handshake over `stream`, which must be a fresh clone of
/// `session`'s socket (the dispatch loop doesn't exist yet, so the
/// handshake does its own blocking reads with explicit deadlines).
pub fn perform(session: &PeerSession, stream: &mut TcpStream) -> Result<()> {
    let now = crypto::current_unix_time();

    let ttl = session.config().auth_cert_ttl();
    let (local_nonce, cert) = session.with_crypto(|crypto| {
        let cert = crypto.get_or_make_auth_cert(session.identity(), now, ttl);
        (crypto.local_nonce, cert)
    });

    let hello = session.build_hello(local_nonce, cert);
    session.send(StellarMessage::Hello(hello))?;

    let deadline = Some(session.config().request_timeout());
    let response = session.read_one(stream, deadline)?;

    let peer_hello = match response.message {
        StellarMessage::Hello(hello) => hello,
        other => {
            return Err(OverlayError::UnexpectedMessage {
                expected: "Hello",
                got: other.type_name(),
            })
        }
    };

    let remote_public = peer_hello.cert.pubkey.key;
    let remote_nonce = peer_hello.nonce.0;
    session.with_crypto(|crypto| crypto.derive_keys(remote_public, remote_nonce, true));
    session.set_peer_info(peer_hello);

    session.set_state(PeerState::AwaitingAuthResponse);
    session.send(StellarMessage::Auth(xdr::Auth { unused: 0 }))?;

    let response = session.read_one(stream, deadline)?;
    match response.message {
        StellarMessage::Auth(_) => Ok(()),
        StellarMessage::ErrorMsg(err) => Err(OverlayError::HandshakeRejected(err.msg)),
        other => Err(OverlayError::UnexpectedMessage {
            expected: "Auth",
            got: other.type_name(),
        }),
    }
}
