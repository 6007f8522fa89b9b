//! Typed request/response helpers (spec.md §4.F, Component F).
//!
//! Generalized from `original_source/peer/commands.go`: each helper there
//! fires a request and leaves correlation to the caller's `OnMessage`
//! switch; here each helper owns its own `must_respond`/`wait_for` pair so
//! callers get a synchronous `Result<T>` instead of having to thread a
//! callback.

use crate::error::{OverlayError, Result};
use crate::session::PeerSession;
use crate::xdr::{self, StellarMessage, Void};
use std::net::{Ipv4Addr, Ipv6Addr};

/// Send `GetPeers{}` and await the peer's `Peers` response, rendering each
/// entry as a canonical `"ip:port"` string (spec.md §4.F).
pub fn get_peer_addresses(session: &PeerSession) -> Result<Vec<String>> {
    session.send(StellarMessage::GetPeers(Void::new()))?;
    session.must_respond();
    let response = session.wait_for("Peers")?;

    match response {
        StellarMessage::Peers(peers) => Ok(peers.iter().map(render_peer_address).collect()),
        other => Err(OverlayError::UnexpectedMessage {
            expected: "Peers",
            got: other.type_name(),
        }),
    }
}

fn render_peer_address(peer: &xdr::PeerAddress) -> String {
    match peer.ip {
        xdr::IpAddr::Ipv4(octets) => format!("{}:{}", Ipv4Addr::from(octets), peer.port),
        xdr::IpAddr::Ipv6(octets) => format!("{}:{}", Ipv6Addr::from(octets), peer.port),
    }
}

/// Send `GetTxSet(hash)` and await the `TxSet` response. Resolves to
/// `NotFound` if the peer answers `DontHave` instead.
pub fn get_tx_set(session: &PeerSession, hash: [u8; 32]) -> Result<xdr::TransactionSet> {
    session.send(StellarMessage::GetTxSet(xdr::Uint256(hash)))?;
    session.must_respond();
    let response = session.wait_for_any(&["TxSet", "DontHave"])?;

    match response {
        StellarMessage::TxSet(tx_set) => Ok(tx_set),
        StellarMessage::DontHave(_) => Err(OverlayError::NotFound),
        other => Err(OverlayError::UnexpectedMessage {
            expected: "TxSet",
            got: other.type_name(),
        }),
    }
}

/// Send `GetScpQuorumset(hash)`. The caller awaits the response via
/// `PeerSession::wait_for("ScpQuorumset")` or the streaming API, since a
/// quorum set request is often issued alongside a live SCP stream
/// subscription (spec.md §4.F).
pub fn get_scp_quorumset(session: &PeerSession, hash: [u8; 32]) -> Result<()> {
    session.send(StellarMessage::GetScpQuorumset(xdr::Uint256(hash)))
}

/// Send `GetScpQuorumset(hash)` and await either the `ScpQuorumset`
/// response or `DontHave`, resolving the latter to `NotFound`.
pub fn get_scp_quorumset_and_wait(session: &PeerSession, hash: [u8; 32]) -> Result<xdr::ScpQuorumSet> {
    get_scp_quorumset(session, hash)?;
    session.must_respond();
    let response = session.wait_for_any(&["ScpQuorumset", "DontHave"])?;

    match response {
        StellarMessage::ScpQuorumset(qset) => Ok(qset),
        StellarMessage::DontHave(_) => Err(OverlayError::NotFound),
        other => Err(OverlayError::UnexpectedMessage {
            expected: "ScpQuorumset",
            got: other.type_name(),
        }),
    }
}

/// Send `GetScpState{}` and await an `ScpMessage` envelope.
pub fn get_scp_state(session: &PeerSession) -> Result<xdr::ScpEnvelope> {
    session.send(StellarMessage::GetScpState(Void::new()))?;
    session.must_respond();
    let response = session.wait_for("ScpMessage")?;

    match response {
        StellarMessage::ScpMessage(envelope) => Ok(envelope),
        other => Err(OverlayError::UnexpectedMessage {
            expected: "ScpMessage",
            got: other.type_name(),
        }),
    }
}

/// Send `Transaction(tx)`. Fire-and-forget: the peer gives no direct
/// response.
pub fn announce_transaction(session: &PeerSession, tx: xdr::TransactionEnvelope) -> Result<()> {
    session.send(StellarMessage::Transaction(tx))
}

/// Extract the quorum-set hash referenced by an SCP statement's pledge
/// (supplemented from `original_source/peer/scp.go`: `Nominate` and
/// `Prepare`/`Confirm` reference `quorum_set_hash`, `Externalize`
/// references `commit_quorum_set_hash` under a different field name).
pub fn scp_quorum_set_hash(envelope: &xdr::ScpEnvelope) -> [u8; 32] {
    match &envelope.statement.pledges {
        xdr::ScpStatementPledges::Nominate(n) => n.quorum_set_hash.0,
        xdr::ScpStatementPledges::Prepare(p) => p.quorum_set_hash.0,
        xdr::ScpStatementPledges::Confirm(c) => c.quorum_set_hash.0,
        xdr::ScpStatementPledges::Externalize(e) => e.commit_quorum_set_hash.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_ipv4_peer_address() {
        let peer = xdr::PeerAddress {
            ip: xdr::IpAddr::Ipv4([192, 0, 2, 1]),
            port: 11625,
            num_failures: 0,
        };
        assert_eq!(render_peer_address(&peer), "192.0.2.1:11625");
    }

    #[test]
    fn renders_ipv6_peer_address() {
        let mut octets = [0u8; 16];
        octets[0] = 0x20;
        octets[1] = 0x01;
        octets[2] = 0x0d;
        octets[3] = 0xb8;
        octets[15] = 0x01;
        let peer = xdr::PeerAddress {
            ip: xdr::IpAddr::Ipv6(octets),
            port: 11626,
            num_failures: 0,
        };
        assert_eq!(render_peer_address(&peer), "2001:db8::1:11626");
    }

    #[test]
    fn extracts_quorum_set_hash_from_externalize() {
        let envelope = xdr::ScpEnvelope {
            statement: xdr::ScpStatement {
                node_id: xdr::PublicKey::Ed25519(xdr::Uint256([0u8; 32])),
                slot_index: 1,
                pledges: xdr::ScpStatementPledges::Externalize(xdr::ScpStatementExternalize {
                    commit_quorum_set_hash: xdr::Uint256([9u8; 32]),
                }),
            },
            signature: xdr::Signature(vec![]),
        };
        assert_eq!(scp_quorum_set_hash(&envelope), [9u8; 32]);
    }
}
