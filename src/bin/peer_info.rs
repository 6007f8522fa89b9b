//! Reference CLI: connect to a peer, print `{ "info": ..., "peers": [...] }`
//! after a fixed listening window, always exiting 0 (spec.md §6).
//!
//! Ported from `original_source/cmd/peer_info/peer_info.go`.

use serde_json::json;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use stellar_overlay::xdr::StellarMessage;
use stellar_overlay::{NodeIdentity, OverlayConfig, PeerSession};

fn main() {
    env_logger::init();

    let address = match std::env::args().nth(1) {
        Some(address) => address,
        None => {
            println!("{{\"error\": \"usage: peer_info <host:port>\"}}");
            return;
        }
    };

    let identity = NodeIdentity::from_raw_seed(
        rand_seed(),
        stellar_overlay::network::PUBLIC_NETWORK_PASSPHRASE,
    )
    .expect("ephemeral identity construction cannot fail");

    let session = match PeerSession::connect(identity, &address, OverlayConfig::default()) {
        Ok(session) => session,
        Err(e) => {
            println!("{{\"error\": \"{}\"}}", e);
            return;
        }
    };

    let peers: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let peers_for_callback = peers.clone();
    session.set_on_message(move |message| {
        if let StellarMessage::Peers(addresses) = message {
            let rendered = addresses.iter().map(render_peer_address).collect();
            *peers_for_callback.lock().unwrap() = rendered;
        }
    });

    if let Err(e) = session.start() {
        println!("{{\"error\": \"{}\"}}", e);
        return;
    }

    let _ = session.send(StellarMessage::GetPeers(stellar_overlay::xdr::Void::new()));

    thread::sleep(Duration::from_secs(3));

    let peers = peers.lock().unwrap().clone();
    let hello = session.peer_info();
    let info = json!({
        "network_id": hex::encode(hello.network_id.0),
        "ledger_version": hello.ledger_version,
        "peer_id": account_id_of(&hello.peer_id),
        "overlay_version": hello.overlay_version,
        "overlay_min_version": hello.overlay_min_version,
        "version_string": hello.version_str,
    });

    println!(
        "{}",
        json!({ "info": info, "peers": peers }).to_string()
    );
}

fn render_peer_address(peer: &stellar_overlay::xdr::PeerAddress) -> String {
    match peer.ip {
        stellar_overlay::xdr::IpAddr::Ipv4(octets) => {
            format!("{}:{}", std::net::Ipv4Addr::from(octets), peer.port)
        }
        stellar_overlay::xdr::IpAddr::Ipv6(octets) => {
            format!("{}:{}", std::net::Ipv6Addr::from(octets), peer.port)
        }
    }
}

fn account_id_of(peer_id: &stellar_overlay::xdr::PublicKey) -> String {
    let stellar_overlay::xdr::PublicKey::Ed25519(key) = peer_id;
    stellar_overlay::strkey::encode(stellar_overlay::strkey::VERSION_BYTE_ACCOUNT_ID, &key.0)
}

fn rand_seed() -> [u8; 32] {
    use rand::RngCore;
    let mut seed = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut seed);
    seed
}
