//! Reference CLI: connect to a peer, print its peer list as JSON, exit.
//!
//! Ported from `original_source/cmd/peers/peers.go`. Exits non-zero on
//! connection failure or timeout (spec.md §6).

use std::process;
use stellar_overlay::{requests, NodeIdentity, OverlayConfig, PeerSession};

fn main() {
    env_logger::init();

    let address = match std::env::args().nth(1) {
        Some(address) => address,
        None => {
            eprintln!("usage: peers <host:port>");
            process::exit(2);
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
            process::exit(1);
        }
    };

    if let Err(e) = session.start() {
        println!("{{\"error\": \"{}\"}}", e);
        process::exit(1);
    }

    match requests::get_peer_addresses(&session) {
        Ok(addresses) => println!("{}", serde_json::to_string(&addresses).unwrap()),
        Err(e) => {
            println!("{{\"error\": \"{}\"}}", e);
            process::exit(1);
        }
    }
}

fn rand_seed() -> [u8; 32] {
    use rand::RngCore;
    let mut seed = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut seed);
    seed
}
