//! Reference CLI: listen for SCP traffic for 30s, then request and print
//! every distinct quorum set referenced, tagged with its owning node id.
//!
//! Ported from `original_source/cmd/quorumsets/quorumsets.go`.

use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::process;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use stellar_overlay::xdr::{PublicKey, ScpEnvelope, StellarMessage};
use stellar_overlay::{requests, strkey, NodeIdentity, OverlayConfig, PeerSession};

fn main() {
    env_logger::init();

    let address = match std::env::args().nth(1) {
        Some(address) => address,
        None => {
            eprintln!("usage: quorumsets <host:port>");
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
            eprintln!("couldn't connect to {}: {}", address, e);
            process::exit(1);
        }
    };

    // hash -> set of owning node ids (account-id strkey)
    let owners: Arc<Mutex<HashMap<[u8; 32], HashSet<String>>>> = Arc::new(Mutex::new(HashMap::new()));
    let owners_for_callback = owners.clone();

    session.set_on_message(move |message| match message {
        StellarMessage::ScpMessage(envelope) => {
            track_quorum_set_hash(&owners_for_callback, &envelope);
        }
        StellarMessage::ErrorMsg(err) => {
            eprintln!("got error message: {}", err.msg);
        }
        StellarMessage::DontHave(d) => {
            eprintln!("received donthave: {:?}", d.req_hash);
        }
        _ => {}
    });

    if let Err(e) = session.start() {
        eprintln!("handshake failed: {}", e);
        process::exit(1);
    }

    thread::sleep(Duration::from_secs(30));

    let snapshot = owners.lock().unwrap().clone();
    for (hash, owning_ids) in snapshot {
        match requests::get_scp_quorumset_and_wait(&session, hash) {
            Ok(qset) => {
                for owner in &owning_ids {
                    println!("{}", render_quorum_set(&qset, owner));
                }
            }
            Err(e) => eprintln!("could not fetch quorum set {}: {}", hex::encode(hash), e),
        }
    }
}

fn track_quorum_set_hash(owners: &Arc<Mutex<HashMap<[u8; 32], HashSet<String>>>>, envelope: &ScpEnvelope) {
    let hash = requests::scp_quorum_set_hash(envelope);
    let PublicKey::Ed25519(node_id) = envelope.statement.node_id;
    let account_id = strkey::encode(strkey::VERSION_BYTE_ACCOUNT_ID, &node_id.0);

    owners
        .lock()
        .unwrap()
        .entry(hash)
        .or_insert_with(HashSet::new)
        .insert(account_id);
}

fn render_quorum_set(qset: &stellar_overlay::xdr::ScpQuorumSet, owner: &str) -> String {
    json!({
        "owner": owner,
        "threshold": qset.threshold,
        "validators": qset.validators.iter().map(|v| {
            let PublicKey::Ed25519(key) = v;
            strkey::encode(strkey::VERSION_BYTE_ACCOUNT_ID, &key.0)
        }).collect::<Vec<_>>(),
        "inner_sets": qset.inner_sets.iter().map(|inner| render_quorum_set_value(inner)).collect::<Vec<_>>(),
    })
    .to_string()
}

fn render_quorum_set_value(qset: &stellar_overlay::xdr::ScpQuorumSet) -> serde_json::Value {
    json!({
        "threshold": qset.threshold,
        "validators": qset.validators.iter().map(|v| {
            let PublicKey::Ed25519(key) = v;
            strkey::encode(strkey::VERSION_BYTE_ACCOUNT_ID, &key.0)
        }).collect::<Vec<_>>(),
        "inner_sets": qset.inner_sets.iter().map(render_quorum_set_value).collect::<Vec<_>>(),
    })
}

fn rand_seed() -> [u8; 32] {
    use rand::RngCore;
    let mut seed = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut seed);
    seed
}
