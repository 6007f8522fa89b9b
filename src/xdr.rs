//! Wire types for the Stellar overlay protocol.
//!
//! spec.md §1 treats XDR (de)serialization as an external collaborator —
//! "a library that can marshal/unmarshal any typed value to/from a byte
//! stream". That library is `serde-xdr`: these types carry the `Serialize`/
//! `Deserialize` derives the teacher's (unretrieved) `xdr` module relies on,
//! and `framing.rs` hands them to `serde_xdr::to_writer`/`from_reader`
//! without any type-specific logic of its own.
//!
//! Only the subset of the real `stellar-core` XDR schema the handshake,
//! session and request helpers need is modeled here. Transaction and
//! ledger-entry internals are out of scope (spec.md §1 Non-goals) and are
//! represented as opaque byte blobs.

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

pub type Uint32 = u32;
pub type Int32 = i32;
pub type Uint64 = u64;

/// A fixed 32-byte opaque value — used for hashes, nonces and curve points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Uint256(pub [u8; 32]);

pub type Hash = Uint256;

/// Placeholder payload for XDR union arms that carry no real data.
/// `serde-xdr` unions need a concrete wire shape even for "void" arms;
/// `stellar-core-go` works around the same constraint by sending a literal
/// `0` (see `original_source/peer/commands.go`) — this is that same `0`,
/// named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Void(pub Int32);

impl Void {
    pub fn new() -> Self {
        Void(0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u32)]
pub enum PublicKeyType {
    PublicKeyTypeEd25519 = 0,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublicKey {
    Ed25519(Uint256),
}

pub type NodeId = PublicKey;

/// A variable-length opaque signature, up to 64 bytes (Ed25519).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Signature(#[serde(with = "serde_bytes")] pub Vec<u8>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Curve25519Public {
    pub key: [u8; 32],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct HmacSha256Mac {
    pub mac: [u8; 32],
}

/// `ENVELOPE_TYPE_AUTH`'s discriminant in the real `stellar-core` schema.
/// Domain-separates the auth-cert signature from other signed envelope
/// kinds (transactions, SCP statements).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u32)]
pub enum EnvelopeType {
    EnvelopeTypeAuth = 2,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthCert {
    pub pubkey: Curve25519Public,
    pub expiration: Uint64,
    pub sig: Signature,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hello {
    pub ledger_version: Uint32,
    pub overlay_version: Uint32,
    pub overlay_min_version: Uint32,
    pub network_id: Hash,
    pub version_str: String,
    pub listening_port: Uint32,
    pub peer_id: NodeId,
    pub cert: AuthCert,
    pub nonce: Uint256,
}

impl Default for Hello {
    fn default() -> Self {
        Hello {
            ledger_version: 0,
            overlay_version: 0,
            overlay_min_version: 0,
            network_id: Uint256::default(),
            version_str: String::new(),
            listening_port: 0,
            peer_id: PublicKey::Ed25519(Uint256::default()),
            cert: AuthCert {
                pubkey: Curve25519Public::default(),
                expiration: 0,
                sig: Signature::default(),
            },
            nonce: Uint256::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Auth {
    pub unused: Int32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u32)]
pub enum ErrorCode {
    ErrMisc = 0,
    ErrData = 1,
    ErrConf = 2,
    ErrAuth = 3,
    ErrLoad = 4,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Error {
    pub code: ErrorCode,
    pub msg: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpAddr {
    Ipv4([u8; 4]),
    Ipv6([u8; 16]),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAddress {
    pub ip: IpAddr,
    pub port: Uint32,
    pub num_failures: Uint32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_repr, Deserialize_repr)]
#[repr(u32)]
pub enum MessageType {
    ErrorMsg = 0,
    Hello = 1,
    Auth = 2,
    DontHave = 3,
    GetPeers = 4,
    Peers = 5,
    GetTxSet = 6,
    TxSet = 7,
    Transaction = 8,
    GetScpQuorumset = 9,
    ScpQuorumset = 10,
    ScpMessage = 11,
    GetScpState = 12,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DontHave {
    pub req_type: MessageType,
    pub req_hash: Hash,
}

/// Transaction internals are out of scope (spec.md §1 Non-goals: "validating
/// full ledger content"); transactions are carried as an opaque,
/// already-XDR-encoded envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TransactionEnvelope(#[serde(with = "serde_bytes")] pub Vec<u8>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSet {
    pub previous_ledger_hash: Hash,
    pub txs: Vec<TransactionEnvelope>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScpQuorumSet {
    pub threshold: Uint32,
    pub validators: Vec<NodeId>,
    pub inner_sets: Vec<ScpQuorumSet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScpNomination {
    pub quorum_set_hash: Hash,
    /// Each vote/accept is itself a variable-length opaque blob (an XDR
    /// `Value`); `serde_bytes::ByteBuf` gets those inner blobs the same
    /// byte-sequence treatment `Signature`/`TransactionEnvelope` get
    /// directly (the plain `with = "serde_bytes"` attribute only applies
    /// to a single byte sequence, not a `Vec` of them).
    pub votes: Vec<serde_bytes::ByteBuf>,
    pub accepted: Vec<serde_bytes::ByteBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScpStatementPrepare {
    pub quorum_set_hash: Hash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScpStatementConfirm {
    pub quorum_set_hash: Hash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScpStatementExternalize {
    pub commit_quorum_set_hash: Hash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScpStatementPledges {
    Nominate(ScpNomination),
    Prepare(ScpStatementPrepare),
    Confirm(ScpStatementConfirm),
    Externalize(ScpStatementExternalize),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScpStatement {
    pub node_id: NodeId,
    pub slot_index: Uint64,
    pub pledges: ScpStatementPledges,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScpEnvelope {
    pub statement: ScpStatement,
    pub signature: Signature,
}

/// The tagged union of every Stellar overlay message type this client
/// understands (spec.md §1 and §6). Variant order is the wire
/// discriminant, the way the teacher's `AuthenticatedMessage::V0` encodes
/// discriminant 0 as the first (and only) enum variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StellarMessage {
    ErrorMsg(Error),
    Hello(Hello),
    Auth(Auth),
    DontHave(DontHave),
    GetPeers(Void),
    Peers(Vec<PeerAddress>),
    GetTxSet(Hash),
    TxSet(TransactionSet),
    Transaction(TransactionEnvelope),
    GetScpQuorumset(Hash),
    ScpQuorumset(ScpQuorumSet),
    ScpMessage(ScpEnvelope),
    GetScpState(Void),
}

impl StellarMessage {
    /// Every message type except `Hello` and `ErrorMsg` is authenticated
    /// (spec.md §3 invariants, §4.E `send`).
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, StellarMessage::Hello(_) | StellarMessage::ErrorMsg(_))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            StellarMessage::ErrorMsg(_) => "ErrorMsg",
            StellarMessage::Hello(_) => "Hello",
            StellarMessage::Auth(_) => "Auth",
            StellarMessage::DontHave(_) => "DontHave",
            StellarMessage::GetPeers(_) => "GetPeers",
            StellarMessage::Peers(_) => "Peers",
            StellarMessage::GetTxSet(_) => "GetTxSet",
            StellarMessage::TxSet(_) => "TxSet",
            StellarMessage::Transaction(_) => "Transaction",
            StellarMessage::GetScpQuorumset(_) => "GetScpQuorumset",
            StellarMessage::ScpQuorumset(_) => "ScpQuorumset",
            StellarMessage::ScpMessage(_) => "ScpMessage",
            StellarMessage::GetScpState(_) => "GetScpState",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedMessageV0 {
    pub sequence: Uint64,
    pub message: StellarMessage,
    pub mac: HmacSha256Mac,
}

/// `AuthenticatedMessage`, an XDR-tagged union with discriminant `0`
/// selecting the `V0` shape (spec.md §3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthenticatedMessage {
    V0(AuthenticatedMessageV0),
}

impl AuthenticatedMessage {
    pub fn into_v0(self) -> AuthenticatedMessageV0 {
        match self {
            AuthenticatedMessage::V0(v0) => v0,
        }
    }
}
