//! Client library for the Stellar overlay protocol: opens an
//! authenticated, MAC-protected TCP session to a Stellar Core node and
//! exchanges XDR-encoded overlay messages.
//!
//! See `SPEC_FULL.md` for the full module map. The short version: build a
//! [`NodeIdentity`], `connect` a [`PeerSession`] to a peer address, call
//! `start()` to run the handshake and spin up the inbound dispatcher, then
//! use the helpers in [`requests`] or `send`/`wait_for` directly.

pub mod config;
pub mod crypto;
pub mod error;
pub mod framing;
pub mod handshake;
pub mod identity;
pub mod network;
pub mod requests;
pub mod session;
pub mod strkey;
pub mod xdr;

pub use config::OverlayConfig;
pub use error::{OverlayError, Result};
pub use identity::NodeIdentity;
pub use network::Network;
pub use session::{PeerSession, PeerState, StreamCancel};
