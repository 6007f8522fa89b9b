use thiserror::Error;

/// The error taxonomy for the overlay client.
///
/// Propagation follows spec.md §7: errors surfaced by the dispatcher
/// terminate the read loop and close the session; errors surfaced by
/// request helpers are returned to the caller and the session stays
/// usable unless the error is `Io` or `AuthFailure`.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("xdr serialization error: {0}")]
    XdrSerialize(#[from] serde_xdr::CompatSerializationError),

    #[error("xdr deserialization error: {0}")]
    XdrDeserialize(#[from] serde_xdr::CompatDeserializationError),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("unexpected message: expected {expected}, got {got}")]
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },

    #[error("handshake rejected by peer: {0}")]
    HandshakeRejected(String),

    #[error("authentication failure: {0}")]
    AuthFailure(String),

    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("peer does not have the requested item")]
    NotFound,

    #[error("invalid seed: {0}")]
    InvalidSeed(String),
}

pub type Result<T> = std::result::Result<T, OverlayError>;
