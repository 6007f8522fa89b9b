//! Strkey: the versioned base32 + CRC16 encoding used for Stellar account
//! IDs and seeds. Treated as a standard cryptographic primitive by
//! spec.md §1, but since no crates.io crate exposes exactly this codec we
//! implement it directly against the `base32`/`crc16` crates, the way the
//! teacher's `Cargo.toml` already pulls them in for this purpose.

use base32::Alphabet;
use std::fmt;

const ALPHABET: Alphabet = Alphabet::RFC4648 { padding: false };

/// Version byte identifying a strkey-encoded seed (`S...`).
pub const VERSION_BYTE_SEED: u8 = 18 << 3;
/// Version byte identifying a strkey-encoded Ed25519 account id (`G...`).
pub const VERSION_BYTE_ACCOUNT_ID: u8 = 6 << 3;

#[derive(Debug)]
pub struct StrkeyError(pub String);

impl fmt::Display for StrkeyError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "strkey error: {}", self.0)
    }
}

impl std::error::Error for StrkeyError {}

/// Decode a strkey string, checking its version byte and CRC16 checksum.
/// Returns the 32-byte payload.
pub fn decode(expected_version: u8, s: &str) -> Result<[u8; 32], StrkeyError> {
    let raw = base32::decode(ALPHABET, s)
        .ok_or_else(|| StrkeyError("invalid base32 encoding".to_string()))?;

    if raw.len() != 1 + 32 + 2 {
        return Err(StrkeyError(format!(
            "unexpected decoded length {}",
            raw.len()
        )));
    }

    let version = raw[0];
    let payload = &raw[1..33];
    let checksum = u16::from_le_bytes([raw[33], raw[34]]);

    if version != expected_version {
        return Err(StrkeyError(format!(
            "unexpected version byte {:#x}, expected {:#x}",
            version, expected_version
        )));
    }

    let expected_checksum = crc16::State::<crc16::XMODEM>::calculate(&raw[..33]);
    if checksum != expected_checksum {
        return Err(StrkeyError("checksum mismatch".to_string()));
    }

    let mut out = [0u8; 32];
    out.copy_from_slice(payload);
    Ok(out)
}

/// Encode a 32-byte payload as a strkey string with the given version byte.
pub fn encode(version: u8, payload: &[u8; 32]) -> String {
    let mut raw = Vec::with_capacity(1 + 32 + 2);
    raw.push(version);
    raw.extend_from_slice(payload);
    let checksum = crc16::State::<crc16::XMODEM>::calculate(&raw);
    raw.extend_from_slice(&checksum.to_le_bytes());
    base32::encode(ALPHABET, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_account_id() {
        let payload = [7u8; 32];
        let encoded = encode(VERSION_BYTE_ACCOUNT_ID, &payload);
        assert!(encoded.starts_with('G'));
        let decoded = decode(VERSION_BYTE_ACCOUNT_ID, &encoded).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn round_trips_seed() {
        let payload = [9u8; 32];
        let encoded = encode(VERSION_BYTE_SEED, &payload);
        assert!(encoded.starts_with('S'));
        let decoded = decode(VERSION_BYTE_SEED, &encoded).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn rejects_wrong_version_byte() {
        let payload = [1u8; 32];
        let encoded = encode(VERSION_BYTE_SEED, &payload);
        assert!(decode(VERSION_BYTE_ACCOUNT_ID, &encoded).is_err());
    }

    #[test]
    fn rejects_corrupted_checksum() {
        let payload = [2u8; 32];
        let mut encoded = encode(VERSION_BYTE_SEED, &payload);
        encoded.replace_range(0..1, if encoded.starts_with('A') { "B" } else { "A" });
        assert!(decode(VERSION_BYTE_SEED, &encoded).is_err());
    }
}
