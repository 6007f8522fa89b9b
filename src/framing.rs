//! The record-marking framing codec (spec.md §4.B, §6).
//!
//! Derived from RFC 5531 §11: each record is preceded by a 32-bit
//! big-endian length whose high bit signals "last fragment". This
//! implementation never emits continuation fragments, so it always sets
//! the high bit on write, and treats the bit as a no-op on read (a peer
//! that clears it is still accepted — the bit is a fragment marker, not a
//! validity flag, per spec.md §8 S6).
//!
//! Generalized from the teacher's `Peer::send_header`/`receive_header`,
//! which wrote directly to `self.stream` and panicked on short reads; here
//! the codec is free-standing over any `Read + Write` and returns a typed
//! `OverlayError::Protocol`/`OverlayError::Io` instead (REDESIGN FLAGS,
//! spec.md §9: "panic on framing errors").

use crate::error::{OverlayError, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::{de::DeserializeOwned, Serialize};
use std::io::{Read, Write};

const LAST_FRAGMENT_BIT: u32 = 0x8000_0000;
const LENGTH_MASK: u32 = 0x7FFF_FFFF;

/// Write one record: a 4-byte big-endian length header with the
/// last-fragment bit set, followed by `payload`.
pub fn write_frame<W: Write>(stream: &mut W, payload: &[u8]) -> Result<()> {
    stream.write_u32::<BigEndian>(payload.len() as u32 | LAST_FRAGMENT_BIT)?;
    stream.write_all(payload)?;
    Ok(())
}

/// Read one record: a 4-byte header followed by its payload. Fails with
/// `Protocol` if the header's length field is zero, `Io` on a short read
/// or EOF mid-frame.
pub fn read_frame<R: Read>(stream: &mut R) -> Result<Vec<u8>> {
    let header = stream.read_u32::<BigEndian>()?;
    let length = (header & LENGTH_MASK) as usize;

    if length == 0 {
        return Err(OverlayError::Protocol("zero-length frame".to_string()));
    }

    let mut payload = vec![0u8; length];
    stream.read_exact(&mut payload)?;
    Ok(payload)
}

/// XDR-marshal `value` to a byte vector.
pub fn marshal<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(serde_xdr::to_bytes(value)?)
}

/// XDR-unmarshal `bytes` as a `T`.
pub fn unmarshal<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let mut cursor = std::io::Cursor::new(bytes);
    Ok(serde_xdr::from_reader(&mut cursor)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn round_trips_small_payload() {
        let mut buf = Vec::new();
        write_frame(&mut buf, b"x").unwrap();
        let mut cursor = Cursor::new(buf);
        let out = read_frame(&mut cursor).unwrap();
        assert_eq!(out, b"x");
    }

    #[test]
    fn round_trips_large_payload() {
        let payload = vec![0xABu8; 1 << 20];
        let mut buf = Vec::new();
        write_frame(&mut buf, &payload).unwrap();
        let mut cursor = Cursor::new(buf);
        let out = read_frame(&mut cursor).unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn accepts_header_with_fragment_bit_clear() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&5u32.to_be_bytes());
        buf.extend_from_slice(b"hello");
        let mut cursor = Cursor::new(buf);
        let out = read_frame(&mut cursor).unwrap();
        assert_eq!(out, b"hello");
    }

    #[test]
    fn rejects_zero_length_header() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(0u32 | LAST_FRAGMENT_BIT).to_be_bytes());
        let mut cursor = Cursor::new(buf);
        assert!(matches!(
            read_frame(&mut cursor),
            Err(OverlayError::Protocol(_))
        ));
    }

    #[test]
    fn errors_on_eof_mid_frame() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(10u32 | LAST_FRAGMENT_BIT).to_be_bytes());
        buf.extend_from_slice(b"short");
        let mut cursor = Cursor::new(buf);
        assert!(matches!(read_frame(&mut cursor), Err(OverlayError::Io(_))));
    }
}
