//! Little-endian integer codecs for tag values.
//!
//! Decoders are strict: the buffer must be exactly the declared width. A
//! MIDP that arrives as 4 bytes is an error, not a short read.

use crate::error::Error;
use crate::error::LengthViolation::Unaligned;

pub fn encode_u32(value: u32) -> [u8; 4] {
    value.to_le_bytes()
}

pub fn decode_u32(buf: &[u8]) -> Result<u32, Error> {
    let bytes: [u8; 4] = buf.try_into().map_err(|_| Error::Truncated {
        needed: 4,
        available: buf.len(),
    })?;
    Ok(u32::from_le_bytes(bytes))
}

pub fn encode_u64(value: u64) -> [u8; 8] {
    value.to_le_bytes()
}

pub fn decode_u64(buf: &[u8]) -> Result<u64, Error> {
    let bytes: [u8; 8] = buf.try_into().map_err(|_| Error::Truncated {
        needed: 8,
        available: buf.len(),
    })?;
    Ok(u64::from_le_bytes(bytes))
}

/// Concatenated little-endian u32s, as used by VER and VERS.
pub fn encode_u32_list(values: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(values.len() * 4);
    for value in values {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

pub fn decode_u32_list(buf: &[u8]) -> Result<Vec<u32>, Error> {
    if buf.len() % 4 != 0 {
        return Err(Error::BadLength(Unaligned(buf.len())));
    }

    Ok(buf
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes(chunk.try_into().expect("4-byte chunk")))
        .collect())
}
