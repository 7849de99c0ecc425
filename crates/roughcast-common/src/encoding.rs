//! Encoding and decoding utilities for keys and debug output.

use std::io::Write;

use data_encoding::{
    BASE64, BASE64_NOPAD, BASE64URL, BASE64URL_NOPAD, DecodeError, DecodeKind, HEXLOWER, HEXUPPER,
};
use roughcast_protocol::PUBKEY_LENGTH;

/// Decode a 32-byte public key from whichever of the common encodings it
/// arrives in (hex, base64, base64url, padded or not).
pub fn try_decode_key(encoded_key: &str) -> Result<[u8; PUBKEY_LENGTH], DecodeError> {
    let key = try_decode(encoded_key)?;

    key.as_slice().try_into().map_err(|_| DecodeError {
        position: key.len(),
        kind: DecodeKind::Length,
    })
}

/// Attempt to decode `encoded_value` with each supported encoding until one
/// succeeds.
pub fn try_decode(encoded_value: &str) -> Result<Vec<u8>, DecodeError> {
    let bytes = encoded_value.as_bytes();

    HEXLOWER
        .decode(bytes)
        .or_else(|_| HEXUPPER.decode(bytes))
        .or_else(|_| BASE64URL.decode(bytes))
        .or_else(|_| BASE64URL_NOPAD.decode(bytes))
        .or_else(|_| BASE64.decode(bytes))
        .or_else(|_| BASE64_NOPAD.decode(bytes))
}

/// Write a hex dump of `data`: offset column, 16 bytes per line grouped in
/// pairs, ASCII gutter on the right.
pub fn hexdump<W: Write>(data: &[u8], writer: &mut W) -> std::io::Result<()> {
    const BYTES_PER_LINE: usize = 16;

    for (line, chunk) in data.chunks(BYTES_PER_LINE).enumerate() {
        write!(writer, "{:08x}: ", line * BYTES_PER_LINE)?;

        for (i, byte) in chunk.iter().enumerate() {
            write!(writer, "{byte:02x}")?;
            if i % 2 == 1 {
                write!(writer, " ")?;
            }
        }

        let padding = BYTES_PER_LINE - chunk.len();
        for i in 0..padding {
            write!(writer, "  ")?;
            if (chunk.len() + i) % 2 == 1 {
                write!(writer, " ")?;
            }
        }

        write!(writer, " |")?;
        for byte in chunk {
            let ch = if byte.is_ascii_graphic() || *byte == b' ' {
                *byte as char
            } else {
                '.'
            };
            write!(writer, "{ch}")?;
        }
        writeln!(writer, "|")?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_key_hex() {
        let lower = "0101010101010101010101010101010101010101010101010101010101010101";
        assert_eq!(try_decode_key(lower).unwrap(), [0x01u8; 32]);

        let upper = "0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A0A";
        assert_eq!(try_decode_key(upper).unwrap(), [0x0au8; 32]);
    }

    #[test]
    fn decode_key_base64() {
        // 32 bytes of 0x42, with and without padding
        let padded = "QkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkI=";
        assert_eq!(try_decode_key(padded).unwrap(), [0x42u8; 32]);

        let bare = "QkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkJCQkI";
        assert_eq!(try_decode_key(bare).unwrap(), [0x42u8; 32]);
    }

    #[test]
    fn decode_key_wrong_length() {
        let short = "0101010101010101";
        assert!(matches!(
            try_decode_key(short),
            Err(DecodeError {
                position: 8,
                kind: DecodeKind::Length
            })
        ));
    }

    #[test]
    fn decode_key_invalid_encoding() {
        assert!(try_decode_key("not-a-valid-key-encoding!!!").is_err());
    }

    #[test]
    fn hexdump_format() {
        let data = b"Hello, World! This is a test.";
        let mut output = Vec::new();

        hexdump(data, &mut output).unwrap();
        let result = String::from_utf8(output).unwrap();

        assert!(result.contains("00000000:"));
        assert!(result.contains("4865 6c6c"));
        assert!(result.contains("|Hello, World! Th|"));
        assert!(result.contains("|is is a test.|"));
    }
}
