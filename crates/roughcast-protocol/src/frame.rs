use crate::error::Error;
use crate::error::LengthViolation::{BelowMinimum, DeclaredMismatch, Unaligned};

/// RFC 8: framed packets begin with "ROUGHTIM" in ASCII.
pub const FRAME_MAGIC: &[u8; 8] = b"ROUGHTIM";

/// 8-byte magic plus 4-byte little-endian message length.
pub const FRAME_OVERHEAD: usize = 12;

/// Anti-amplification floor on the whole packet. A request smaller than
/// this is refused so responses can never amplify traffic.
pub const MIN_PACKET_SIZE: usize = 1024;

/// The message part of a minimum-size framed packet.
pub const MIN_MESSAGE_SIZE: usize = MIN_PACKET_SIZE - FRAME_OVERHEAD;

/// Whether a packet carries the `ROUGHTIM` frame or is a bare message.
/// Google-era traffic (version 0) and draft zero are bare; everything
/// later is framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Framed,
    Bare,
}

/// Prepend the magic and message length to an encoded message.
pub fn frame_message(msg_bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(FRAME_OVERHEAD + msg_bytes.len());
    out.extend_from_slice(FRAME_MAGIC);
    out.extend_from_slice(&(msg_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(msg_bytes);
    out
}

/// Strict frame decoding: the packet must carry the magic, a sane length,
/// and at least `min_size` (0 disables) total bytes.
pub fn decode_frame(buf: &[u8], min_size: usize) -> Result<&[u8], Error> {
    if buf.len() < FRAME_OVERHEAD {
        return Err(Error::Truncated {
            needed: FRAME_OVERHEAD,
            available: buf.len(),
        });
    }

    if &buf[..FRAME_MAGIC.len()] != FRAME_MAGIC {
        let found = buf[..8].try_into().expect("8 bytes");
        return Err(Error::BadMagic(found));
    }

    let declared = u32::from_le_bytes(buf[8..12].try_into().expect("4 bytes")) as usize;

    if declared % 4 != 0 {
        return Err(Error::BadLength(Unaligned(declared)));
    }

    if declared + FRAME_OVERHEAD != buf.len() {
        return Err(Error::BadLength(DeclaredMismatch {
            declared,
            actual: buf.len() - FRAME_OVERHEAD,
        }));
    }

    if min_size > 0 && buf.len() < min_size {
        return Err(Error::BadLength(BelowMinimum {
            size: buf.len(),
            floor: min_size,
        }));
    }

    Ok(&buf[FRAME_OVERHEAD..])
}

/// Strip the frame from a packet, returning the message bytes and which
/// framing was found.
///
/// A buffer that does not start with the magic is treated as a bare
/// message (the Google / draft-zero path). `min_size` (0 disables) is
/// enforced against the whole packet either way.
pub fn unframe(buf: &[u8], min_size: usize) -> Result<(&[u8], Framing), Error> {
    if buf.len() < FRAME_MAGIC.len() || &buf[..FRAME_MAGIC.len()] != FRAME_MAGIC {
        if min_size > 0 && buf.len() < min_size {
            return Err(Error::BadLength(BelowMinimum {
                size: buf.len(),
                floor: min_size,
            }));
        }
        return Ok((buf, Framing::Bare));
    }

    decode_frame(buf, min_size).map(|msg| (msg, Framing::Framed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trip() {
        let msg = vec![0xaa; 16];
        let packet = frame_message(&msg);

        assert_eq!(packet.len(), 28);
        assert_eq!(&packet[..8], FRAME_MAGIC);
        assert_eq!(&packet[8..12], &16u32.to_le_bytes());

        let (recovered, framing) = unframe(&packet, 0).unwrap();
        assert_eq!(recovered, msg.as_slice());
        assert_eq!(framing, Framing::Framed);
    }

    #[test]
    fn bare_fallback() {
        let msg = vec![0, 0, 0, 0];
        let (recovered, framing) = unframe(&msg, 0).unwrap();
        assert_eq!(recovered, msg.as_slice());
        assert_eq!(framing, Framing::Bare);
    }

    #[test]
    fn strict_decoding_rejects_wrong_magic() {
        let mut packet = frame_message(&[0u8; 16]);
        packet[0] = b'X';

        match decode_frame(&packet, 0) {
            Err(Error::BadMagic(found)) => assert_eq!(&found[1..], b"OUGHTIM"),
            other => panic!("unexpected result: {other:?}"),
        }

        assert!(matches!(
            decode_frame(&[0u8; 4], 0),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn corrupt_magic_falls_back_to_bare() {
        let mut packet = frame_message(&[0u8; 1012]);
        packet[0] = b'X';

        let (_, framing) = unframe(&packet, 0).unwrap();
        assert_eq!(framing, Framing::Bare);
    }

    #[test]
    fn truncated_frame_rejected() {
        let packet = frame_message(&[0u8; 16]);
        assert!(matches!(
            unframe(&packet[..10], 0),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn unaligned_declared_length_rejected() {
        let mut packet = frame_message(&[0u8; 16]);
        packet[8..12].copy_from_slice(&15u32.to_le_bytes());

        assert!(matches!(
            unframe(&packet, 0),
            Err(Error::BadLength(Unaligned(15)))
        ));
    }

    #[test]
    fn length_mismatch_rejected() {
        let mut packet = frame_message(&[0u8; 16]);
        packet[8..12].copy_from_slice(&24u32.to_le_bytes());

        assert!(matches!(
            unframe(&packet, 0),
            Err(Error::BadLength(DeclaredMismatch {
                declared: 24,
                actual: 16
            }))
        ));
    }

    #[test]
    fn minimum_size_enforced_for_both_framings() {
        let framed = frame_message(&[0u8; 16]);
        assert!(matches!(
            unframe(&framed, MIN_PACKET_SIZE),
            Err(Error::BadLength(BelowMinimum { size: 28, floor: 1024 }))
        ));

        let bare = vec![0u8; 64];
        assert!(matches!(
            unframe(&bare, MIN_PACKET_SIZE),
            Err(Error::BadLength(BelowMinimum { size: 64, floor: 1024 }))
        ));

        // at or above the floor passes
        let full = frame_message(&[0u8; MIN_MESSAGE_SIZE]);
        assert!(unframe(&full, MIN_PACKET_SIZE).is_ok());
    }
}
