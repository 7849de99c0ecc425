use std::cmp::Ordering;
use std::fmt;

use crate::error::Error;

/// A Roughtime tag: four bytes naming a value in a message.
///
/// Tags are usually 1-4 printable ASCII characters right-padded with NUL
/// (`VER\0`), but arbitrary byte patterns occur on the wire; Google's padding
/// tag is the literal bytes `PAD\xff`. Any four bytes round-trip unchanged.
///
/// Ordering is by the little-endian `u32` interpretation of the four bytes,
/// which is the order tags must appear in on the wire. For example
/// `PAD\0` (0x00444150) < `ZZZZ` (0x5a5a5a5a) < `PAD\xff` (0xff444150).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag([u8; 4]);

impl Tag {
    pub const CERT: Tag = Tag(*b"CERT");
    pub const DELE: Tag = Tag(*b"DELE");
    pub const INDX: Tag = Tag(*b"INDX");
    pub const MAXT: Tag = Tag(*b"MAXT");
    pub const MIDP: Tag = Tag(*b"MIDP");
    pub const MINT: Tag = Tag(*b"MINT");
    pub const NONC: Tag = Tag(*b"NONC");
    pub const PAD: Tag = Tag(*b"PAD\x00");
    pub const PAD_CLASSIC: Tag = Tag([b'P', b'A', b'D', 0xff]);
    pub const PATH: Tag = Tag(*b"PATH");
    pub const PUBK: Tag = Tag(*b"PUBK");
    pub const RADI: Tag = Tag(*b"RADI");
    pub const ROOT: Tag = Tag(*b"ROOT");
    pub const SIG: Tag = Tag(*b"SIG\x00");
    pub const SREP: Tag = Tag(*b"SREP");
    pub const SRV: Tag = Tag(*b"SRV\x00");
    pub const TYPE: Tag = Tag(*b"TYPE");
    pub const VER: Tag = Tag(*b"VER\x00");
    pub const VERS: Tag = Tag(*b"VERS");
    pub const ZZZZ: Tag = Tag(*b"ZZZZ");

    /// Build a tag from a 1-4 character printable-ASCII name, NUL-padded.
    pub fn new(name: &str) -> Result<Tag, Error> {
        let bytes = name.as_bytes();
        if bytes.is_empty() || bytes.len() > 4 {
            let mut raw = [0u8; 4];
            let n = bytes.len().min(4);
            raw[..n].copy_from_slice(&bytes[..n]);
            return Err(Error::BadTag(raw));
        }

        let mut value = [0u8; 4];
        for (i, &b) in bytes.iter().enumerate() {
            if !b.is_ascii_graphic() {
                return Err(Error::BadTag(value));
            }
            value[i] = b;
        }

        Ok(Tag(value))
    }

    /// Any four bytes are a valid on-the-wire tag.
    pub const fn from_wire(bytes: [u8; 4]) -> Tag {
        Tag(bytes)
    }

    pub const fn wire_value(&self) -> [u8; 4] {
        self.0
    }

    /// The numeric value tags sort by.
    pub const fn value(&self) -> u32 {
        u32::from_le_bytes(self.0)
    }

    /// The ASCII name, if all four bytes are printable-or-NUL with the NULs
    /// only at the end. `PAD\xff` has no name and is rendered as raw bytes.
    pub fn name(&self) -> Option<&str> {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(4);
        let (head, tail) = self.0.split_at(end);

        if head.iter().all(|b| b.is_ascii_graphic()) && tail.iter().all(|&b| b == 0) && end > 0 {
            // head is graphic ASCII, always valid UTF-8
            Some(str::from_utf8(head).expect("ascii"))
        } else {
            None
        }
    }

    /// Tags whose value is itself a Roughtime message.
    pub const fn is_nested(&self) -> bool {
        matches!(*self, Tag::CERT | Tag::DELE | Tag::SREP)
    }
}

impl Ord for Tag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value().cmp(&other.value())
    }
}

impl PartialOrd for Tag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{:#010x}", self.value()),
        }
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values() {
        assert_eq!(Tag::NONC.wire_value(), [0x4e, 0x4f, 0x4e, 0x43]);
        assert_eq!(Tag::VER.wire_value(), [0x56, 0x45, 0x52, 0x00]);
        assert_eq!(Tag::PAD_CLASSIC.wire_value(), [0x50, 0x41, 0x44, 0xff]);
    }

    #[test]
    fn numeric_values() {
        assert_eq!(Tag::PAD.value(), 0x0044_4150);
        assert_eq!(Tag::ZZZZ.value(), 0x5a5a_5a5a);
        assert_eq!(Tag::PAD_CLASSIC.value(), 0xff44_4150);
        assert_eq!(Tag::NONC.value(), 0x434e_4f4e);
    }

    #[test]
    fn ordering_is_little_endian_numeric() {
        assert!(Tag::PAD < Tag::SIG);
        assert!(Tag::SIG < Tag::VER);
        assert!(Tag::NONC < Tag::DELE);
        assert!(Tag::PAD < Tag::ZZZZ);
        assert!(Tag::ZZZZ < Tag::PAD_CLASSIC);
    }

    #[test]
    fn names() {
        assert_eq!(Tag::NONC.name(), Some("NONC"));
        assert_eq!(Tag::SIG.name(), Some("SIG"));
        assert_eq!(Tag::PAD.name(), Some("PAD"));
        assert_eq!(Tag::PAD_CLASSIC.name(), None);
        assert_eq!(Tag::from_wire([0, 0, 0, 0]).name(), None);
        // interior NUL disqualifies a name
        assert_eq!(Tag::from_wire([b'A', 0, b'B', 0]).name(), None);
    }

    #[test]
    fn new_rejects_bad_names() {
        assert!(Tag::new("").is_err());
        assert!(Tag::new("TOOBIG").is_err());
        assert!(Tag::new("a b").is_err());
        assert_eq!(Tag::new("NONC").unwrap(), Tag::NONC);
        assert_eq!(Tag::new("SIG").unwrap(), Tag::SIG);
    }

    #[test]
    fn raw_tags_round_trip() {
        let raw = [0xde, 0xad, 0xbe, 0xef];
        let tag = Tag::from_wire(raw);
        assert_eq!(tag.wire_value(), raw);
        assert_eq!(tag.name(), None);
    }

    #[test]
    fn nested_tags() {
        assert!(Tag::CERT.is_nested());
        assert!(Tag::DELE.is_nested());
        assert!(Tag::SREP.is_nested());
        assert!(!Tag::VER.is_nested());
        assert!(!Tag::PAD_CLASSIC.is_nested());
    }
}
