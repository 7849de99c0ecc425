//! Assemble server responses.
//!
//! The top-level tag bag varies by version; SREP and CERT are passed
//! through as opaque bytes because their signatures cover exactly the
//! bytes the server emitted.

use crate::error::Error;
use crate::frame::{Framing, frame_message};
use crate::message::Message;
use crate::tag::Tag;
use crate::version::{ResponseSchema, Version};
use crate::wire;

/// TYPE value of a response.
pub const RESPONSE_TYPE_VALUE: [u8; 4] = [1, 0, 0, 0];

pub struct ResponseParams<'a> {
    pub version: Version,
    /// Encoded SREP, exactly as signed.
    pub srep: &'a [u8],
    /// Ed25519 signature over `CTX_SREP || srep` by the online key.
    pub signature: &'a [u8],
    /// Encoded CERT from the mint step.
    pub cert: &'a [u8],
    /// The leaf's position in the batch; 0 for a single response.
    pub index: u32,
    /// Merkle inclusion proof for the leaf.
    pub path: &'a [u8],
    /// The client's nonce, echoed by the versions that carry it.
    pub nonce: &'a [u8],
}

/// Build the response packet (framed when the version frames).
pub fn build_response(params: &ResponseParams) -> Result<Vec<u8>, Error> {
    let profile = params.version.profile();

    let mut msg = Message::with_capacity(8);
    msg.insert(Tag::SIG, params.signature)?;
    msg.insert(Tag::SREP, params.srep)?;
    msg.insert(Tag::CERT, params.cert)?;
    msg.insert(Tag::INDX, &wire::encode_u32(params.index))?;
    msg.insert(Tag::PATH, params.path)?;

    match profile.response_schema {
        ResponseSchema::Classic => {}
        ResponseSchema::Early => {
            msg.insert(Tag::VER, &params.version.wire_bytes())?;
        }
        ResponseSchema::Draft => {
            msg.insert(Tag::VER, &params.version.wire_bytes())?;
            msg.insert(Tag::NONC, params.nonce)?;
            msg.insert(Tag::TYPE, &RESPONSE_TYPE_VALUE)?;
        }
        ResponseSchema::Modern => {
            msg.insert(Tag::NONC, params.nonce)?;
            msg.insert(Tag::TYPE, &RESPONSE_TYPE_VALUE)?;
        }
    }

    let encoded = msg.encode();
    Ok(match profile.framing {
        Framing::Framed => frame_message(&encoded),
        Framing::Bare => encoded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::unframe;

    fn params(version: Version) -> ResponseParams<'static> {
        ResponseParams {
            version,
            srep: &[0x11; 40],
            signature: &[0x22; 64],
            cert: &[0x33; 152],
            index: 5,
            path: &[0x44; 64],
            nonce: &[0x55; 32],
        }
    }

    fn tags_of(version: Version) -> Vec<Tag> {
        let packet = build_response(&params(version)).unwrap();
        let (msg_bytes, _) = unframe(&packet, 0).unwrap();
        Message::decode(msg_bytes).unwrap().tags().to_vec()
    }

    #[test]
    fn classic_tag_bag() {
        let tags = tags_of(Version::Google);
        assert_eq!(
            tags,
            vec![Tag::SIG, Tag::PATH, Tag::SREP, Tag::CERT, Tag::INDX]
        );
    }

    #[test]
    fn early_tag_bag() {
        let tags = tags_of(Version::RfcDraft1);
        assert_eq!(
            tags,
            vec![Tag::SIG, Tag::VER, Tag::PATH, Tag::SREP, Tag::CERT, Tag::INDX]
        );
    }

    #[test]
    fn draft_tag_bag() {
        let tags = tags_of(Version::RfcDraft8);
        assert_eq!(tags.len(), 8);
        for tag in [
            Tag::SIG,
            Tag::NONC,
            Tag::TYPE,
            Tag::PATH,
            Tag::VER,
            Tag::SREP,
            Tag::CERT,
            Tag::INDX,
        ] {
            assert!(tags.contains(&tag), "missing {tag}");
        }
    }

    #[test]
    fn modern_tag_bag() {
        let tags = tags_of(Version::RfcDraft12);
        assert_eq!(tags.len(), 7);
        assert!(!tags.contains(&Tag::VER));
        for tag in [
            Tag::SIG,
            Tag::NONC,
            Tag::TYPE,
            Tag::PATH,
            Tag::SREP,
            Tag::CERT,
            Tag::INDX,
        ] {
            assert!(tags.contains(&tag), "missing {tag}");
        }
    }

    #[test]
    fn framing_follows_version() {
        let classic = build_response(&params(Version::Google)).unwrap();
        assert_ne!(&classic[..8], b"ROUGHTIM");

        let modern = build_response(&params(Version::RfcDraft12)).unwrap();
        assert_eq!(&modern[..8], b"ROUGHTIM");
    }

    #[test]
    fn fields_round_trip() {
        let packet = build_response(&params(Version::RfcDraft12)).unwrap();
        let (msg_bytes, _) = unframe(&packet, 0).unwrap();
        let msg = Message::decode(msg_bytes).unwrap();

        assert_eq!(msg.u32_value(Tag::INDX).unwrap(), 5);
        assert_eq!(msg.u32_value(Tag::TYPE).unwrap(), 1);
        assert_eq!(msg.get(Tag::SREP).unwrap(), &[0x11; 40]);
        assert_eq!(msg.get(Tag::SIG).unwrap(), &[0x22; 64]);
        assert_eq!(msg.get(Tag::CERT).unwrap(), &[0x33; 152]);
        assert_eq!(msg.get(Tag::PATH).unwrap(), &[0x44; 64]);
        assert_eq!(msg.get(Tag::NONC).unwrap(), &[0x55; 32]);
    }
}
