//! Builds the signed-response payload (SREP).
//!
//! The SREP layout changed across the draft series:
//!
//! | versions            | tags                         |
//! |---------------------|------------------------------|
//! | 0, draft 0, 3..11   | ROOT, MIDP, RADI             |
//! | drafts 1..2         | ROOT, MIDP, RADI, NONC       |
//! | 0x8000000c, v1      | VER, RADI, MIDP, VERS, ROOT  |

use crate::error::Error;
use crate::message::Message;
use crate::tag::Tag;
use crate::version::{SrepSchema, Version, supported_wire_values};
use crate::wire;

/// Policy radius. The server claims the true time lies within this many
/// seconds of MIDP.
pub const DEFAULT_RADIUS_SECONDS: u32 = 10;

pub struct SrepParams<'a> {
    pub version: Version,
    /// Merkle root over the batch, already truncated to the version's hash
    /// length.
    pub root: &'a [u8],
    /// Midpoint in the version's timescale (microseconds for version 0,
    /// seconds otherwise).
    pub midpoint: u64,
    /// Radius in seconds; scaled to the version's timescale here.
    pub radius_seconds: u32,
    /// Required by drafts 1-2, which sign the nonce inside the SREP.
    pub nonce: Option<&'a [u8]>,
}

/// Encode an SREP for the given version. The returned bytes are what gets
/// signed; callers keep them verbatim.
pub fn build_srep(params: &SrepParams) -> Result<Vec<u8>, Error> {
    if !params.version.is_supported() {
        return Err(Error::InputValidation("version is expired or unsupported"));
    }
    if params.radius_seconds == 0 {
        return Err(Error::InputValidation("radius must be positive"));
    }

    let profile = params.version.profile();
    let radius = profile.timescale.radius(params.radius_seconds);

    let mut srep = Message::with_capacity(5);
    srep.insert(Tag::ROOT, params.root)?;
    srep.insert(Tag::MIDP, &wire::encode_u64(params.midpoint))?;
    srep.insert(Tag::RADI, &wire::encode_u32(radius))?;

    match profile.srep_schema {
        SrepSchema::Plain => {}
        SrepSchema::WithNonce => {
            let nonce = params
                .nonce
                .ok_or(Error::InputValidation("this version signs the nonce"))?;
            srep.insert(Tag::NONC, nonce)?;
        }
        SrepSchema::Modern => {
            srep.insert(Tag::VER, &params.version.wire_bytes())?;
            srep.insert(Tag::VERS, &wire::encode_u32_list(&supported_wire_values()))?;
        }
    }

    Ok(srep.encode())
}
