use std::fmt::{self, Display, Formatter};

use crate::error::Error;
use crate::error::RequestViolation::{
    EmptyVersions, MissingNonce, MissingType, TooManyVersions, UnorderedVersions, WrongNonceLength,
    WrongType,
};
use crate::frame::Framing;
use crate::tag::Tag;
use crate::wire;

/// Prefixed to an SREP before signing or verifying its signature. Shared by
/// every protocol version.
pub const CTX_SREP: &[u8] = b"RoughTime v1 response signature\x00";

/// Prefixed to a DELE before signing or verifying the delegation, for
/// version `0x8000000c` and later.
pub const CTX_DELE: &[u8] = b"RoughTime v1 delegation signature\x00";

/// The delegation context of version 0 and the earlier drafts.
pub const CTX_DELE_LEGACY: &[u8] = b"RoughTime v1 delegation signature--\x00";

/// Upper bound on entries in a VER or VERS list.
pub const MAX_VERSIONS: usize = 32;

/// A recognized wire value of the Roughtime protocol version.
///
/// Values `0x80000005` and `0x80000007` are recognized but expired: they
/// parse, but are excluded from negotiation and response building.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Version {
    /// The original Google protocol: bare framing, 64-byte nonces,
    /// microsecond timestamps.
    Google = 0x0000_0000,
    /// Placeholder wire value for the final IETF RFC. Unreleased; treated
    /// as the fiducial profile when a peer offers it.
    Rfc = 0x0000_0001,
    /// Draft-zero sentinel: IETF message contents over Google framing.
    RfcDraft0 = 0x8000_0000,
    RfcDraft1 = 0x8000_0001,
    RfcDraft2 = 0x8000_0002,
    RfcDraft3 = 0x8000_0003,
    RfcDraft4 = 0x8000_0004,
    /// Expired.
    RfcDraft5 = 0x8000_0005,
    RfcDraft6 = 0x8000_0006,
    /// Expired.
    RfcDraft7 = 0x8000_0007,
    RfcDraft8 = 0x8000_0008,
    RfcDraft9 = 0x8000_0009,
    RfcDraft10 = 0x8000_000a,
    RfcDraft11 = 0x8000_000b,
    /// The current draft series wire value.
    RfcDraft12 = 0x8000_000c,
}

/// The version chosen when a client offers versions we know nothing about.
pub const FIDUCIAL: Version = Version::RfcDraft12;

/// Every version this implementation will negotiate and respond with, in
/// ascending wire-value order. Also the VERS list of modern responses.
pub const SUPPORTED: &[Version] = &[
    Version::Google,
    Version::Rfc,
    Version::RfcDraft0,
    Version::RfcDraft1,
    Version::RfcDraft2,
    Version::RfcDraft3,
    Version::RfcDraft4,
    Version::RfcDraft6,
    Version::RfcDraft8,
    Version::RfcDraft9,
    Version::RfcDraft10,
    Version::RfcDraft11,
    Version::RfcDraft12,
];

/// What is hashed at the base of the Merkle tree for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafSource {
    /// The client's nonce (all versions through `0x8000000b`).
    Nonce,
    /// The client's entire request packet, framing included.
    Packet,
}

/// Sibling placement when combining Merkle nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeOrder {
    /// Even index on the left. Matches Cloudflare and the drafts.
    Natural,
    /// The reverse; seen from some Google-era servers.
    Mirrored,
}

/// Units of MIDP, MINT, MAXT, and RADI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timescale {
    Seconds,
    Microseconds,
}

impl Timescale {
    /// Convert a wall-clock reading in microseconds to this scale.
    pub const fn from_epoch_micros(&self, micros: u64) -> u64 {
        match self {
            Timescale::Microseconds => micros,
            Timescale::Seconds => micros / 1_000_000,
        }
    }

    /// A radius given in seconds, in this scale.
    pub const fn radius(&self, seconds: u32) -> u32 {
        match self {
            Timescale::Microseconds => seconds * 1_000_000,
            Timescale::Seconds => seconds,
        }
    }
}

/// Which tags an SREP carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrepSchema {
    /// ROOT, MIDP, RADI.
    Plain,
    /// ROOT, MIDP, RADI, NONC. Drafts 1 and 2; putting the nonce inside
    /// the signed payload precludes batching.
    WithNonce,
    /// VER, RADI, MIDP, VERS, ROOT.
    Modern,
}

/// Which top-level tags a response carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSchema {
    /// SREP, SIG, INDX, PATH, CERT.
    Classic,
    /// SREP, SIG, VER, CERT, INDX, PATH.
    Early,
    /// SIG, NONC, TYPE, PATH, VER, SREP, CERT, INDX.
    Draft,
    /// SIG, NONC, TYPE, PATH, SREP, CERT, INDX.
    Modern,
}

/// Everything version-dependent, resolved in one lookup. All wire-shape
/// decisions flow from this table; nothing else branches on version
/// numerics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionProfile {
    pub nonce_len: usize,
    pub pad_tag: Tag,
    pub hash_len: usize,
    pub tree_order: TreeOrder,
    pub leaf_source: LeafSource,
    pub timescale: Timescale,
    pub framing: Framing,
    pub srep_schema: SrepSchema,
    pub response_schema: ResponseSchema,
    pub dele_context: &'static [u8],
    /// Whether the request carries a VER tag.
    pub has_ver_tag: bool,
    /// Whether a batch may share one SREP across requests.
    pub batchable: bool,
    /// Whether requests may bind to a server via SRV.
    pub accepts_srv: bool,
    /// Whether TYPE is mandatory in requests and responses.
    pub requires_type: bool,
    /// Whether the VER list must be nonempty, bounded, and ascending.
    pub strict_version_list: bool,
}

const GOOGLE_PROFILE: VersionProfile = VersionProfile {
    nonce_len: 64,
    pad_tag: Tag::PAD_CLASSIC,
    hash_len: 64,
    tree_order: TreeOrder::Natural,
    leaf_source: LeafSource::Nonce,
    timescale: Timescale::Microseconds,
    framing: Framing::Bare,
    srep_schema: SrepSchema::Plain,
    response_schema: ResponseSchema::Classic,
    dele_context: CTX_DELE_LEGACY,
    has_ver_tag: false,
    batchable: true,
    accepts_srv: false,
    requires_type: false,
    strict_version_list: false,
};

const MODERN_PROFILE: VersionProfile = VersionProfile {
    nonce_len: 32,
    pad_tag: Tag::ZZZZ,
    hash_len: 32,
    tree_order: TreeOrder::Natural,
    leaf_source: LeafSource::Packet,
    timescale: Timescale::Seconds,
    framing: Framing::Framed,
    srep_schema: SrepSchema::Modern,
    response_schema: ResponseSchema::Modern,
    dele_context: CTX_DELE,
    has_ver_tag: true,
    batchable: true,
    accepts_srv: true,
    requires_type: true,
    strict_version_list: true,
};

impl Version {
    pub const fn wire_value(self) -> u32 {
        self as u32
    }

    pub const fn wire_bytes(self) -> [u8; 4] {
        (self as u32).to_le_bytes()
    }

    /// Look up a recognized wire value. Unknown values (including the gaps
    /// a client may offer) return `None`.
    pub const fn from_wire_value(value: u32) -> Option<Version> {
        match value {
            0x0000_0000 => Some(Version::Google),
            0x0000_0001 => Some(Version::Rfc),
            0x8000_0000 => Some(Version::RfcDraft0),
            0x8000_0001 => Some(Version::RfcDraft1),
            0x8000_0002 => Some(Version::RfcDraft2),
            0x8000_0003 => Some(Version::RfcDraft3),
            0x8000_0004 => Some(Version::RfcDraft4),
            0x8000_0005 => Some(Version::RfcDraft5),
            0x8000_0006 => Some(Version::RfcDraft6),
            0x8000_0007 => Some(Version::RfcDraft7),
            0x8000_0008 => Some(Version::RfcDraft8),
            0x8000_0009 => Some(Version::RfcDraft9),
            0x8000_000a => Some(Version::RfcDraft10),
            0x8000_000b => Some(Version::RfcDraft11),
            0x8000_000c => Some(Version::RfcDraft12),
            _ => None,
        }
    }

    pub fn is_supported(self) -> bool {
        SUPPORTED.contains(&self)
    }

    /// The policy table: every wire-shape property of this version.
    pub fn profile(self) -> VersionProfile {
        match self {
            Version::Google => GOOGLE_PROFILE,

            Version::Rfc | Version::RfcDraft12 => MODERN_PROFILE,

            // IETF contents over Google framing
            Version::RfcDraft0 => VersionProfile {
                nonce_len: 64,
                pad_tag: Tag::PAD,
                hash_len: 32,
                timescale: Timescale::Seconds,
                framing: Framing::Bare,
                has_ver_tag: false,
                leaf_source: LeafSource::Nonce,
                srep_schema: SrepSchema::Plain,
                response_schema: ResponseSchema::Classic,
                dele_context: CTX_DELE_LEGACY,
                accepts_srv: false,
                requires_type: false,
                strict_version_list: false,
                ..MODERN_PROFILE
            },

            Version::RfcDraft1 | Version::RfcDraft2 => VersionProfile {
                nonce_len: 64,
                pad_tag: Tag::PAD,
                leaf_source: LeafSource::Nonce,
                srep_schema: SrepSchema::WithNonce,
                response_schema: ResponseSchema::Early,
                dele_context: CTX_DELE_LEGACY,
                batchable: false,
                accepts_srv: false,
                requires_type: false,
                strict_version_list: false,
                ..MODERN_PROFILE
            },

            Version::RfcDraft3 | Version::RfcDraft4 => VersionProfile {
                nonce_len: 64,
                pad_tag: Tag::PAD,
                leaf_source: LeafSource::Nonce,
                srep_schema: SrepSchema::Plain,
                response_schema: ResponseSchema::Draft,
                dele_context: CTX_DELE_LEGACY,
                accepts_srv: false,
                requires_type: false,
                strict_version_list: false,
                ..MODERN_PROFILE
            },

            // the nonce shrinks to 32 bytes at draft 5
            Version::RfcDraft5 | Version::RfcDraft6 | Version::RfcDraft7 => VersionProfile {
                pad_tag: Tag::PAD,
                leaf_source: LeafSource::Nonce,
                srep_schema: SrepSchema::Plain,
                response_schema: ResponseSchema::Draft,
                dele_context: CTX_DELE_LEGACY,
                accepts_srv: false,
                requires_type: false,
                strict_version_list: false,
                ..MODERN_PROFILE
            },

            Version::RfcDraft8 | Version::RfcDraft9 => VersionProfile {
                leaf_source: LeafSource::Nonce,
                srep_schema: SrepSchema::Plain,
                response_schema: ResponseSchema::Draft,
                dele_context: CTX_DELE_LEGACY,
                accepts_srv: false,
                requires_type: false,
                strict_version_list: false,
                ..MODERN_PROFILE
            },

            // SRV arrives at 0x8000000a
            Version::RfcDraft10 | Version::RfcDraft11 => VersionProfile {
                leaf_source: LeafSource::Nonce,
                srep_schema: SrepSchema::Plain,
                response_schema: ResponseSchema::Draft,
                dele_context: CTX_DELE_LEGACY,
                requires_type: false,
                strict_version_list: false,
                ..MODERN_PROFILE
            },
        }
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:#010x})", self, self.wire_value())
    }
}

/// Wire values of `SUPPORTED`, for VERS.
pub fn supported_wire_values() -> Vec<u32> {
    SUPPORTED.iter().map(|v| v.wire_value()).collect()
}

/// Negotiate a version from a client's offer.
///
/// No list at all means a Google-era client. An offer with no overlap
/// against `SUPPORTED` gets the fiducial version. The unreleased v1 value
/// wins whenever it is offered; otherwise the numerically largest overlap
/// does.
pub fn choose_version(client_versions: Option<&[u32]>) -> Version {
    let offered = match client_versions {
        None => return Version::Google,
        Some([]) => return Version::Google,
        Some(list) => list,
    };

    let mut best: Option<Version> = None;
    for &value in offered {
        let Some(version) = Version::from_wire_value(value) else {
            continue;
        };
        if !version.is_supported() {
            continue;
        }
        if version == Version::Rfc {
            return Version::Rfc;
        }
        if best.is_none_or(|b| version.wire_value() > b.wire_value()) {
            best = Some(version);
        }
    }

    best.unwrap_or(FIDUCIAL)
}

/// Check a request nonce for presence and exact length.
pub fn validate_nonce<'a>(version: Version, nonce: Option<&'a [u8]>) -> Result<&'a [u8], Error> {
    let expected = version.profile().nonce_len;
    match nonce {
        None => Err(Error::InvalidRequest(MissingNonce)),
        Some(n) if n.len() != expected => Err(Error::InvalidRequest(WrongNonceLength {
            expected,
            actual: n.len(),
        })),
        Some(n) => Ok(n),
    }
}

/// Check a request TYPE tag. Only the current draft requires one; earlier
/// versions ignore whatever is present.
pub fn validate_type(version: Version, type_bytes: Option<&[u8]>) -> Result<(), Error> {
    if !version.profile().requires_type {
        return Ok(());
    }

    match type_bytes {
        None => Err(Error::InvalidRequest(MissingType)),
        Some(bytes) => {
            let value = wire::decode_u32(bytes)?;
            if value != 0 {
                return Err(Error::InvalidRequest(WrongType(value)));
            }
            Ok(())
        }
    }
}

/// Check a version list for the constraints the current draft imposes:
/// nonempty, at most 32 entries, strictly ascending. Earlier versions get
/// the list back unexamined.
pub fn validate_versions(version: Version, versions: &[u32]) -> Result<(), Error> {
    if !version.profile().strict_version_list {
        return Ok(());
    }

    if versions.is_empty() {
        return Err(Error::InvalidRequest(EmptyVersions));
    }
    if versions.len() > MAX_VERSIONS {
        return Err(Error::InvalidRequest(TooManyVersions(versions.len())));
    }
    for (idx, pair) in versions.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(Error::InvalidRequest(UnorderedVersions(idx + 1)));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choose_version_defaults() {
        assert_eq!(choose_version(None), Version::Google);
        assert_eq!(choose_version(Some(&[])), Version::Google);
    }

    #[test]
    fn choose_version_takes_largest_overlap() {
        assert_eq!(
            choose_version(Some(&[0x8000_0001, 0x8000_000c])),
            Version::RfcDraft12
        );
        assert_eq!(
            choose_version(Some(&[0x8000_0008, 0x8000_0003])),
            Version::RfcDraft8
        );
        assert_eq!(choose_version(Some(&[0x0000_0000])), Version::Google);
    }

    #[test]
    fn choose_version_without_overlap_is_fiducial() {
        assert_eq!(choose_version(Some(&[0x9999_9999])), FIDUCIAL);
        // expired drafts don't count as overlap
        assert_eq!(choose_version(Some(&[0x8000_0005, 0x8000_0007])), FIDUCIAL);
    }

    #[test]
    fn choose_version_prefers_v1_release() {
        assert_eq!(
            choose_version(Some(&[0x0000_0001, 0x8000_000c])),
            Version::Rfc
        );
        assert_eq!(choose_version(Some(&[0x0000_0001])), Version::Rfc);
    }

    #[test]
    fn expired_versions_parse_but_are_unsupported() {
        for value in [0x8000_0005u32, 0x8000_0007] {
            let version = Version::from_wire_value(value).unwrap();
            assert!(!version.is_supported());
        }
        assert!(Version::RfcDraft6.is_supported());
    }

    #[test]
    fn unknown_values_are_unrecognized() {
        assert_eq!(Version::from_wire_value(0x8000_000d), None);
        assert_eq!(Version::from_wire_value(0x0000_0002), None);
        assert_eq!(Version::from_wire_value(u32::MAX), None);
    }

    #[test]
    fn nonce_lengths() {
        assert_eq!(Version::Google.profile().nonce_len, 64);
        assert_eq!(Version::RfcDraft1.profile().nonce_len, 64);
        assert_eq!(Version::RfcDraft4.profile().nonce_len, 64);
        assert_eq!(Version::RfcDraft6.profile().nonce_len, 32);
        assert_eq!(Version::RfcDraft11.profile().nonce_len, 32);
        assert_eq!(Version::RfcDraft12.profile().nonce_len, 32);
        assert_eq!(Version::Rfc.profile().nonce_len, 32);
    }

    #[test]
    fn pad_tags() {
        assert_eq!(Version::Google.profile().pad_tag, Tag::PAD_CLASSIC);
        assert_eq!(Version::RfcDraft1.profile().pad_tag, Tag::PAD);
        assert_eq!(Version::RfcDraft7.profile().pad_tag, Tag::PAD);
        assert_eq!(Version::RfcDraft8.profile().pad_tag, Tag::ZZZZ);
        assert_eq!(Version::RfcDraft12.profile().pad_tag, Tag::ZZZZ);
    }

    #[test]
    fn merkle_options() {
        let google = Version::Google.profile();
        assert_eq!(google.hash_len, 64);
        assert_eq!(google.tree_order, TreeOrder::Natural);

        for version in [Version::RfcDraft1, Version::RfcDraft11, Version::RfcDraft12] {
            let profile = version.profile();
            assert_eq!(profile.hash_len, 32);
            assert_eq!(profile.tree_order, TreeOrder::Natural);
        }
    }

    #[test]
    fn leaf_source_switches_at_the_current_draft() {
        assert_eq!(Version::Google.profile().leaf_source, LeafSource::Nonce);
        assert_eq!(Version::RfcDraft11.profile().leaf_source, LeafSource::Nonce);
        assert_eq!(
            Version::RfcDraft12.profile().leaf_source,
            LeafSource::Packet
        );
        assert_eq!(Version::Rfc.profile().leaf_source, LeafSource::Packet);
    }

    #[test]
    fn delegation_contexts() {
        assert_eq!(Version::Google.profile().dele_context, CTX_DELE_LEGACY);
        assert_eq!(Version::RfcDraft11.profile().dele_context, CTX_DELE_LEGACY);
        assert_eq!(Version::RfcDraft12.profile().dele_context, CTX_DELE);
        assert_eq!(Version::Rfc.profile().dele_context, CTX_DELE);
    }

    #[test]
    fn context_literals_are_nul_terminated() {
        assert_eq!(CTX_SREP.last(), Some(&0));
        assert_eq!(CTX_DELE.last(), Some(&0));
        assert_eq!(CTX_DELE_LEGACY.last(), Some(&0));
        assert_eq!(CTX_SREP.len(), 32);
        assert_eq!(CTX_DELE.len(), 34);
        assert_eq!(CTX_DELE_LEGACY.len(), 36);
    }

    #[test]
    fn early_drafts_cannot_batch() {
        assert!(!Version::RfcDraft1.profile().batchable);
        assert!(!Version::RfcDraft2.profile().batchable);
        assert!(Version::RfcDraft3.profile().batchable);
        assert!(Version::Google.profile().batchable);
        assert!(Version::RfcDraft12.profile().batchable);
    }

    #[test]
    fn srv_appears_at_draft_ten() {
        assert!(!Version::RfcDraft9.profile().accepts_srv);
        assert!(Version::RfcDraft10.profile().accepts_srv);
        assert!(Version::RfcDraft11.profile().accepts_srv);
        assert!(Version::RfcDraft12.profile().accepts_srv);
    }

    #[test]
    fn validate_nonce_lengths() {
        assert!(validate_nonce(Version::RfcDraft12, Some(&[0u8; 32])).is_ok());
        assert!(validate_nonce(Version::Google, Some(&[0u8; 64])).is_ok());

        assert!(matches!(
            validate_nonce(Version::RfcDraft12, Some(&[0u8; 64])),
            Err(Error::InvalidRequest(WrongNonceLength {
                expected: 32,
                actual: 64
            }))
        ));
        assert!(matches!(
            validate_nonce(Version::Google, None),
            Err(Error::InvalidRequest(MissingNonce))
        ));
    }

    #[test]
    fn validate_type_only_binds_modern_versions() {
        assert!(validate_type(Version::RfcDraft12, Some(&[0, 0, 0, 0])).is_ok());
        assert!(matches!(
            validate_type(Version::RfcDraft12, Some(&[1, 0, 0, 0])),
            Err(Error::InvalidRequest(WrongType(1)))
        ));
        assert!(matches!(
            validate_type(Version::RfcDraft12, None),
            Err(Error::InvalidRequest(MissingType))
        ));

        // earlier versions ignore TYPE entirely
        assert!(validate_type(Version::RfcDraft11, None).is_ok());
        assert!(validate_type(Version::Google, Some(&[9, 9, 9, 9])).is_ok());
    }

    #[test]
    fn validate_versions_constraints() {
        let v = Version::RfcDraft12;
        assert!(validate_versions(v, &[0x8000_000b, 0x8000_000c]).is_ok());

        assert!(matches!(
            validate_versions(v, &[]),
            Err(Error::InvalidRequest(EmptyVersions))
        ));

        let too_many: Vec<u32> = (0..33).collect();
        assert!(matches!(
            validate_versions(v, &too_many),
            Err(Error::InvalidRequest(TooManyVersions(33)))
        ));

        assert!(matches!(
            validate_versions(v, &[0x8000_000c, 0x8000_000b]),
            Err(Error::InvalidRequest(UnorderedVersions(1)))
        ));
        assert!(matches!(
            validate_versions(v, &[0x8000_000c, 0x8000_000c]),
            Err(Error::InvalidRequest(UnorderedVersions(1)))
        ));

        // earlier versions impose nothing
        assert!(validate_versions(Version::RfcDraft8, &[]).is_ok());
    }

    #[test]
    fn supported_list_is_ascending() {
        for pair in SUPPORTED.windows(2) {
            assert!(pair[0].wire_value() < pair[1].wire_value());
        }
        assert!(SUPPORTED.contains(&FIDUCIAL));
    }
}
