use thiserror::Error;

use crate::tag::Tag;

/// Everything that can go wrong while encoding, decoding, or validating
/// Roughtime wire data. Validation of a full client/server exchange has its
/// own error type in the client crate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("truncated: {needed} bytes needed, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("packet magic is not 'ROUGHTIM': {0:02x?}")]
    BadMagic([u8; 8]),

    #[error("bad length: {0}")]
    BadLength(LengthViolation),

    #[error("malformed message: {0}")]
    BadTlv(TlvViolation),

    #[error("bad tag: {0:02x?}")]
    BadTag([u8; 4]),

    #[error("invalid request: {0}")]
    InvalidRequest(RequestViolation),

    #[error("invalid response: missing tag {0}")]
    InvalidResponse(Tag),

    #[error("input validation: {0}")]
    InputValidation(&'static str),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LengthViolation {
    #[error("length {0} is not a multiple of four")]
    Unaligned(usize),

    #[error("declared {declared} bytes but {actual} are present")]
    DeclaredMismatch { declared: usize, actual: usize },

    #[error("{size} bytes is below the {floor}-byte minimum")]
    BelowMinimum { size: usize, floor: usize },
}

/// RFC 4.2 structural rules for the tag/offset header and value region.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TlvViolation {
    #[error("message claims {0} tags, limit is 1024")]
    TooManyTags(u32),

    #[error("offset at index {index} is not 4-byte aligned: {value}")]
    UnalignedOffset { index: u32, value: u32 },

    #[error("offset at index {index} decreases: {value}")]
    UnorderedOffset { index: u32, value: u32 },

    #[error("offset at index {index} is zero")]
    ZeroOffset { index: u32 },

    #[error("offset at index {index} points past the value region: {value}")]
    OutOfBoundsOffset { index: u32, value: u32 },

    #[error("value region length {0} is not a multiple of four")]
    UnalignedValues(usize),

    #[error("tag at index {index} is not strictly increasing: {tag}")]
    UnorderedTag { index: u32, tag: Tag },

    #[error("tag {0} is already present")]
    DuplicateTag(Tag),

    #[error("{0} bytes of unclaimed data after the header")]
    TrailingBytes(usize),
}

/// Request-validation failures, each its own kind so servers can account
/// for what clients get wrong.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequestViolation {
    #[error("no NONC tag")]
    MissingNonce,

    #[error("NONC must be {expected} bytes, got {actual}")]
    WrongNonceLength { expected: usize, actual: usize },

    #[error("framed request has no VER tag")]
    MissingVersions,

    #[error("VER list is empty")]
    EmptyVersions,

    #[error("VER lists {0} versions, limit is 32")]
    TooManyVersions(usize),

    #[error("VER list is not strictly ascending at index {0}")]
    UnorderedVersions(usize),

    #[error("no TYPE tag")]
    MissingType,

    #[error("TYPE value {0:#010x} is not a request")]
    WrongType(u32),

    #[error("SRV commitment does not match this server")]
    SrvMismatch,
}
