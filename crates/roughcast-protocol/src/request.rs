//! Build and parse client requests.
//!
//! Requests are padded up to a fixed size so that responses can never be
//! larger than the traffic that solicited them. Which tags appear depends
//! entirely on the negotiated version's profile.

use crate::error::Error;
use crate::error::RequestViolation::{MissingVersions, SrvMismatch};
use crate::frame::{Framing, frame_message, unframe};
use crate::message::Message;
use crate::tag::Tag;
use crate::version::{Version, choose_version, validate_nonce, validate_type, validate_versions};
use crate::wire;

/// Default size of the message part of a request. The packet is 12 bytes
/// longer when the version uses framing.
pub const DEFAULT_MESSAGE_SIZE: usize = 1024;

/// TYPE value of a request.
pub const REQUEST_TYPE_VALUE: [u8; 4] = [0, 0, 0, 0];

/// Datagrams larger than this are dropped before parsing.
pub const MAX_DATAGRAM_SIZE: usize = 1500;

pub struct RequestParams<'a> {
    /// The version offer, in the order it should appear in VER.
    pub versions: &'a [u32],
    /// Client nonce; must match the negotiated version's nonce length.
    pub nonce: &'a [u8],
    /// Exact size of the encoded message, reached by padding.
    pub msg_size: usize,
    /// 32-byte SRV commitment binding the request to one server. Only
    /// emitted when the negotiated version supports it.
    pub srv: Option<&'a [u8]>,
}

impl<'a> RequestParams<'a> {
    pub fn new(versions: &'a [u32], nonce: &'a [u8]) -> Self {
        Self {
            versions,
            nonce,
            msg_size: DEFAULT_MESSAGE_SIZE,
            srv: None,
        }
    }
}

/// Build the request packet for the version negotiated from
/// `params.versions`. Returns the bytes to put on the wire (framed unless
/// the version predates framing) and the version they were built for.
pub fn build_request(params: &RequestParams) -> Result<(Vec<u8>, Version), Error> {
    let version = choose_version(Some(params.versions));
    let profile = version.profile();

    if params.nonce.len() != profile.nonce_len {
        return Err(Error::InputValidation("nonce length does not fit version"));
    }
    if params.msg_size % 4 != 0 {
        return Err(Error::InputValidation("message size must be a multiple of four"));
    }

    let mut msg = Message::with_capacity(5);
    msg.insert(Tag::NONC, params.nonce)?;

    if profile.has_ver_tag {
        msg.insert(Tag::VER, &wire::encode_u32_list(params.versions))?;
    }
    if profile.requires_type {
        msg.insert(Tag::TYPE, &REQUEST_TYPE_VALUE)?;
    }
    if profile.accepts_srv
        && let Some(srv) = params.srv
    {
        msg.insert(Tag::SRV, srv)?;
    }

    // Two passes: an empty pad field first, to learn how much the header
    // grows, then the real padding.
    msg.insert(profile.pad_tag, &[])?;
    let base_size = msg.encoded_size();
    if base_size > params.msg_size {
        return Err(Error::InputValidation("message does not fit requested size"));
    }
    msg.set(profile.pad_tag, &vec![0u8; params.msg_size - base_size]);

    let encoded = msg.encode();
    debug_assert_eq!(encoded.len(), params.msg_size);

    let packet = match profile.framing {
        Framing::Framed => frame_message(&encoded),
        Framing::Bare => encoded,
    };

    Ok((packet, version))
}

/// A request the server has accepted.
#[derive(Debug, Clone)]
pub struct ParsedRequest {
    /// The negotiated version responses will use.
    pub version: Version,
    pub nonce: Vec<u8>,
    /// The raw VER list, when one was present.
    pub client_versions: Option<Vec<u32>>,
    pub message: Message,
    pub message_len: usize,
    /// The packet exactly as received; the Merkle leaf for versions that
    /// hash the whole request.
    pub request: Vec<u8>,
}

/// Parse and validate a request datagram.
///
/// `min_size` (0 disables) is the anti-amplification floor on the packet.
/// When `expected_srv` is given, a request carrying a different SRV
/// commitment is refused.
pub fn parse_request(
    buf: &[u8],
    min_size: usize,
    expected_srv: Option<&[u8]>,
) -> Result<ParsedRequest, Error> {
    let (msg_bytes, framing) = unframe(buf, min_size)?;
    let message = Message::decode(msg_bytes)?;

    let client_versions = match message.get(Tag::VER) {
        Some(bytes) => Some(wire::decode_u32_list(bytes)?),
        None if framing == Framing::Framed => {
            return Err(Error::InvalidRequest(MissingVersions));
        }
        None => None,
    };

    let version = choose_version(client_versions.as_deref());

    if let Some(versions) = &client_versions {
        validate_versions(version, versions)?;
    }
    let nonce = validate_nonce(version, message.get(Tag::NONC))?.to_vec();
    validate_type(version, message.get(Tag::TYPE))?;

    if let (Some(expected), Some(got)) = (expected_srv, message.get(Tag::SRV))
        && expected != got
    {
        return Err(Error::InvalidRequest(SrvMismatch));
    }

    Ok(ParsedRequest {
        version,
        nonce,
        client_versions,
        message_len: msg_bytes.len(),
        message,
        request: buf.to_vec(),
    })
}
