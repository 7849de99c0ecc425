//! Validate a server's response against the request that solicited it.
//!
//! Signature checks run over the raw SREP and DELE bytes exactly as they
//! appeared on the wire; nothing signed is ever re-encoded. A valid
//! response does not prove the timestamp is *correct*, only that the
//! server committed to it, signed it with a properly delegated key, and
//! included this request in its batch.

use roughcast_keys::verify_with_context;
use roughcast_merkle::{MerkleError, MerkleOptions, verify_proof};
use roughcast_protocol::frame::unframe;
use roughcast_protocol::message::Message;
use roughcast_protocol::tag::Tag;
use roughcast_protocol::version::{CTX_SREP, LeafSource, Version};
use roughcast_protocol::{Error, PUBKEY_LENGTH};

/// One request/response round trip as the client observed it.
pub struct Exchange<'a> {
    /// The request packet exactly as sent.
    pub request: &'a [u8],
    /// The response packet exactly as received.
    pub response: &'a [u8],
    /// The server's claimed long-term public key. Without it the
    /// delegation signature cannot be checked and is skipped.
    pub server_public_key: Option<[u8; PUBKEY_LENGTH]>,
    /// Wall-clock seconds when the response arrived; kept for callers
    /// comparing server time against the local clock.
    pub observed_at: u64,
}

/// What a validated response asserts, in the version's timescale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedResponse {
    pub version: Version,
    pub midpoint: u64,
    pub radius: u32,
    pub mint: u64,
    pub maxt: u64,
}

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("returned nonce does not match the request")]
    BadNonce { expected: Vec<u8>, returned: Vec<u8> },

    #[error("request is not in the response's merkle tree")]
    BadRoot { computed: Vec<u8>, claimed: Vec<u8> },

    #[error("delegation signature does not verify")]
    BadDele { signature: Vec<u8> },

    #[error("response signature does not verify")]
    BadSrep { signature: Vec<u8> },

    #[error("midpoint {midpoint} outside delegation span ({mint}, {maxt})")]
    ExpiredDele { mint: u64, midpoint: u64, maxt: u64 },

    #[error("response version {0:#010x} is not recognized")]
    UnknownVersion(u32),

    #[error("{0}")]
    Protocol(#[from] Error),

    #[error("{0}")]
    Merkle(#[from] MerkleError),
}

/// Run the full validation pipeline over one exchange.
pub fn validate_response(exchange: &Exchange) -> Result<ValidatedResponse, ValidationError> {
    // decode the response; a bare message is acceptable
    let (msg_bytes, _) = unframe(exchange.response, 0)?;
    let top = Message::decode(msg_bytes)?;

    // raw signed submessages, byte-exact
    let srep_bytes = top
        .get(Tag::SREP)
        .ok_or(Error::InvalidResponse(Tag::SREP))?;
    let srep = Message::decode(srep_bytes)?;
    let cert = top.nested(Tag::CERT)?;
    let dele_bytes = cert
        .get(Tag::DELE)
        .ok_or(Error::InvalidResponse(Tag::DELE))?;
    let dele = Message::decode(dele_bytes)?;

    // the SREP's own VER wins, then the top-level VER, then version 0
    let version = response_version(&top, &srep)?;
    let profile = version.profile();

    // the nonce of the original request, also the merkle leaf for most
    // versions
    let request_nonce = request_nonce(exchange.request)?;

    // a returned nonce must echo ours
    let returned_nonce = top.get(Tag::NONC).or_else(|| srep.get(Tag::NONC));
    if let Some(returned) = returned_nonce
        && returned != request_nonce
    {
        return Err(ValidationError::BadNonce {
            expected: request_nonce,
            returned: returned.to_vec(),
        });
    }

    // the INDX and PATH must reconstruct SREP.ROOT from our leaf
    let index = top.u32_value(Tag::INDX)?;
    let path = top.get(Tag::PATH).ok_or(Error::InvalidResponse(Tag::PATH))?;
    let claimed_root = srep.get(Tag::ROOT).ok_or(Error::InvalidResponse(Tag::ROOT))?;
    let leaf_data: &[u8] = match profile.leaf_source {
        LeafSource::Nonce => &request_nonce,
        LeafSource::Packet => exchange.request,
    };

    let check = verify_proof(
        claimed_root,
        leaf_data,
        u64::from(index),
        path,
        MerkleOptions::for_profile(&profile),
    )?;
    if !check.ok {
        return Err(ValidationError::BadRoot {
            computed: check.reconstructed,
            claimed: claimed_root.to_vec(),
        });
    }

    // the long-term key vouches for the delegation
    let cert_sig = cert.get(Tag::SIG).ok_or(Error::InvalidResponse(Tag::SIG))?;
    if let Some(server_key) = &exchange.server_public_key
        && !verify_with_context(profile.dele_context, dele_bytes, server_key, cert_sig)
    {
        return Err(ValidationError::BadDele {
            signature: cert_sig.to_vec(),
        });
    }

    // the delegated online key vouches for the SREP
    let online_key: [u8; PUBKEY_LENGTH] = dele
        .get(Tag::PUBK)
        .ok_or(Error::InvalidResponse(Tag::PUBK))?
        .try_into()
        .map_err(|_| Error::InputValidation("PUBK is not 32 bytes"))?;
    let top_sig = top.get(Tag::SIG).ok_or(Error::InvalidResponse(Tag::SIG))?;
    if !verify_with_context(CTX_SREP, srep_bytes, &online_key, top_sig) {
        return Err(ValidationError::BadSrep {
            signature: top_sig.to_vec(),
        });
    }

    // the midpoint must lie inside the delegation span
    let midpoint = srep.u64_value(Tag::MIDP)?;
    let radius = srep.u32_value(Tag::RADI)?;
    let mint = dele.u64_value(Tag::MINT)?;
    let maxt = dele.u64_value(Tag::MAXT)?;
    if midpoint < mint || midpoint > maxt {
        return Err(ValidationError::ExpiredDele {
            mint,
            midpoint,
            maxt,
        });
    }

    Ok(ValidatedResponse {
        version,
        midpoint,
        radius,
        mint,
        maxt,
    })
}

fn response_version(top: &Message, srep: &Message) -> Result<Version, ValidationError> {
    let value = if srep.contains(Tag::VER) {
        Some(srep.u32_value(Tag::VER)?)
    } else if top.contains(Tag::VER) {
        Some(top.u32_value(Tag::VER)?)
    } else {
        None
    };

    match value {
        None => Ok(Version::Google),
        Some(value) => {
            Version::from_wire_value(value).ok_or(ValidationError::UnknownVersion(value))
        }
    }
}

fn request_nonce(request: &[u8]) -> Result<Vec<u8>, ValidationError> {
    let (msg_bytes, _) = unframe(request, 0)?;
    let message = Message::decode(msg_bytes)?;
    let nonce = message
        .get(Tag::NONC)
        .ok_or(Error::InvalidRequest(
            roughcast_protocol::error::RequestViolation::MissingNonce,
        ))?
        .to_vec();
    Ok(nonce)
}
