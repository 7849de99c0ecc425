//! Client-side request construction: version offer, random nonce, and the
//! optional SRV binding to one server.

use roughcast_common::crypto::{random_nonce, srv_commitment};
use roughcast_protocol::request::{DEFAULT_MESSAGE_SIZE, RequestParams, build_request};
use roughcast_protocol::version::{FIDUCIAL, Version, choose_version};

use crate::ClientError;

/// A request ready to send, along with what the client must remember to
/// validate the response later.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub packet: Vec<u8>,
    pub nonce: Vec<u8>,
    pub version: Version,
}

/// Builds requests. With no customization you get the fiducial version, a
/// random nonce of the right length, and a 1024-byte message.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    versions: Vec<u32>,
    nonce: Option<Vec<u8>>,
    msg_size: usize,
    server_public_key: Option<[u8; 32]>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> RequestBuilder {
        RequestBuilder {
            versions: vec![FIDUCIAL.wire_value()],
            nonce: None,
            msg_size: DEFAULT_MESSAGE_SIZE,
            server_public_key: None,
        }
    }

    /// Offer these versions, in this order.
    pub fn versions(mut self, versions: &[u32]) -> Self {
        self.versions = versions.to_vec();
        self
    }

    /// Use a fixed nonce instead of a random one.
    pub fn nonce(mut self, nonce: &[u8]) -> Self {
        self.nonce = Some(nonce.to_vec());
        self
    }

    /// Pad the message to exactly this many bytes.
    pub fn msg_size(mut self, msg_size: usize) -> Self {
        self.msg_size = msg_size;
        self
    }

    /// Bind the request to the server with this long-term public key by
    /// including its SRV commitment (when the version supports SRV).
    pub fn server_public_key(mut self, public_key: [u8; 32]) -> Self {
        self.server_public_key = Some(public_key);
        self
    }

    pub fn build(self) -> Result<PreparedRequest, ClientError> {
        let negotiated = choose_version(Some(&self.versions));
        let nonce = match self.nonce {
            Some(nonce) => nonce,
            None => random_nonce(negotiated.profile().nonce_len),
        };

        let srv = self.server_public_key.map(|key| srv_commitment(&key));
        let params = RequestParams {
            versions: &self.versions,
            nonce: &nonce,
            msg_size: self.msg_size,
            srv: srv.as_ref().map(|s| s.as_slice()),
        };
        let (packet, version) = build_request(&params)?;

        Ok(PreparedRequest {
            packet,
            nonce,
            version,
        })
    }
}
