//! Turns raw request datagrams into signed response packets.
//!
//! The batch path is where one Ed25519 signature pays for the whole batch:
//! requests are grouped by negotiated version, each group gets one Merkle
//! tree, one SREP, and one signature, and every member's response reuses
//! them with its own index and sibling path.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use roughcast_keys::{CertBundle, DEFAULT_VALIDITY_SECONDS, LongTermKey};
use roughcast_merkle::{MerkleError, MerkleOptions, MerkleTree};
use roughcast_protocol::frame::MIN_PACKET_SIZE;
use roughcast_protocol::request::{MAX_DATAGRAM_SIZE, ParsedRequest, parse_request};
use roughcast_protocol::response::{ResponseParams, build_response};
use roughcast_protocol::srep::{DEFAULT_RADIUS_SECONDS, SrepParams, build_srep};
use roughcast_protocol::version::{LeafSource, Version};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("{0}")]
    Protocol(#[from] roughcast_protocol::Error),

    #[error("{0}")]
    Merkle(#[from] MerkleError),
}

/// Answers requests using a minted [`CertBundle`]. One `Responder` per
/// worker thread; nothing here is shared.
pub struct Responder {
    bundle: CertBundle,
    srv_value: [u8; 32],
    min_request_size: usize,
    radius_seconds: u32,
}

impl Responder {
    /// Mint a fresh online key against `longterm` and answer with it.
    pub fn new(longterm: &mut LongTermKey) -> Responder {
        let bundle = CertBundle::mint(longterm, DEFAULT_VALIDITY_SECONDS);
        Responder::with_bundle(bundle, *longterm.srv_value())
    }

    /// Answer with an existing bundle (rotation, tests).
    pub fn with_bundle(bundle: CertBundle, srv_value: [u8; 32]) -> Responder {
        Responder {
            bundle,
            srv_value,
            min_request_size: MIN_PACKET_SIZE,
            radius_seconds: DEFAULT_RADIUS_SECONDS,
        }
    }

    /// Replace the online key and certificates, e.g. on the rotation
    /// cadence.
    pub fn remint(&mut self, longterm: &mut LongTermKey, validity_seconds: u64) {
        self.bundle = CertBundle::mint(longterm, validity_seconds);
    }

    /// Change the anti-amplification floor (0 disables; tests).
    pub fn set_min_request_size(&mut self, min_request_size: usize) {
        self.min_request_size = min_request_size;
    }

    /// Answer a single request.
    pub fn respond(&mut self, request: &[u8]) -> Result<Vec<u8>, ServerError> {
        let parsed = parse_request(request, self.min_request_size, Some(&self.srv_value))?;
        let version = parsed.version;
        let profile = version.profile();

        let mut tree = MerkleTree::new(MerkleOptions::for_profile(&profile));
        tree.push_leaf(leaf_data(&parsed));
        let root = tree.compute_root()?;

        let srep = build_srep(&SrepParams {
            version,
            root: &root,
            midpoint: profile.timescale.from_epoch_micros(epoch_micros()),
            radius_seconds: self.radius_seconds,
            nonce: Some(&parsed.nonce),
        })?;

        let signature = self.bundle.sign_srep(&srep);
        let response = build_response(&ResponseParams {
            version,
            srep: &srep,
            signature: &signature,
            cert: self.bundle.cert_for(version),
            index: 0,
            path: &tree.path_for(0)?,
            nonce: &parsed.nonce,
        })?;

        Ok(response)
    }

    /// Answer a batch. The output has exactly one slot per input, in input
    /// order. A slot is `None` when its request failed to parse, its
    /// version cannot share an SREP (drafts 1 and 2), or its group failed
    /// internally; one bad request never poisons the rest.
    pub fn respond_batch(&mut self, requests: &[Vec<u8>]) -> Vec<Option<Vec<u8>>> {
        let mut responses: Vec<Option<Vec<u8>>> = vec![None; requests.len()];

        // group parseable requests by negotiated version, remembering
        // each request's original position
        let mut groups: BTreeMap<Version, Vec<(usize, ParsedRequest)>> = BTreeMap::new();
        for (position, request) in requests.iter().enumerate() {
            if request.len() > MAX_DATAGRAM_SIZE {
                continue;
            }
            if let Ok(parsed) =
                parse_request(request, self.min_request_size, Some(&self.srv_value))
            {
                groups
                    .entry(parsed.version)
                    .or_default()
                    .push((position, parsed));
            }
        }

        for (version, members) in groups {
            if !version.profile().batchable {
                continue;
            }
            self.respond_group(version, &members, &mut responses);
        }

        responses
    }

    /// One tree, one SREP, one signature for a same-version group. Errors
    /// leave the group's slots `None`.
    fn respond_group(
        &mut self,
        version: Version,
        members: &[(usize, ParsedRequest)],
        responses: &mut [Option<Vec<u8>>],
    ) {
        let profile = version.profile();

        let mut tree = MerkleTree::new(MerkleOptions::for_profile(&profile));
        for (_, parsed) in members {
            tree.push_leaf(leaf_data(parsed));
        }
        let Ok(root) = tree.compute_root() else {
            return;
        };

        let Ok(srep) = build_srep(&SrepParams {
            version,
            root: &root,
            midpoint: profile.timescale.from_epoch_micros(epoch_micros()),
            radius_seconds: self.radius_seconds,
            nonce: None,
        }) else {
            return;
        };

        // the single signature every response in this group shares
        let signature = self.bundle.sign_srep(&srep);
        let cert = self.bundle.cert_for(version);

        for (group_index, (position, parsed)) in members.iter().enumerate() {
            let Ok(path) = tree.path_for(group_index) else {
                continue;
            };
            let Ok(response) = build_response(&ResponseParams {
                version,
                srep: &srep,
                signature: &signature,
                cert,
                index: group_index as u32,
                path: &path,
                nonce: &parsed.nonce,
            }) else {
                continue;
            };

            debug_assert!(
                response.len() <= parsed.request.len(),
                "response larger than the request that solicited it"
            );
            responses[*position] = Some(response);
        }
    }

    pub fn online_public_key(&self) -> [u8; 32] {
        self.bundle.online_key().public_key_bytes()
    }

    pub fn srv_value(&self) -> &[u8; 32] {
        &self.srv_value
    }
}

fn leaf_data(parsed: &ParsedRequest) -> &[u8] {
    match parsed.version.profile().leaf_source {
        LeafSource::Nonce => &parsed.nonce,
        LeafSource::Packet => &parsed.request,
    }
}

fn epoch_micros() -> u64 {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before the epoch");

    now.as_secs() * 1_000_000 + u64::from(now.subsec_micros())
}
