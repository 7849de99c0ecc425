//! Full client/server round trips, in-process: build requests, answer
//! them through the batch pipelines, and validate the exchanges the way a
//! real client would.

use std::time::{SystemTime, UNIX_EPOCH};

use roughcast_client::{
    Exchange, RequestBuilder, ValidationError, validate_response,
};
use roughcast_keys::{CertBundle, LongTermKey};
use roughcast_merkle::{MerkleOptions, root_from_path};
use roughcast_protocol::Version;
use roughcast_protocol::frame::{frame_message, unframe};
use roughcast_protocol::message::Message;
use roughcast_protocol::tag::Tag;
use roughcast_protocol::version::Timescale;
use roughcast_server::Responder;

/// Every version a server will negotiate, by wire value.
const ALL_VERSIONS: &[u32] = &[
    0x0000_0000,
    0x8000_0001,
    0x8000_0002,
    0x8000_0003,
    0x8000_0004,
    0x8000_0006,
    0x8000_0008,
    0x8000_0009,
    0x8000_000a,
    0x8000_000b,
    0x8000_000c,
];

fn now_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn validate<'a>(
    request: &'a [u8],
    response: &'a [u8],
    server_key: [u8; 32],
) -> Result<roughcast_client::ValidatedResponse, ValidationError> {
    validate_response(&Exchange {
        request,
        response,
        server_public_key: Some(server_key),
        observed_at: now_seconds(),
    })
}

#[test]
fn every_version_round_trips() {
    for &wire in ALL_VERSIONS {
        let mut longterm = LongTermKey::generate();
        let server_key = longterm.public_key_bytes();
        let mut responder = Responder::new(&mut longterm);

        let prepared = RequestBuilder::new()
            .versions(&[wire])
            .server_public_key(server_key)
            .build()
            .unwrap();
        assert_eq!(prepared.version.wire_value(), wire);

        let response = responder
            .respond(&prepared.packet)
            .unwrap_or_else(|e| panic!("respond failed for {wire:#010x}: {e}"));

        let validated = validate(&prepared.packet, &response, server_key)
            .unwrap_or_else(|e| panic!("validation failed for {wire:#010x}: {e}"));

        assert_eq!(validated.version.wire_value(), wire);
        assert!(validated.mint <= validated.midpoint);
        assert!(validated.midpoint <= validated.maxt);

        // timescale sanity: microseconds for version 0, seconds otherwise
        match validated.version.profile().timescale {
            Timescale::Microseconds => assert!(validated.midpoint > 1_000_000_000_000_000),
            Timescale::Seconds => assert!(validated.midpoint < 1_000_000_000_000),
        }
    }
}

#[test]
fn batch_of_128_validates_throughout() {
    let mut longterm = LongTermKey::generate();
    let server_key = longterm.public_key_bytes();
    let mut responder = Responder::new(&mut longterm);

    let prepared: Vec<_> = (0..128)
        .map(|_| {
            RequestBuilder::new()
                .server_public_key(server_key)
                .build()
                .unwrap()
        })
        .collect();
    let requests: Vec<Vec<u8>> = prepared.iter().map(|p| p.packet.clone()).collect();

    let responses = responder.respond_batch(&requests);
    assert_eq!(responses.len(), 128);

    let opts = MerkleOptions::for_profile(&Version::RfcDraft12.profile());

    for (i, (request, response)) in requests.iter().zip(&responses).enumerate() {
        let response = response.as_ref().unwrap_or_else(|| panic!("slot {i} empty"));
        validate(request, response, server_key)
            .unwrap_or_else(|e| panic!("slot {i} failed validation: {e}"));

        // the proof is positional: the same path under a flipped index
        // reconstructs a different root
        let (msg_bytes, _) = unframe(response, 0).unwrap();
        let top = Message::decode(msg_bytes).unwrap();
        let srep = top.nested(Tag::SREP).unwrap();
        let index = u64::from(top.u32_value(Tag::INDX).unwrap());
        let path = top.get(Tag::PATH).unwrap();
        let claimed_root = srep.get(Tag::ROOT).unwrap();

        let flipped = root_from_path(request, index ^ 1, path, opts).unwrap();
        assert_ne!(flipped.as_slice(), claimed_root, "slot {i}");
    }
}

#[test]
fn mixed_batch_preserves_order() {
    let cycle = [0x0000_0000u32, 0x8000_0008, 0x8000_000b, 0x8000_000c];

    let mut longterm = LongTermKey::generate();
    let server_key = longterm.public_key_bytes();
    let mut responder = Responder::new(&mut longterm);

    let prepared: Vec<_> = (0..128)
        .map(|i| {
            RequestBuilder::new()
                .versions(&[cycle[i % cycle.len()]])
                .server_public_key(server_key)
                .build()
                .unwrap()
        })
        .collect();
    let requests: Vec<Vec<u8>> = prepared.iter().map(|p| p.packet.clone()).collect();

    let responses = responder.respond_batch(&requests);
    assert_eq!(responses.len(), 128);

    for (i, (request, response)) in requests.iter().zip(&responses).enumerate() {
        let response = response.as_ref().unwrap_or_else(|| panic!("slot {i} empty"));
        let validated = validate(request, response, server_key)
            .unwrap_or_else(|e| panic!("slot {i} failed validation: {e}"));

        // output position i answers input position i
        assert_eq!(
            validated.version.wire_value(),
            cycle[i % cycle.len()],
            "slot {i} answered with the wrong version"
        );
    }
}

#[test]
fn malformed_batch_degrades_per_slot() {
    let mut longterm = LongTermKey::generate();
    let server_key = longterm.public_key_bytes();
    let mut responder = Responder::new(&mut longterm);

    let good_0 = RequestBuilder::new().build().unwrap();
    let good_3 = RequestBuilder::new().build().unwrap();
    let unbatchable_2 = RequestBuilder::new().versions(&[0x8000_0001]).build().unwrap();
    let unbatchable_4 = RequestBuilder::new().versions(&[0x8000_0001]).build().unwrap();

    let requests = vec![
        good_0.packet.clone(),
        vec![0x8f, 0x11, 0xa2, 0x3c],
        unbatchable_2.packet,
        good_3.packet.clone(),
        unbatchable_4.packet,
        vec![0x00, 0xff, 0x00, 0xff],
    ];

    let responses = responder.respond_batch(&requests);
    assert_eq!(responses.len(), 6);

    for i in [1, 2, 4, 5] {
        assert!(responses[i].is_none(), "slot {i} should be empty");
    }
    for i in [0, 3] {
        let response = responses[i].as_ref().unwrap();
        validate(&requests[i], response, server_key)
            .unwrap_or_else(|e| panic!("slot {i} failed validation: {e}"));
    }
}

#[test]
fn tampered_delegation_window_fails() {
    let mut longterm = LongTermKey::generate();
    let server_key = longterm.public_key_bytes();
    let mut responder = Responder::new(&mut longterm);

    let prepared = RequestBuilder::new()
        .server_public_key(server_key)
        .build()
        .unwrap();
    let response = responder.respond(&prepared.packet).unwrap();

    // rewrite MAXT inside the DELE and splice the response back together
    let (msg_bytes, _) = unframe(&response, 0).unwrap();
    let mut top = Message::decode(msg_bytes).unwrap();
    let mut cert = top.nested(Tag::CERT).unwrap();
    let mut dele = cert.nested(Tag::DELE).unwrap();

    let maxt = dele.u64_value(Tag::MAXT).unwrap();
    dele.set(Tag::MAXT, &(maxt + 1).to_le_bytes());
    cert.set(Tag::DELE, &dele.encode());
    top.set(Tag::CERT, &cert.encode());
    let tampered = frame_message(&top.encode());

    match validate(&prepared.packet, &tampered, server_key) {
        Err(ValidationError::BadDele { .. }) => (),
        other => panic!("expected BadDele, got {other:?}"),
    }
}

#[test]
fn wrong_longterm_key_fails() {
    let mut longterm = LongTermKey::generate();
    let mut responder = Responder::new(&mut longterm);

    let prepared = RequestBuilder::new().build().unwrap();
    let response = responder.respond(&prepared.packet).unwrap();

    // validates against the true key
    assert!(validate(&prepared.packet, &response, longterm.public_key_bytes()).is_ok());

    // an unrelated key cannot vouch for the delegation
    let unrelated = LongTermKey::generate().public_key_bytes();
    match validate(&prepared.packet, &response, unrelated) {
        Err(ValidationError::BadDele { .. }) => (),
        other => panic!("expected BadDele, got {other:?}"),
    }
}

#[test]
fn expired_delegation_fails() {
    let mut longterm = LongTermKey::generate();
    let server_key = longterm.public_key_bytes();

    // a delegation that ended ten seconds ago
    let now = now_seconds();
    let bundle = CertBundle::mint_with_window(&mut longterm, now - 7_200, now - 10);
    let mut responder = Responder::with_bundle(bundle, *longterm.srv_value());

    let prepared = RequestBuilder::new().build().unwrap();
    let response = responder.respond(&prepared.packet).unwrap();

    match validate(&prepared.packet, &response, server_key) {
        Err(ValidationError::ExpiredDele { midpoint, maxt, .. }) => {
            assert!(midpoint > maxt);
        }
        other => panic!("expected ExpiredDele, got {other:?}"),
    }
}

#[test]
fn tampered_nonce_fails() {
    let mut longterm = LongTermKey::generate();
    let server_key = longterm.public_key_bytes();
    let mut responder = Responder::new(&mut longterm);

    let prepared = RequestBuilder::new().build().unwrap();
    let response = responder.respond(&prepared.packet).unwrap();

    let (msg_bytes, _) = unframe(&response, 0).unwrap();
    let mut top = Message::decode(msg_bytes).unwrap();
    let mut nonce = top.get(Tag::NONC).unwrap().to_vec();
    nonce[0] ^= 0xff;
    top.set(Tag::NONC, &nonce);
    let tampered = frame_message(&top.encode());

    match validate(&prepared.packet, &tampered, server_key) {
        Err(ValidationError::BadNonce { .. }) => (),
        other => panic!("expected BadNonce, got {other:?}"),
    }
}

#[test]
fn responses_never_exceed_requests() {
    let mut longterm = LongTermKey::generate();
    let mut responder = Responder::new(&mut longterm);

    for &wire in ALL_VERSIONS {
        let prepared = RequestBuilder::new().versions(&[wire]).build().unwrap();
        let response = responder.respond(&prepared.packet).unwrap();
        assert!(
            response.len() <= prepared.packet.len(),
            "version {wire:#010x} amplifies: {} > {}",
            response.len(),
            prepared.packet.len()
        );
    }
}
