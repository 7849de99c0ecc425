//! Short-lived online keys and the delegation certificates that authorize
//! them.
//!
//! One mint produces one online key and three CERT encodings, because the
//! protocol eras disagree on two things: version 0 stamps the delegation
//! window in microseconds where everything later uses seconds, and the
//! current draft dropped the trailing dashes from the delegation signature
//! context. `cert_for` picks the right encoding per negotiated version.

use std::time::{SystemTime, UNIX_EPOCH};

use roughcast_protocol::PUBKEY_LENGTH;
use roughcast_protocol::SIGNATURE_LENGTH;
use roughcast_protocol::version::{CTX_DELE, CTX_DELE_LEGACY, CTX_SREP, Timescale, Version};

use crate::longterm::LongTermKey;
use crate::signer::ContextSigner;

/// How long a freshly minted delegation lasts.
pub const DEFAULT_VALIDITY_SECONDS: u64 = 3_600;

/// The delegated ephemeral key that signs SREPs.
pub struct OnlineKey {
    signer: ContextSigner,
}

impl OnlineKey {
    pub fn generate() -> OnlineKey {
        OnlineKey {
            signer: ContextSigner::generate(),
        }
    }

    pub fn public_key_bytes(&self) -> [u8; PUBKEY_LENGTH] {
        self.signer.public_key_bytes()
    }

    /// Sign an encoded SREP with the response-signature context.
    pub fn sign_srep(&mut self, srep_bytes: &[u8]) -> [u8; SIGNATURE_LENGTH] {
        self.signer.sign_with_context(CTX_SREP, srep_bytes)
    }
}

/// An online key plus the delegation certificates covering every protocol
/// era, minted together at server start or on the rotation cadence.
pub struct CertBundle {
    online: OnlineKey,
    /// Version 0: microsecond window, legacy context.
    classic_cert: Vec<u8>,
    /// Drafts through 0x8000000b: second window, legacy context.
    legacy_cert: Vec<u8>,
    /// 0x8000000c and the v1 value: second window, current context.
    modern_cert: Vec<u8>,
}

impl CertBundle {
    /// Mint a fresh online key valid from now for `validity_seconds`.
    pub fn mint(longterm: &mut LongTermKey, validity_seconds: u64) -> CertBundle {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before the epoch")
            .as_secs();

        CertBundle::mint_with_window(longterm, now, now + validity_seconds)
    }

    /// Mint with explicit validity bounds, in epoch seconds.
    pub fn mint_with_window(
        longterm: &mut LongTermKey,
        mint_seconds: u64,
        maxt_seconds: u64,
    ) -> CertBundle {
        let online = OnlineKey::generate();
        let online_pub = online.public_key_bytes();

        let classic_cert = longterm.make_cert(
            CTX_DELE_LEGACY,
            &online_pub,
            mint_seconds * 1_000_000,
            maxt_seconds * 1_000_000,
        );
        let legacy_cert = longterm.make_cert(CTX_DELE_LEGACY, &online_pub, mint_seconds, maxt_seconds);
        let modern_cert = longterm.make_cert(CTX_DELE, &online_pub, mint_seconds, maxt_seconds);

        CertBundle {
            online,
            classic_cert,
            legacy_cert,
            modern_cert,
        }
    }

    /// The CERT bytes to embed in a response for `version`.
    pub fn cert_for(&self, version: Version) -> &[u8] {
        let profile = version.profile();

        if profile.dele_context == CTX_DELE {
            &self.modern_cert
        } else if profile.timescale == Timescale::Microseconds {
            &self.classic_cert
        } else {
            &self.legacy_cert
        }
    }

    pub fn online_key(&self) -> &OnlineKey {
        &self.online
    }

    pub fn sign_srep(&mut self, srep_bytes: &[u8]) -> [u8; SIGNATURE_LENGTH] {
        self.online.sign_srep(srep_bytes)
    }
}
