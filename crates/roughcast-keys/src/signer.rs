//! Context-prefixed Ed25519 signing and verification.
//!
//! Roughtime signatures are computed over `context || data` where the
//! context is a NUL-terminated ASCII literal naming the layer being
//! signed. The signer keeps one buffer alive across calls so the prefix
//! concatenation costs nothing on the batch hot path.

use std::fmt::{self, Debug, Formatter};

use aws_lc_rs::signature::{ED25519, Ed25519KeyPair, KeyPair, UnparsedPublicKey};
use data_encoding::HEXLOWER;
use roughcast_protocol::{PUBKEY_LENGTH, SIGNATURE_LENGTH};

use crate::KeyError;
use crate::seed::Seed;

const INITIAL_BUF_SIZE: usize = 1024;

/// An Ed25519 key pair that signs `context || data` messages.
///
/// Each signer owns its buffer, so a signer must not be shared between
/// threads mid-signature; give each worker its own.
pub struct ContextSigner {
    keypair: Ed25519KeyPair,
    buf: Vec<u8>,
}

impl ContextSigner {
    /// Derive the key pair from a 32-byte seed (RFC 8032 expansion).
    pub fn from_seed(seed: &Seed) -> Result<ContextSigner, KeyError> {
        let keypair = Ed25519KeyPair::from_seed_unchecked(seed.expose())
            .map_err(|e| KeyError::Rejected(e.to_string()))?;

        Ok(ContextSigner {
            keypair,
            buf: Vec::with_capacity(INITIAL_BUF_SIZE),
        })
    }

    /// A fresh random key pair.
    pub fn generate() -> ContextSigner {
        ContextSigner::from_seed(&Seed::new_random()).expect("random seed is valid")
    }

    pub fn public_key_bytes(&self) -> [u8; PUBKEY_LENGTH] {
        self.keypair
            .public_key()
            .as_ref()
            .try_into()
            .expect("Ed25519 public key is 32 bytes")
    }

    /// Sign `context || data`. Deterministic: the same inputs always yield
    /// the same 64 bytes.
    pub fn sign_with_context(&mut self, context: &[u8], data: &[u8]) -> [u8; SIGNATURE_LENGTH] {
        self.buf.clear();
        self.buf.extend_from_slice(context);
        self.buf.extend_from_slice(data);

        self.keypair
            .sign(&self.buf)
            .as_ref()
            .try_into()
            .expect("Ed25519 signature is 64 bytes")
    }

    /// Sign bare data (an empty context).
    pub fn sign(&mut self, data: &[u8]) -> [u8; SIGNATURE_LENGTH] {
        self.sign_with_context(&[], data)
    }
}

impl Debug for ContextSigner {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ContextSigner({})", HEXLOWER.encode(&self.public_key_bytes()))
    }
}

/// Verify an Ed25519 signature over `context || data`.
pub fn verify_with_context(
    context: &[u8],
    data: &[u8],
    public_key: &[u8; PUBKEY_LENGTH],
    signature: &[u8],
) -> bool {
    let mut message = Vec::with_capacity(context.len() + data.len());
    message.extend_from_slice(context);
    message.extend_from_slice(data);

    UnparsedPublicKey::new(&ED25519, public_key)
        .verify(&message, signature)
        .is_ok()
}
