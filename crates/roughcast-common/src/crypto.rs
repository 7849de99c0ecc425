//! Hashing and randomness primitives shared across the project.

use aws_lc_rs::digest;
use roughcast_protocol::PUBKEY_LENGTH;

/// The byte prepended to a long-term public key when deriving its SRV
/// commitment.
pub const SRV_HASH_PREFIX: u8 = 0xff;

/// SHA-512 over an optional single prefix byte followed by `parts`,
/// truncated to the first `n` bytes. `n` must be 32 or 64.
pub fn sha512_trunc(n: usize, prefix: Option<u8>, parts: &[&[u8]]) -> Vec<u8> {
    assert!(n == 32 || n == 64, "output length must be 32 or 64, got {n}");

    let mut ctx = digest::Context::new(&digest::SHA512);
    if let Some(byte) = prefix {
        ctx.update(&[byte]);
    }
    for part in parts {
        ctx.update(part);
    }
    ctx.finish().as_ref()[..n].to_vec()
}

/// Cryptographically secure random bytes from the OS entropy source.
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut value = [0u8; N];
    aws_lc_rs::rand::fill(&mut value).expect("OS entropy source failed");
    value
}

/// A random nonce of the given length (32 or 64 depending on version).
pub fn random_nonce(len: usize) -> Vec<u8> {
    let mut value = vec![0u8; len];
    aws_lc_rs::rand::fill(&mut value).expect("OS entropy source failed");
    value
}

/// The SRV tag value binding a request to one server:
/// `SHA512(0xff || public_key)[0..32]`.
pub fn srv_commitment(public_key: &[u8; PUBKEY_LENGTH]) -> [u8; 32] {
    sha512_trunc(32, Some(SRV_HASH_PREFIX), &[public_key])
        .try_into()
        .expect("32-byte digest")
}
