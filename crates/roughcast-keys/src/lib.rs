//! Key material for Roughtime servers: the long-term identity, the
//! short-lived online keys it delegates to, and the per-era delegation
//! certificates that tie the two together.

#![forbid(unsafe_code)]

pub mod longterm;
pub mod online;
pub mod seed;
pub mod signer;

pub use longterm::LongTermKey;
pub use online::{CertBundle, DEFAULT_VALIDITY_SECONDS, OnlineKey};
pub use seed::Seed;
pub use signer::{ContextSigner, verify_with_context};

#[derive(thiserror::Error, Debug)]
pub enum KeyError {
    #[error("seed must be {expected} bytes, got {actual}")]
    WrongSeedLength { expected: usize, actual: usize },

    #[error("key material rejected: {0}")]
    Rejected(String),
}
