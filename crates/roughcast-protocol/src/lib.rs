//! The Roughtime wire format, across every deployed flavor of it.
//!
//! This crate is the pure-data core: tags, the TLV message map, packet
//! framing, the version policy table, and the request/SREP/response
//! layouts. It performs no cryptography and no I/O; the merkle, keys,
//! server, and client crates build on it.

// The protocol crate uses only safe Rust.
#![forbid(unsafe_code)]

pub mod cursor;
pub mod error;
pub mod frame;
pub mod message;
pub mod request;
pub mod response;
pub mod srep;
pub mod tag;
pub mod version;
pub mod wire;

pub use error::Error;
pub use message::{Message, Value};
pub use tag::Tag;
pub use version::Version;

/// Size (in bytes) of an Ed25519 public key.
pub const PUBKEY_LENGTH: usize = 32;

/// Size (in bytes) of an Ed25519 signature.
pub const SIGNATURE_LENGTH: usize = 64;

/// Size (in bytes) of the seed a private key is derived from.
pub const SEED_LENGTH: usize = 32;
