//! The server side of roughcast: parse requests, batch them into Merkle
//! trees, and assemble signed responses. The UDP loop lives in the binary;
//! everything here is synchronous and socket-free.

#![forbid(unsafe_code)]

pub mod responder;

pub use responder::{Responder, ServerError};
