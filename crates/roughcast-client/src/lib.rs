//! The client side of roughcast: build requests, validate exchanges, and
//! talk to servers over UDP.

#![forbid(unsafe_code)]

pub mod request;
pub mod transport;
pub mod validation;

pub use request::{PreparedRequest, RequestBuilder};
pub use transport::{SendOptions, send_with_retries};
pub use validation::{Exchange, ValidatedResponse, ValidationError, validate_response};

use std::net::SocketAddr;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("no response from {0} after {1} attempts")]
    NoResponse(SocketAddr, u32),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Protocol(#[from] roughcast_protocol::Error),
}
