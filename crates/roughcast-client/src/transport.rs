//! UDP transport with per-attempt timeout, retries, and optional source
//! verification.

use std::net::{SocketAddr, UdpSocket};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::ClientError;

/// Retry policy for one query. Defaults: 1 second per attempt, 2 retries
/// after the first attempt.
#[derive(Debug, Clone)]
pub struct SendOptions {
    pub timeout: Duration,
    pub retries: u32,
    /// Discard datagrams whose source address is not the queried server;
    /// they count as silence, not as an answer.
    pub verify_source: bool,
}

impl Default for SendOptions {
    fn default() -> Self {
        SendOptions {
            timeout: Duration::from_secs(1),
            retries: 2,
            verify_source: true,
        }
    }
}

/// Send `request` to `addr` and wait for a response, retrying on silence.
/// Returns the response bytes and the address they came from.
pub fn send_with_retries(
    addr: SocketAddr,
    request: &[u8],
    options: &SendOptions,
) -> Result<(Vec<u8>, SocketAddr), ClientError> {
    let bind_addr = if addr.is_ipv6() { "[::]:0" } else { "0.0.0.0:0" };
    let socket = UdpSocket::bind(bind_addr)?;

    let attempts = options.retries + 1;
    let mut buf = [0u8; 65_536];

    for attempt in 1..=attempts {
        debug!("sending {} bytes to {addr} (attempt {attempt}/{attempts})", request.len());
        trace_dump(request);
        socket.send_to(request, addr)?;

        let deadline = Instant::now() + options.timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            socket.set_read_timeout(Some(remaining))?;

            match socket.recv_from(&mut buf) {
                Ok((len, src)) => {
                    if options.verify_source && src != addr {
                        trace!("discarding {len} bytes from unexpected source {src}");
                        continue;
                    }
                    debug!("received {len} bytes from {src}");
                    trace_dump(&buf[..len]);
                    return Ok((buf[..len].to_vec(), src));
                }
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break;
                }
                Err(e) => return Err(ClientError::Io(e)),
            }
        }
    }

    Err(ClientError::NoResponse(addr, attempts))
}

fn trace_dump(data: &[u8]) {
    if tracing::enabled!(tracing::Level::TRACE) {
        let mut dump = Vec::new();
        if roughcast_common::encoding::hexdump(data, &mut dump).is_ok() {
            trace!("\n{}", String::from_utf8_lossy(&dump));
        }
    }
}
