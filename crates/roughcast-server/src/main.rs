//! The UDP server loop: a thin shell around [`Responder`].

use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use clap::Parser;
use data_encoding::HEXLOWER;
use roughcast_keys::{DEFAULT_VALIDITY_SECONDS, LongTermKey, Seed};
use roughcast_protocol::frame::MIN_PACKET_SIZE;
use roughcast_protocol::request::MAX_DATAGRAM_SIZE;
use roughcast_server::Responder;
use tracing::{debug, error, info, warn};

#[derive(Parser, Debug)]
#[command(version, about = "roughcast roughtime server")]
struct Args {
    /// IP address to listen on
    #[clap(short, long, env = "ROUGHCAST_INTERFACE", default_value = "0.0.0.0")]
    interface: String,

    /// UDP port to listen on
    #[clap(short, long, env = "ROUGHCAST_PORT", default_value = "2002")]
    port: u16,

    /// Maximum number of requests answered with one signature
    #[clap(
        short,
        long,
        value_name = "N",
        env = "ROUGHCAST_BATCH_SIZE",
        default_value_t = 64,
        value_parser = clap::value_parser!(u16).range(1..=1024)
    )]
    batch_size: u16,

    /// Hex seed of the long-term key; a random identity is generated when
    /// unset
    #[clap(short, long, env = "ROUGHCAST_SEED")]
    seed: Option<String>,

    /// Smallest request packet accepted, in bytes (0 disables the floor)
    #[clap(long, env = "ROUGHCAST_MIN_REQUEST_SIZE", default_value_t = MIN_PACKET_SIZE)]
    min_request_size: usize,

    /// Online key validity window, in seconds
    #[clap(long, env = "ROUGHCAST_VALIDITY", default_value_t = DEFAULT_VALIDITY_SECONDS)]
    validity: u64,

    /// Log at debug level
    #[clap(short, long, default_value_t = false)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let mut longterm = match &args.seed {
        Some(hex) => {
            let bytes = HEXLOWER
                .decode(hex.to_ascii_lowercase().as_bytes())
                .unwrap_or_else(|e| {
                    error!("seed is not valid hex: {e}");
                    std::process::exit(1);
                });
            let seed = Seed::new(&bytes).unwrap_or_else(|e| {
                error!("{e}");
                std::process::exit(1);
            });
            LongTermKey::from_seed(&seed).unwrap_or_else(|e| {
                error!("{e}");
                std::process::exit(1);
            })
        }
        None => {
            warn!("no seed given; generating a throwaway identity");
            LongTermKey::generate()
        }
    };

    info!("long-term public key: {longterm}");
    info!("srv value: {}", HEXLOWER.encode(longterm.srv_value()));

    let mut responder = Responder::new(&mut longterm);
    responder.set_min_request_size(args.min_request_size);

    let addr = format!("{}:{}", args.interface, args.port);
    let socket = UdpSocket::bind(&addr).unwrap_or_else(|e| {
        error!("cannot bind {addr}: {e}");
        std::process::exit(1);
    });
    socket
        .set_read_timeout(Some(Duration::from_millis(250)))
        .expect("read timeout is valid");
    info!("listening on {addr}");

    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst))
        .expect("ctrl-c handler installs once");

    let mut minted_at = Instant::now();
    let remint_after = Duration::from_secs(args.validity.max(2) / 2);

    let mut batch: Vec<Vec<u8>> = Vec::with_capacity(args.batch_size as usize);
    let mut sources: Vec<SocketAddr> = Vec::with_capacity(args.batch_size as usize);
    let mut buf = [0u8; MAX_DATAGRAM_SIZE];

    while running.load(Ordering::SeqCst) {
        if minted_at.elapsed() >= remint_after {
            responder.remint(&mut longterm, args.validity);
            minted_at = Instant::now();
            info!(
                "rotated online key: {}",
                HEXLOWER.encode(&responder.online_public_key())
            );
        }

        batch.clear();
        sources.clear();

        // block for the first datagram, then drain whatever else is queued
        match socket.recv_from(&mut buf) {
            Ok((len, src)) => {
                batch.push(buf[..len].to_vec());
                sources.push(src);
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                continue;
            }
            Err(e) => {
                error!("recv failed: {e}");
                continue;
            }
        }

        socket
            .set_nonblocking(true)
            .expect("nonblocking toggles cleanly");
        while batch.len() < args.batch_size as usize {
            match socket.recv_from(&mut buf) {
                Ok((len, src)) => {
                    batch.push(buf[..len].to_vec());
                    sources.push(src);
                }
                Err(_) => break,
            }
        }
        socket
            .set_nonblocking(false)
            .expect("nonblocking toggles cleanly");

        let responses = responder.respond_batch(&batch);
        let mut sent = 0usize;
        for (response, src) in responses.iter().zip(&sources) {
            match response {
                Some(bytes) => match socket.send_to(bytes, src) {
                    Ok(_) => sent += 1,
                    Err(e) => warn!("send to {src} failed: {e}"),
                },
                None => debug!("dropped unanswerable request from {src}"),
            }
        }

        debug!("batch of {}: {} answered", batch.len(), sent);
    }

    info!("shutting down");
}
