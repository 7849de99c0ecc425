//! The client CLI: query one server, validate the exchange, print the time.

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::Parser;
use jiff::Timestamp;
use roughcast_client::{
    ClientError, Exchange, RequestBuilder, SendOptions, send_with_retries, validate_response,
};
use roughcast_common::encoding::try_decode_key;
use roughcast_protocol::version::{Timescale, Version};
use tracing::{debug, error};

#[derive(Parser, Debug)]
#[command(version, about = "roughcast roughtime client")]
struct Args {
    /// The server hostname or address to query
    host: String,

    /// The server UDP port
    #[clap(default_value = "2002")]
    port: u16,

    /// Protocol version to offer: "google" (0) or a draft number 1-12
    #[clap(short = 'P', long, default_value = "12")]
    protocol: String,

    /// Server long-term public key (hex or base64). Enables signature
    /// validation and binds the request via SRV.
    #[clap(short = 'k', long)]
    public_key: Option<String>,

    /// Seconds to wait for each attempt
    #[clap(short, long, default_value_t = 1)]
    timeout: u64,

    /// Additional attempts after the first
    #[clap(short, long, default_value_t = 2)]
    retries: u32,

    /// Accept responses from addresses other than the queried server
    #[clap(long, default_value_t = false)]
    any_source: bool,

    /// Print the result as JSON
    #[clap(short, long, default_value_t = false)]
    json: bool,

    /// Log at debug level
    #[clap(short, long, default_value_t = false)]
    verbose: bool,
}

#[derive(serde::Serialize)]
struct Report {
    server: String,
    version: String,
    midpoint: u64,
    radius: u32,
    timestamp: String,
    local_offset_seconds: f64,
    verified: bool,
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    match run(&args) {
        Ok(report) if args.json => {
            println!("{}", serde_json::to_string_pretty(&report).expect("report serializes"));
        }
        Ok(report) => {
            println!("{}: {} (±{}s, offset {:+.3}s{})",
                report.server,
                report.timestamp,
                report.radius,
                report.local_offset_seconds,
                if report.verified { "" } else { ", unverified" },
            );
        }
        Err(e) => {
            error!("{e}");
            std::process::exit(1);
        }
    }
}

fn run(args: &Args) -> Result<Report, ClientError> {
    let addr = resolve(&args.host, args.port)?;
    debug!("resolved {}:{} to {addr}", args.host, args.port);

    let public_key = match &args.public_key {
        Some(encoded) => Some(try_decode_key(encoded).unwrap_or_else(|e| {
            error!("cannot decode public key: {e}");
            std::process::exit(1);
        })),
        None => None,
    };

    let offered = parse_protocol(&args.protocol);
    let mut builder = RequestBuilder::new().versions(&[offered]);
    if let Some(key) = public_key {
        builder = builder.server_public_key(key);
    }
    let prepared = builder.build()?;
    debug!("negotiated version {}", prepared.version);

    let options = SendOptions {
        timeout: Duration::from_secs(args.timeout),
        retries: args.retries,
        verify_source: !args.any_source,
    };
    let (response, _) = send_with_retries(addr, &prepared.packet, &options)?;

    let observed_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before the epoch")
        .as_secs();

    let exchange = Exchange {
        request: &prepared.packet,
        response: &response,
        server_public_key: public_key,
        observed_at,
    };
    let validated = validate_response(&exchange).unwrap_or_else(|e| {
        error!("response failed validation: {e}");
        std::process::exit(1);
    });

    let midpoint_seconds = match validated.version.profile().timescale {
        Timescale::Seconds => validated.midpoint,
        Timescale::Microseconds => validated.midpoint / 1_000_000,
    };
    let timestamp = Timestamp::from_second(midpoint_seconds as i64)
        .map(|t| t.to_string())
        .unwrap_or_else(|_| format!("epoch+{midpoint_seconds}s"));

    let radius_seconds = match validated.version.profile().timescale {
        Timescale::Seconds => validated.radius,
        Timescale::Microseconds => validated.radius / 1_000_000,
    };

    Ok(Report {
        server: format!("{}:{}", args.host, args.port),
        version: validated.version.to_string(),
        midpoint: validated.midpoint,
        radius: radius_seconds,
        timestamp,
        local_offset_seconds: midpoint_seconds as f64 - observed_at as f64,
        verified: public_key.is_some(),
    })
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, ClientError> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| {
            ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no address for {host}"),
            ))
        })
}

fn parse_protocol(value: &str) -> u32 {
    match value.to_ascii_lowercase().as_str() {
        "0" | "google" | "classic" => Version::Google.wire_value(),
        "1" => 0x8000_0001,
        "2" => 0x8000_0002,
        "3" => 0x8000_0003,
        "4" => 0x8000_0004,
        "6" => 0x8000_0006,
        "8" => 0x8000_0008,
        "9" => 0x8000_0009,
        "10" => 0x8000_000a,
        "11" => 0x8000_000b,
        "12" | "ietf" | "draft" => 0x8000_000c,
        other => {
            error!("unknown protocol '{other}', using the current draft");
            0x8000_000c
        }
    }
}
