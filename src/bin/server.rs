//! EmberKV Server Binary
//!
//! Replays the log and serves the reactor until the process is killed.

use std::path::PathBuf;

use clap::Parser;
use emberkv::wal::WalRecovery;
use emberkv::{Config, Events, Server};
use tracing_subscriber::{fmt, EnvFilter};

/// EmberKV Server
#[derive(Parser, Debug)]
#[command(name = "emberkv-server")]
#[command(about = "Single-threaded key-value server with a durable append-only log")]
#[command(version)]
struct Args {
    /// Record file replayed at startup and appended to on every SET
    #[arg(short = 'f', long, default_value = "logfile.log")]
    log_file: PathBuf,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "0.0.0.0:1234")]
    listen: String,

    /// Bytes read from a socket per syscall
    #[arg(long, default_value = "1024")]
    read_chunk: usize,

    /// Readiness events collected per poll
    #[arg(long, default_value = "1024")]
    event_capacity: usize,

    /// Validate the log file, print replay stats and exit
    #[arg(long)]
    verify: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,emberkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();

    if args.verify {
        match WalRecovery::verify(&args.log_file) {
            Ok(result) => {
                println!(
                    "{}: {} records, {} bytes, OK",
                    args.log_file.display(),
                    result.records_recovered,
                    result.bytes_read
                );
                return;
            }
            Err(e) => {
                tracing::error!("Log verification failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    tracing::info!("EmberKV Server v{}", emberkv::VERSION);
    tracing::info!("Log file: {}", args.log_file.display());
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let config = Config::builder()
        .log_path(&args.log_file)
        .listen_addr(&args.listen)
        .read_chunk_size(args.read_chunk)
        .event_capacity(args.event_capacity)
        .build();

    let events = match Events::with_capacity(config.event_capacity) {
        Ok(events) => events,
        Err(e) => {
            tracing::error!("Failed to create reactor: {}", e);
            std::process::exit(1);
        }
    };

    // Recovery happens here, before the listener exists
    let _server = match Server::bind(&config, &events) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = events.run() {
        tracing::error!("Reactor failed: {}", e);
        std::process::exit(1);
    }
}
