//! LWE450 listener daemon
//!
//! ## Modes
//!
//! - **gather**: connect to an LWE450 UDP (or TCP) stream, assemble sentences
//!   and publish them on the bus session. With `--standalone` the sentences
//!   are written straight to the daily log instead.
//! - **log**: subscribe to the bus session and write every sentence published
//!   by gatherers to the daily log.
//!
//! ## Usage
//!
//! ```bash
//! # Publish a multicast LWE450 feed on session 111
//! lwe450-io --cid 111 --id 1 gather -a 239.192.0.4 -p 60004
//!
//! # Same feed, straight to disk
//! lwe450-io -p /data/LWE450/messages.txt gather -a 239.192.0.4 -p 60004 --standalone
//!
//! # Record everything on session 111
//! lwe450-io --cid 111 log
//! ```

use clap::{Parser, Subcommand};
use lwe450_io::app::{self, GatherOptions, SourceProtocol};
use lwe450_io::config::AppConfig;
use lwe450_io::error::{Error, Result};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "lwe450-io")]
#[command(about = "LWE450 listener")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bus session id
    #[arg(short, long)]
    cid: Option<u8>,

    /// Identification id of this process (sender stamp)
    #[arg(short, long)]
    id: Option<u32>,

    /// Base path of the daily sentence log
    #[arg(short, long)]
    path: Option<PathBuf>,

    /// Echo sentences to stdout
    #[arg(long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Listen to an LWE450 stream and publish sentences on the bus
    Gather {
        /// IP address of the stream (multicast group or local unicast address)
        #[arg(short, long)]
        address: IpAddr,

        /// Port number of the stream
        #[arg(short, long)]
        port: u16,

        /// IP address of the interface to join the multicast group on
        #[arg(short, long)]
        interface: Option<Ipv4Addr>,

        /// Write sentences to the daily log instead of publishing on the bus
        #[arg(long)]
        standalone: bool,

        /// Stream protocol
        #[arg(long, value_enum, default_value = "udp")]
        protocol: SourceProtocol,
    },
    /// Record every sentence published on the bus to the daily log
    Log,
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };

    if let Some(cid) = cli.cid {
        config.bus.session_id = cid;
    }
    if let Some(id) = cli.id {
        config.bus.sender_id = id;
    }
    config.recording.path = app::recording_path(&config, cli.path.clone());

    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    log::info!("LWE450 listener v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!(
        "Bus session {} ({}), sender id {}",
        config.bus.session_id,
        config.bus.endpoint(),
        config.bus.sender_id
    );

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;

    match cli.command {
        Commands::Gather {
            address,
            port,
            interface,
            standalone,
            protocol,
        } => {
            let options = GatherOptions {
                address,
                port,
                interface,
                protocol,
                standalone,
                verbose: cli.verbose,
            };
            log::info!(
                "Gathering from {:?} {}:{} ({})",
                protocol,
                address,
                port,
                if standalone {
                    format!("standalone, log {}", config.recording.path.display())
                } else {
                    "publishing on bus".to_string()
                }
            );
            app::run_gather(&config, &options, &running)?;
        }
        Commands::Log => {
            log::info!("Logging bus to {}", config.recording.path.display());
            app::run_log(&config, cli.verbose, &running)?;
        }
    }

    log::info!("LWE450 listener stopped");
    Ok(())
}
