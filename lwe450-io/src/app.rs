//! Application orchestration for the LWE450 listener
//!
//! Two modes:
//!
//! - **gather**: read a UDP or TCP source, assemble sentences, publish them on
//!   the bus (or write them to disk when standalone)
//! - **log**: subscribe to the bus and write every sentence to disk
//!
//! Both run until the shared `running` flag is cleared (Ctrl-C).

use crate::assembler::{Lwe450Assembler, Sink};
use crate::bus::{BusPublisher, BusSubscriber};
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::recording::DailyFileSink;
use crate::sinks::{GatherOutput, GatherSink, LogRecorder};
use crate::transport::{TcpTransport, Transport, UdpTransport};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

/// Stream source protocol for gather mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SourceProtocol {
    /// Datagrams (unicast or multicast)
    #[default]
    Udp,
    /// Byte stream from a TCP server
    Tcp,
}

/// Gather mode parameters resolved from CLI and config
#[derive(Debug, Clone)]
pub struct GatherOptions {
    pub address: IpAddr,
    pub port: u16,
    pub interface: Option<Ipv4Addr>,
    pub protocol: SourceProtocol,
    /// Write to disk instead of publishing on the bus
    pub standalone: bool,
    pub verbose: bool,
}

/// Counters for one pumped stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub chunks: u64,
    pub bytes: u64,
    pub overflows: u64,
    /// The transport reported that the peer closed
    pub disconnected: bool,
}

/// Feed chunks from `transport` into `assembler` until stopped or disconnected
///
/// Each chunk is stamped with the wall clock when the read returns. Framing
/// overflows are logged and ingestion continues; other transport errors are
/// logged and retried after a short pause.
pub fn pump<T, S>(
    transport: &mut T,
    assembler: &mut Lwe450Assembler<S>,
    running: &AtomicBool,
    buffer: &mut [u8],
) -> PumpStats
where
    T: Transport + ?Sized,
    S: Sink,
{
    let mut stats = PumpStats::default();

    while running.load(Ordering::Relaxed) {
        let n = match transport.read(buffer) {
            Ok(0) => continue,
            Ok(n) => n,
            Err(Error::Disconnected) => {
                stats.disconnected = true;
                break;
            }
            Err(e) => {
                log::error!("Read error on {}: {}", transport.describe(), e);
                std::thread::sleep(Duration::from_millis(10));
                continue;
            }
        };
        let arrival = SystemTime::now();

        stats.chunks += 1;
        stats.bytes += n as u64;

        if let Err(e) = assembler.ingest(&buffer[..n], arrival) {
            stats.overflows += 1;
            log::warn!("{} on {}, buffer discarded", e, transport.describe());
        }
    }

    stats
}

/// Build the gatherer's sink from config and options
pub fn build_gather_sink(config: &AppConfig, options: &GatherOptions) -> Result<GatherSink> {
    let output = if options.standalone {
        GatherOutput::Disk(DailyFileSink::open(&config.recording.path)?)
    } else {
        GatherOutput::Bus(BusPublisher::new(
            config.bus.endpoint(),
            config.bus.sender_id,
            config.bus.ttl,
        )?)
    };
    Ok(GatherSink::new(output, options.verbose))
}

/// Run gather mode until `running` is cleared
pub fn run_gather(config: &AppConfig, options: &GatherOptions, running: &AtomicBool) -> Result<()> {
    if options.port == 0 {
        return Err(Error::InvalidParameter("port must be non-zero".to_string()));
    }

    let sink = build_gather_sink(config, options)?;
    let mut buffer = vec![0u8; config.gather.recv_buffer_size.max(1)];
    let max_remainder = config.gather.max_remainder;

    let sink = match options.protocol {
        SourceProtocol::Udp => {
            let mut transport = UdpTransport::bind(
                options.address,
                options.port,
                options.interface,
                config.gather.read_timeout(),
            )?;
            let mut assembler = Lwe450Assembler::with_max_remainder(sink, max_remainder);
            let stats = pump(&mut transport, &mut assembler, running, &mut buffer);
            log_stats(&transport.describe(), &stats);
            assembler.into_sink()
        }
        SourceProtocol::Tcp => {
            let peer = SocketAddr::new(options.address, options.port);
            let mut sink = sink;
            while running.load(Ordering::Relaxed) {
                let mut transport = match TcpTransport::connect(peer, config.gather.read_timeout()) {
                    Ok(t) => t,
                    Err(e) => {
                        log::warn!("Failed to connect to {}: {}", peer, e);
                        sleep_while_running(running, config.gather.reconnect_delay());
                        continue;
                    }
                };

                // Fresh assembler per connection: a new connection is a new stream
                let mut assembler = Lwe450Assembler::with_max_remainder(sink, max_remainder);
                let stats = pump(&mut transport, &mut assembler, running, &mut buffer);
                log_stats(&transport.describe(), &stats);
                sink = assembler.into_sink();

                if stats.disconnected {
                    log::warn!("{} closed, reconnecting", transport.describe());
                    sleep_while_running(running, config.gather.reconnect_delay());
                }
            }
            sink
        }
    };

    log::info!(
        "Gather stopped: {} sentences forwarded, {} failed",
        sink.forwarded(),
        sink.failed()
    );
    Ok(())
}

/// Run log mode until `running` is cleared
pub fn run_log(config: &AppConfig, verbose: bool, running: &AtomicBool) -> Result<()> {
    let mut subscriber =
        BusSubscriber::bind(config.bus.endpoint(), None, config.gather.read_timeout())?;
    let mut recorder = LogRecorder::new(DailyFileSink::open(&config.recording.path)?, verbose);

    let handled = subscriber.run(running, |envelope| {
        if let Err(e) = recorder.record(envelope) {
            log::warn!("Failed to record sentence: {}", e);
        }
    })?;

    log::info!(
        "Log stopped: {} envelopes received, {} recorded",
        handled,
        recorder.recorded()
    );
    Ok(())
}

/// Resolve the recording path override
pub fn recording_path(config: &AppConfig, path: Option<PathBuf>) -> PathBuf {
    path.unwrap_or_else(|| config.recording.path.clone())
}

fn log_stats(source: &str, stats: &PumpStats) {
    log::info!(
        "{}: {} chunks, {} bytes, {} framing overflows",
        source,
        stats.chunks,
        stats.bytes,
        stats.overflows
    );
}

fn sleep_while_running(running: &AtomicBool, total: Duration) {
    let step = Duration::from_millis(50);
    let mut slept = Duration::ZERO;
    while slept < total && running.load(Ordering::Relaxed) {
        std::thread::sleep(step);
        slept += step;
    }
}
