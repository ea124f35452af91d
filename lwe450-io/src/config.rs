//! Configuration for the LWE450 listener
//!
//! Loads configuration from a TOML file. Every field has a default, so the
//! listener also runs without a file; command line flags override both.

use crate::assembler::DEFAULT_MAX_REMAINDER;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub bus: BusConfig,
    pub gather: GatherConfig,
    pub recording: RecordingConfig,
    pub logging: LoggingConfig,
}

/// Message bus configuration (UDP multicast)
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BusConfig {
    /// Session id, selects multicast group `<group_base>.<session_id>`
    pub session_id: u8,
    /// Sender stamp attached to published envelopes
    pub sender_id: u32,
    /// First three octets of the multicast group (last octet is the session id)
    pub group_base: Ipv4Addr,
    /// Multicast port shared by all sessions
    pub port: u16,
    /// Multicast TTL for published datagrams
    pub ttl: u32,
}

/// Gather mode configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatherConfig {
    /// Receive buffer per read (bytes)
    pub recv_buffer_size: usize,
    /// Cap on unterminated bytes carried between chunks
    pub max_remainder: usize,
    /// Socket read timeout, bounds shutdown latency (ms)
    pub read_timeout_ms: u64,
    /// Delay before reconnecting a dropped TCP stream (ms)
    pub reconnect_delay_ms: u64,
}

/// Rotating daily log configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecordingConfig {
    /// Base path; files are written as `<stem>_YYYY-MM-DD.<ext>`
    pub path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            session_id: 111,
            sender_id: 1,
            group_base: Ipv4Addr::new(225, 0, 0, 0),
            port: 12175,
            ttl: 1,
        }
    }
}

impl Default for GatherConfig {
    fn default() -> Self {
        Self {
            recv_buffer_size: 65_536,
            max_remainder: DEFAULT_MAX_REMAINDER,
            read_timeout_ms: 500,
            reconnect_delay_ms: 1000,
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("LWE450/messages.txt"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl BusConfig {
    /// Multicast group for the configured session
    pub fn group(&self) -> Ipv4Addr {
        let [a, b, c, _] = self.group_base.octets();
        Ipv4Addr::new(a, b, c, self.session_id)
    }

    /// Multicast group and port for the configured session
    pub fn endpoint(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.group(), self.port))
    }
}

impl GatherConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl AppConfig {
    /// Load configuration from TOML file
    ///
    /// Missing sections and keys fall back to their defaults.
    ///
    /// # Example
    /// ```no_run
    /// use lwe450_io::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("lwe450.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
