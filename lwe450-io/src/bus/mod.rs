//! Message bus for redistributing sentences between processes
//!
//! Gatherers publish every accepted sentence as an [`Envelope`] on a UDP
//! multicast group; loggers subscribe to the same group and record them.
//! A session id selects the group, so independent deployments on one network
//! do not see each other's traffic.
//!
//! Delivery is fire-and-forget: a lost datagram is a lost sentence.

pub mod envelope;

pub use envelope::{decode_frame, encode_frame, Envelope, LWE450_DATA_TYPE};

use crate::error::{Error, Result};
use crate::protocol::Message;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

/// Maximum datagram size accepted by the subscriber
const MAX_DATAGRAM_SIZE: usize = 65536;

/// Send buffer capacity (typical sentence ~150 bytes, allow headroom)
const SEND_BUFFER_CAPACITY: usize = 1024;

/// Publishes sentences on the bus
pub struct BusPublisher {
    socket: UdpSocket,
    target: SocketAddr,
    sender_stamp: u32,
    send_buffer: Vec<u8>,
}

impl BusPublisher {
    /// Create a publisher sending to `target`
    ///
    /// For a multicast target the TTL is applied and loopback is enabled so
    /// a logger on the same host receives the traffic.
    pub fn new(target: SocketAddr, sender_stamp: u32, ttl: u32) -> Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        if let IpAddr::V4(group) = target.ip() {
            if group.is_multicast() {
                socket.set_multicast_ttl_v4(ttl)?;
                socket.set_multicast_loop_v4(true)?;
            }
        }

        log::info!(
            "Bus publisher ready: {} (sender stamp {})",
            target,
            sender_stamp
        );

        Ok(Self {
            socket,
            target,
            sender_stamp,
            send_buffer: Vec::with_capacity(SEND_BUFFER_CAPACITY),
        })
    }

    /// Publish one sentence stamped with its arrival time
    pub fn send(&mut self, message: &Message, sample_time: SystemTime) -> Result<()> {
        let envelope =
            Envelope::from_message(message, sample_time, SystemTime::now(), self.sender_stamp);
        encode_frame(&envelope, &mut self.send_buffer)?;
        self.socket.send_to(&self.send_buffer, self.target)?;
        Ok(())
    }
}

/// Receives sentences from the bus
pub struct BusSubscriber {
    socket: UdpSocket,
    buffer: Vec<u8>,
}

impl BusSubscriber {
    /// Listen on `endpoint`
    ///
    /// A multicast endpoint binds the unspecified address on its port and
    /// joins the group on `interface` (any if `None`).
    pub fn bind(
        endpoint: SocketAddr,
        interface: Option<Ipv4Addr>,
        read_timeout: Duration,
    ) -> Result<Self> {
        let socket = match endpoint.ip() {
            IpAddr::V4(group) if group.is_multicast() => {
                let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, endpoint.port()))?;
                socket.join_multicast_v4(&group, &interface.unwrap_or(Ipv4Addr::UNSPECIFIED))?;
                socket
            }
            _ => UdpSocket::bind(endpoint)?,
        };
        socket.set_read_timeout(Some(read_timeout))?;

        log::info!("Bus subscriber listening on {}", endpoint);

        Ok(Self {
            socket,
            buffer: vec![0u8; MAX_DATAGRAM_SIZE],
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Wait for the next LWE450 envelope
    ///
    /// Returns `Ok(None)` on read timeout and for datagrams that are
    /// malformed or carry another data type; those are logged and skipped.
    pub fn recv(&mut self) -> Result<Option<Envelope>> {
        let len = match self.socket.recv(&mut self.buffer) {
            Ok(len) => len,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        match decode_frame(&self.buffer[..len]) {
            Ok(envelope) if envelope.is_lwe450() => Ok(Some(envelope)),
            Ok(envelope) => {
                log::trace!("Ignoring data type {}", envelope.data_type);
                Ok(None)
            }
            Err(e @ (Error::InvalidFrame(_) | Error::Decode(_))) => {
                log::warn!("Dropping bus datagram: {}", e);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Receive until `running` is cleared, handing each envelope to `handler`
    ///
    /// Returns the number of envelopes handled.
    pub fn run<F>(&mut self, running: &AtomicBool, mut handler: F) -> Result<u64>
    where
        F: FnMut(&Envelope),
    {
        let mut handled = 0u64;
        while running.load(Ordering::Relaxed) {
            match self.recv() {
                Ok(Some(envelope)) => {
                    handler(&envelope);
                    handled += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    log::error!("Bus receive error: {}", e);
                    std::thread::sleep(Duration::from_millis(10));
                }
            }
        }
        Ok(handled)
    }
}
