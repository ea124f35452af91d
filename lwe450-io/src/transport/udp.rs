//! UDP datagram source (unicast or multicast)

use super::{timeout_as_empty, Transport};
use crate::error::Result;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};
use std::time::Duration;

/// UDP receiver for LWE450 datagrams
///
/// Each datagram becomes one chunk. For a multicast address the socket is
/// bound to the unspecified address and joins the group, optionally on a
/// specific interface.
pub struct UdpTransport {
    socket: UdpSocket,
    endpoint: SocketAddr,
}

impl UdpTransport {
    /// Bind a receiver
    ///
    /// # Arguments
    /// * `address` - Unicast address to bind, or multicast group to join
    /// * `port` - UDP port
    /// * `interface` - Interface address for the multicast join (any if `None`)
    /// * `read_timeout` - Upper bound on a blocking read
    pub fn bind(
        address: IpAddr,
        port: u16,
        interface: Option<Ipv4Addr>,
        read_timeout: Duration,
    ) -> Result<Self> {
        let socket = match address {
            IpAddr::V4(group) if group.is_multicast() => {
                let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))?;
                let iface = interface.unwrap_or(Ipv4Addr::UNSPECIFIED);
                socket.join_multicast_v4(&group, &iface)?;
                log::info!("Joined multicast group {} on interface {}", group, iface);
                socket
            }
            _ => UdpSocket::bind((address, port))?,
        };
        socket.set_read_timeout(Some(read_timeout))?;

        let endpoint = SocketAddr::new(address, socket.local_addr()?.port());
        log::info!("UDP receiver bound to {}", endpoint);

        Ok(Self { socket, endpoint })
    }

    /// Locally bound address
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }
}

impl Transport for UdpTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        timeout_as_empty(self.socket.recv(buffer))
    }

    fn describe(&self) -> String {
        format!("udp://{}", self.endpoint)
    }
}
