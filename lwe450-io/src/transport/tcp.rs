//! TCP stream source

use super::{timeout_as_empty, Transport};
use crate::error::{Error, Result};
use std::io::{ErrorKind, Read};
use std::net::{SocketAddr, TcpStream};
use std::time::Duration;

/// TCP client reading LWE450 sentences from a stream server
pub struct TcpTransport {
    stream: TcpStream,
    peer: SocketAddr,
}

impl TcpTransport {
    /// Connect to a stream server
    pub fn connect(peer: SocketAddr, read_timeout: Duration) -> Result<Self> {
        let stream = TcpStream::connect_timeout(&peer, read_timeout.max(Duration::from_secs(1)))?;
        stream.set_read_timeout(Some(read_timeout))?;
        stream.set_nodelay(true)?;
        log::info!("Connected to {}", peer);
        Ok(Self { stream, peer })
    }
}

impl Transport for TcpTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        match self.stream.read(buffer) {
            Ok(0) if !buffer.is_empty() => Err(Error::Disconnected),
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
                ) =>
            {
                Err(Error::Disconnected)
            }
            other => timeout_as_empty(other),
        }
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;

    #[test]
    fn test_reads_then_reports_disconnect() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            stream.write_all(b"RrTcP,1\r\n").unwrap();
        });

        let mut transport = TcpTransport::connect(addr, Duration::from_millis(500)).unwrap();
        server.join().unwrap();

        let mut buf = [0u8; 64];
        let mut received = Vec::new();
        loop {
            match transport.read(&mut buf) {
                Ok(n) => received.extend_from_slice(&buf[..n]),
                Err(Error::Disconnected) => break,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(received, b"RrTcP,1\r\n");
        assert!(transport.describe().starts_with("tcp://127.0.0.1:"));
    }
}
