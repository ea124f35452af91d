//! Transport layer: sources of raw LWE450 byte chunks

use crate::error::Result;

mod mock;
mod tcp;
mod udp;

pub use mock::MockTransport;
pub use tcp::TcpTransport;
pub use udp::UdpTransport;

/// Chunk source for the assembler
pub trait Transport: Send {
    /// Read the next chunk into `buffer`, returns number of bytes read.
    ///
    /// Returns `Ok(0)` when nothing arrived within the read timeout, and
    /// [`Error::Disconnected`](crate::error::Error::Disconnected) once a
    /// stream peer has closed.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Human-readable endpoint for log lines
    fn describe(&self) -> String;
}

/// Map socket timeouts to an empty read
pub(crate) fn timeout_as_empty(result: std::io::Result<usize>) -> Result<usize> {
    match result {
        Ok(n) => Ok(n),
        Err(e)
            if e.kind() == std::io::ErrorKind::WouldBlock
                || e.kind() == std::io::ErrorKind::TimedOut =>
        {
            Ok(0)
        }
        Err(e) => Err(e.into()),
    }
}
