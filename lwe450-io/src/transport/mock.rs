//! Mock transport for testing

use super::Transport;
use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// In-memory chunk source
///
/// Cloned handles share the same queue, so a test can keep one handle to
/// inject chunks while the other is owned by the gather loop. Each injected
/// chunk is returned by exactly one `read` (split if the buffer is smaller).
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    chunks: VecDeque<Vec<u8>>,
    closed: bool,
}

impl MockTransport {
    /// Create a new mock transport
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a chunk to be read
    pub fn inject(&self, data: &[u8]) {
        self.lock().chunks.push_back(data.to_vec());
    }

    /// Report `Disconnected` once the queued chunks are drained
    pub fn close(&self) {
        self.lock().closed = true;
    }

    /// Number of chunks not yet read
    pub fn pending(&self) -> usize {
        self.lock().chunks.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockTransportInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Transport for MockTransport {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let mut inner = self.lock();
        let Some(mut chunk) = inner.chunks.pop_front() else {
            return if inner.closed {
                Err(Error::Disconnected)
            } else {
                Ok(0)
            };
        };

        let n = chunk.len().min(buffer.len());
        buffer[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            inner.chunks.push_front(chunk.split_off(n));
        }
        Ok(n)
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
