//! Mock LIN transport for testing.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::traits::{LinTransport, TransportError};
use crate::protocol::constants::{BREAK_BYTE, SYNC_BYTE};

#[derive(Debug, Default)]
struct MockState {
    /// Bytes returned on read.
    rx_queue: VecDeque<u8>,
    /// Captured writes.
    write_log: Vec<Vec<u8>>,
    /// Number of break fields generated.
    breaks: usize,
    /// Dominant pulses driven.
    pulses: Vec<Duration>,
    /// Number of read calls.
    reads: usize,
    disconnected: bool,
}

/// Mock transport for unit testing engine logic.
///
/// Clones share state, so a test can hand one clone to the engine and
/// inspect traffic through another.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue bytes to be returned by subsequent reads.
    pub fn queue_rx(&self, bytes: &[u8]) {
        self.lock().rx_queue.extend(bytes);
    }

    /// Queue a full header as a slave would see it: break, sync, PID.
    pub fn queue_header(&self, pid: u8) {
        self.queue_rx(&[BREAK_BYTE, SYNC_BYTE, pid]);
    }

    /// Get all captured writes.
    pub fn get_writes(&self) -> Vec<Vec<u8>> {
        self.lock().write_log.clone()
    }

    /// All written bytes, concatenated.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.lock().write_log.concat()
    }

    /// Clear captured writes.
    pub fn clear_writes(&self) {
        self.lock().write_log.clear();
    }

    pub fn break_count(&self) -> usize {
        self.lock().breaks
    }

    pub fn pulses(&self) -> Vec<Duration> {
        self.lock().pulses.clone()
    }

    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    /// Bytes still waiting to be read.
    pub fn pending_rx(&self) -> usize {
        self.lock().rx_queue.len()
    }

    /// Total number of transport calls of any kind.
    pub fn call_count(&self) -> usize {
        let s = self.lock();
        s.write_log.len() + s.breaks + s.pulses.len() + s.reads
    }

    /// Simulate device disconnect.
    pub fn disconnect(&self) {
        self.lock().disconnected = true;
    }

    /// Simulate device reconnect.
    pub fn reconnect(&self) {
        self.lock().disconnected = false;
    }
}

impl LinTransport for MockTransport {
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        let mut s = self.lock();
        if s.disconnected {
            return Err(TransportError::Disconnected);
        }
        s.write_log.push(data.to_vec());
        Ok(())
    }

    fn read(&mut self, count: usize) -> Result<Vec<u8>, TransportError> {
        let mut s = self.lock();
        s.reads += 1;
        if s.disconnected {
            return Err(TransportError::Disconnected);
        }
        if s.rx_queue.is_empty() && count > 0 {
            return Err(TransportError::Timeout { timeout_ms: 0 });
        }
        if s.rx_queue.len() < count {
            let actual = s.rx_queue.len();
            s.rx_queue.clear();
            return Err(TransportError::ShortRead {
                expected: count,
                actual,
            });
        }
        Ok(s.rx_queue.drain(..count).collect())
    }

    fn send_break(&mut self) -> Result<(), TransportError> {
        let mut s = self.lock();
        if s.disconnected {
            return Err(TransportError::Disconnected);
        }
        s.breaks += 1;
        Ok(())
    }

    fn drive_dominant(&mut self, duration: Duration) -> Result<(), TransportError> {
        let mut s = self.lock();
        if s.disconnected {
            return Err(TransportError::Disconnected);
        }
        s.pulses.push(duration);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_rx_queue() {
        let mut mock = MockTransport::new();
        mock.queue_rx(&[1, 2, 3]);

        assert_eq!(mock.read(2).unwrap(), vec![1, 2]);
        assert_eq!(mock.read(1).unwrap(), vec![3]);

        // Queue is empty now
        assert!(matches!(mock.read(1), Err(TransportError::Timeout { .. })));
    }

    #[test]
    fn test_mock_short_read() {
        let mut mock = MockTransport::new();
        mock.queue_rx(&[1]);
        assert!(matches!(
            mock.read(2),
            Err(TransportError::ShortRead {
                expected: 2,
                actual: 1
            })
        ));
        assert_eq!(mock.pending_rx(), 0);
    }

    #[test]
    fn test_mock_write_capture() {
        let mock = MockTransport::new();
        let mut handle = mock.clone();
        handle.write(b"Hello").unwrap();
        handle.write(b"World").unwrap();

        let writes = mock.get_writes();
        assert_eq!(writes.len(), 2);
        assert_eq!(writes[0], b"Hello");
        assert_eq!(writes[1], b"World");
        assert_eq!(mock.written_bytes(), b"HelloWorld");
    }

    #[test]
    fn test_mock_disconnect() {
        let mut mock = MockTransport::new();
        mock.disconnect();
        assert!(mock.write(b"test").is_err());
        assert!(mock.send_break().is_err());

        mock.reconnect();
        assert!(mock.write(b"test").is_ok());
    }
}
