//! Header detection on the receive side.
//!
//! The break field reaches the UART as a framing-error byte (0x00). A header
//! is only recognised as break, sync, PID in that order, so a sync value
//! inside another node's response bytes cannot start a header on its own.

use super::constants::{BREAK_BYTE, SYNC_BYTE};
use crate::frame::Pid;

/// Outcome of feeding one byte to the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanResult {
    /// No header yet.
    Pending,
    /// A complete header with valid parity.
    Header(Pid),
    /// Sync was followed by a byte with bad parity.
    ParityError(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
    #[default]
    Hunting,
    Break,
    Sync,
}

/// Byte-driven break/sync/PID detector.
#[derive(Debug, Default)]
pub struct HeaderScanner {
    phase: Phase,
}

impl HeaderScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, byte: u8) -> ScanResult {
        match self.phase {
            Phase::Sync => {
                self.phase = Phase::Hunting;
                match Pid::decode(byte) {
                    Ok(pid) => ScanResult::Header(pid),
                    Err(_) => ScanResult::ParityError(byte),
                }
            }
            Phase::Break if byte == SYNC_BYTE => {
                self.phase = Phase::Sync;
                ScanResult::Pending
            }
            Phase::Break | Phase::Hunting => {
                self.phase = if byte == BREAK_BYTE {
                    Phase::Break
                } else {
                    Phase::Hunting
                };
                ScanResult::Pending
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(bytes: &[u8]) -> Vec<ScanResult> {
        let mut scanner = HeaderScanner::new();
        bytes
            .iter()
            .map(|&b| scanner.feed(b))
            .filter(|r| *r != ScanResult::Pending)
            .collect()
    }

    #[test]
    fn test_scan_header() {
        let mut scanner = HeaderScanner::new();
        assert_eq!(scanner.feed(0x00), ScanResult::Pending);
        assert_eq!(scanner.feed(0x55), ScanResult::Pending);
        assert_eq!(
            scanner.feed(0x6A),
            ScanResult::Header(Pid::from_identifier(42).unwrap())
        );
    }

    #[test]
    fn test_scan_parity_error() {
        let mut scanner = HeaderScanner::new();
        scanner.feed(0x00);
        scanner.feed(0x55);
        assert_eq!(scanner.feed(0x2A), ScanResult::ParityError(0x2A));
        // Scanner is hunting again afterwards.
        assert_eq!(scanner.feed(0x55), ScanResult::Pending);
        assert_eq!(scanner.feed(0x6A), ScanResult::Pending);
    }

    #[test]
    fn test_sync_without_break_is_data() {
        assert!(scan(&[0x55, 0x6A, 0x01, 0x55, 0x85]).is_empty());
    }

    #[test]
    fn test_repeated_break_bytes() {
        assert_eq!(
            scan(&[0x00, 0x00, 0x00, 0x55, 0x85]),
            vec![ScanResult::Header(Pid::from_identifier(5).unwrap())]
        );
    }

    #[test]
    fn test_sync_value_is_a_valid_pid() {
        // 0x55 is also the PID of identifier 0x15.
        assert_eq!(
            scan(&[0x00, 0x55, 0x55]),
            vec![ScanResult::Header(Pid::from_identifier(0x15).unwrap())]
        );
    }
}
