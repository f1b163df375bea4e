//! Byte transport abstraction.
//!
//! Defines the `LinTransport` trait for bus access,
//! allowing different implementations (serial port, mock, etc.).

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to open {device}: {message}")]
    OpenFailed { device: String, message: String },

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("Bus control failed: {0}")]
    BusControl(String),

    #[error("Transport disconnected")]
    Disconnected,

    #[error("Timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Abstract LIN bus interface.
///
/// A transport owns the physical layer: bit timing, break generation and
/// the UART itself. The engine only ever talks to it in whole bytes.
pub trait LinTransport: Send {
    /// Write raw bytes to the bus.
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Read exactly `count` bytes.
    ///
    /// Returns `TransportError::Timeout` if nothing arrived within the
    /// transport's read timeout.
    fn read(&mut self, count: usize) -> Result<Vec<u8>, TransportError>;

    /// Generate the break field followed by the sync byte (0x55).
    fn send_break(&mut self) -> Result<(), TransportError>;

    /// Hold the bus dominant for `duration`, then release it.
    fn drive_dominant(&mut self, duration: Duration) -> Result<(), TransportError>;
}
