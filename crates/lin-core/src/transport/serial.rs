//! UART transport backed by the `serialport` crate.

use std::io::{ErrorKind, Read, Write};
use std::thread;
use std::time::Duration;

use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, info, instrument, trace};

use super::traits::{LinTransport, TransportError};
use crate::protocol::constants::{BREAK_BIT_TIMES, SYNC_BYTE};

/// LIN over a UART and a single-wire transceiver.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    device: String,
    baud_rate: u32,
    read_timeout: Duration,
    /// Transceiver loops written bytes back to RX.
    echo: bool,
}

impl SerialTransport {
    /// Open `device` at `baud_rate`.
    #[instrument(level = "info")]
    pub fn open(
        device: &str,
        baud_rate: u32,
        read_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let port = serialport::new(device, baud_rate)
            .timeout(read_timeout)
            .open()
            .map_err(|e| TransportError::OpenFailed {
                device: device.to_string(),
                message: e.to_string(),
            })?;

        port.clear(ClearBuffer::All)
            .map_err(|e| TransportError::BusControl(e.to_string()))?;

        info!(device = %device, baud_rate, "Serial port opened");

        Ok(Self {
            port,
            device: device.to_string(),
            baud_rate,
            read_timeout,
            echo: false,
        })
    }

    /// Discard the transceiver's loop-back of every write.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn bit_time(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.baud_rate.max(1) as u64)
    }

    fn hold_break(&mut self, duration: Duration) -> Result<(), TransportError> {
        self.port
            .set_break()
            .map_err(|e| TransportError::BusControl(e.to_string()))?;
        thread::sleep(duration);
        self.port
            .clear_break()
            .map_err(|e| TransportError::BusControl(e.to_string()))
    }

    fn discard_echo(&mut self, len: usize) -> Result<(), TransportError> {
        if self.echo && len > 0 {
            let mut buf = vec![0u8; len];
            self.port.read_exact(&mut buf).map_err(|e| self.map_read_err(e))?;
            trace!(bytes = len, "Echo discarded");
        }
        Ok(())
    }

    fn map_read_err(&self, e: std::io::Error) -> TransportError {
        match e.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportError::Timeout {
                timeout_ms: self.read_timeout.as_millis() as u64,
            },
            ErrorKind::BrokenPipe | ErrorKind::NotConnected => TransportError::Disconnected,
            _ => TransportError::ReadFailed(e.to_string()),
        }
    }
}

impl LinTransport for SerialTransport {
    #[instrument(skip(self, data), fields(len = data.len()))]
    fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.port
            .write_all(data)
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;
        self.port
            .flush()
            .map_err(|e| TransportError::WriteFailed(e.to_string()))?;
        debug!(bytes_written = data.len(), "Write complete");
        self.discard_echo(data.len())
    }

    #[instrument(skip(self))]
    fn read(&mut self, count: usize) -> Result<Vec<u8>, TransportError> {
        let mut buf = vec![0u8; count];
        let mut filled = 0;
        while filled < count {
            match self.port.read(&mut buf[filled..]) {
                Ok(0) => return Err(TransportError::Disconnected),
                Ok(n) => filled += n,
                Err(e) if filled > 0 && e.kind() == ErrorKind::TimedOut => {
                    return Err(TransportError::ShortRead {
                        expected: count,
                        actual: filled,
                    });
                }
                Err(e) => return Err(self.map_read_err(e)),
            }
        }
        debug!(bytes_read = count, "Read complete");
        Ok(buf)
    }

    fn send_break(&mut self) -> Result<(), TransportError> {
        let duration = self.bit_time() * BREAK_BIT_TIMES;
        self.hold_break(duration)?;
        // The break itself is looped back as a single framing-error byte.
        self.discard_echo(1)?;
        self.write(&[SYNC_BYTE])
    }

    #[instrument(skip(self))]
    fn drive_dominant(&mut self, duration: Duration) -> Result<(), TransportError> {
        self.hold_break(duration)?;
        debug!(pulse_us = duration.as_micros() as u64, "Dominant pulse released");
        Ok(())
    }
}
