//! Event system for front-end decoupling.
//!
//! Allows the CLI (or any other front-end) to subscribe to bus events
//! without tight coupling to the engine.

use std::fmt;

use crate::state::machine::EngineState;

/// Raw byte direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketDirection {
    Tx, // Transmit (node -> bus)
    Rx, // Receive (bus -> node)
}

impl fmt::Display for PacketDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketDirection::Tx => write!(f, "TX"),
            PacketDirection::Rx => write!(f, "RX"),
        }
    }
}

/// Events emitted by the engine.
#[derive(Debug, Clone)]
pub enum LinEvent {
    /// Engine state changed.
    StateChanged { from: EngineState, to: EngineState },
    /// Header written (master) or observed (slave).
    Header { identifier: u8, pid: u8 },
    /// Header with bad parity skipped by a slave.
    ParityError { pid: u8 },
    /// Response published by this node.
    FrameSent {
        identifier: u8,
        data: Vec<u8>,
        checksum: u8,
    },
    /// Response received and verified.
    FrameReceived {
        identifier: u8,
        data: Vec<u8>,
        checksum: u8,
    },
    /// Received checksum did not match.
    ChecksumError {
        identifier: u8,
        expected: u8,
        received: u8,
    },
    /// Wake-up pulse driven.
    WakeUp { pulse_us: u64 },
    /// Goto-sleep command sent.
    GotoSleep,
    /// No header seen for the bus-idle timeout.
    BusIdle { idle_ms: u64 },
    /// Raw bytes sent/received.
    Packet {
        direction: PacketDirection,
        length: usize,
        data: Vec<u8>,
    },
}

/// Observer trait for receiving LIN events.
///
/// Implement this trait in your front-end to receive updates.
pub trait LinObserver: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &LinEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl LinObserver for NullObserver {
    fn on_event(&self, _event: &LinEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl LinObserver for TracingObserver {
    fn on_event(&self, event: &LinEvent) {
        match event {
            LinEvent::StateChanged { from, to } => {
                tracing::trace!(from = %from, to = %to, "State changed");
            }
            LinEvent::Header { identifier, pid } => {
                tracing::debug!(id = identifier, pid = %format!("0x{:02X}", pid), "Header");
            }
            LinEvent::ParityError { pid } => {
                tracing::warn!(pid = %format!("0x{:02X}", pid), "Header parity error");
            }
            LinEvent::FrameSent {
                identifier,
                data,
                checksum,
            } => {
                tracing::info!(
                    id = identifier,
                    data = %hex(data),
                    checksum = %format!("0x{:02X}", checksum),
                    "Frame sent"
                );
            }
            LinEvent::FrameReceived {
                identifier,
                data,
                checksum,
            } => {
                tracing::info!(
                    id = identifier,
                    data = %hex(data),
                    checksum = %format!("0x{:02X}", checksum),
                    "Frame received"
                );
            }
            LinEvent::ChecksumError {
                identifier,
                expected,
                received,
            } => {
                tracing::warn!(
                    id = identifier,
                    expected = %format!("0x{:02X}", expected),
                    received = %format!("0x{:02X}", received),
                    "Checksum mismatch"
                );
            }
            LinEvent::WakeUp { pulse_us } => {
                tracing::info!(pulse_us = pulse_us, "Wake-up pulse");
            }
            LinEvent::GotoSleep => {
                tracing::info!("Goto-sleep command sent");
            }
            LinEvent::BusIdle { idle_ms } => {
                tracing::info!(idle_ms = idle_ms, "Bus idle, nodes asleep");
            }
            LinEvent::Packet {
                direction,
                length,
                data,
            } => {
                tracing::trace!(dir = %direction, len = length, bytes = %hex(data), "Bus bytes");
            }
        }
    }
}

/// Space separated hex dump.
pub fn hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex() {
        assert_eq!(hex(&[0x01, 0xAB, 0xF5]), "01 AB F5");
        assert_eq!(hex(&[]), "");
    }
}
