//! Error taxonomy for LIN frame exchanges.

use std::time::Duration;

use thiserror::Error;

use crate::state::machine::EngineState;
use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum LinError {
    #[error("Invalid identifier {0}: must be within 0..=63")]
    InvalidIdentifier(u32),

    #[error("Payload too large: {len} bytes, at most 8 allowed")]
    PayloadTooLarge { len: usize },

    #[error("Declared length {declared} does not match payload of {actual} bytes")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("Parity error in PID 0x{pid:02X}")]
    ParityError { pid: u8 },

    #[error("Checksum mismatch for id {identifier}: expected 0x{expected:02X}, got 0x{received:02X}")]
    ChecksumMismatch {
        identifier: u8,
        expected: u8,
        received: u8,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Timed out after {elapsed_ms}ms waiting for header")]
    Timeout { elapsed_ms: u64 },

    #[error("Wait cancelled")]
    Cancelled,

    #[error("Protocol state error in {state}: {message}")]
    ProtocolState {
        state: EngineState,
        message: &'static str,
    },

    #[error("Wake-up pulse {0:?} outside 250us..=5ms")]
    InvalidWakeUpPulse(Duration),
}

pub type Result<T> = std::result::Result<T, LinError>;
