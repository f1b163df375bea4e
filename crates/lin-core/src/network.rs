//! Network management: wake-up and goto-sleep.

use std::time::Instant;

use tracing::{info, instrument};

use crate::error::{LinError, Result};
use crate::events::{LinEvent, LinObserver};
use crate::frame::Frame;
use crate::protocol::constants::*;
use crate::roles::{LinMaster, NetworkManagement};
use crate::state::engine::LinEngine;
use crate::transport::LinTransport;

/// Payload of the goto-sleep master request.
pub fn goto_sleep_payload(filler: u8) -> [u8; MAX_DATA_LEN] {
    let mut payload = [filler; MAX_DATA_LEN];
    payload[0] = GOTO_SLEEP_COMMAND;
    payload
}

/// Goto-sleep command frame (identifier 0x3C).
pub fn goto_sleep_frame(filler: u8) -> Result<Frame> {
    Frame::transmit(GOTO_SLEEP_ID, goto_sleep_payload(filler))
}

impl<T: LinTransport, O: LinObserver> NetworkManagement for LinEngine<T, O> {
    #[instrument(skip(self))]
    fn wake_up(&mut self) -> Result<Instant> {
        let pulse = self.config().wake_up_pulse;
        if !(WAKE_UP_PULSE_MIN..=WAKE_UP_PULSE_MAX).contains(&pulse) {
            return Err(LinError::InvalidWakeUpPulse(pulse));
        }
        self.ensure_idle("wake_up() requires an idle engine")?;

        self.transport_mut().drive_dominant(pulse)?;
        let released = Instant::now();

        let pulse_us = pulse.as_micros() as u64;
        info!(pulse_us, "Wake-up pulse sent");
        self.emit(LinEvent::WakeUp { pulse_us });
        Ok(released + WAKE_UP_READY_WINDOW)
    }

    #[instrument(skip(self))]
    fn goto_sleep(&mut self) -> Result<()> {
        let frame = goto_sleep_frame(self.config().sleep_filler)?;
        self.send(frame)?;
        info!("Goto-sleep command sent");
        self.emit(LinEvent::GotoSleep);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goto_sleep_payload() {
        assert_eq!(
            goto_sleep_payload(0xFF),
            [0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(goto_sleep_payload(0x00), [0u8; 8]);
    }

    #[test]
    fn test_goto_sleep_frame() {
        let frame = goto_sleep_frame(0xFF).unwrap();
        assert_eq!(frame.identifier(), 0x3C);
        assert_eq!(frame.data()[0], 0x00);
        assert_eq!(frame.data().len(), 8);
    }
}
