//! Master schedule table.
//!
//! The master walks its table slot by slot, sending one header per slot and
//! pausing for the slot's delay. Failed exchanges are counted and skipped;
//! retries are left to the next cycle.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::FrameEntry;
use crate::error::{LinError, Result};
use crate::frame::{Direction, Frame};
use crate::roles::{CancelToken, LinMaster};
use crate::transport::TransportError;

/// One validated schedule slot.
#[derive(Debug, Clone)]
pub struct ScheduleSlot {
    pub frame: Frame,
    pub delay: Duration,
}

/// Ordered list of slots.
#[derive(Debug, Clone, Default)]
pub struct ScheduleTable {
    slots: Vec<ScheduleSlot>,
}

impl ScheduleTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: &[FrameEntry]) -> Result<Self> {
        let mut table = Self::new();
        for entry in entries {
            table.push(entry.to_frame()?, Duration::from_millis(entry.delay_ms));
        }
        Ok(table)
    }

    pub fn push(&mut self, frame: Frame, delay: Duration) {
        self.slots.push(ScheduleSlot { frame, delay });
    }

    pub fn slots(&self) -> &[ScheduleSlot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Counters collected while running a schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleReport {
    pub cycles: usize,
    pub sent: usize,
    pub received: usize,
    pub headers_only: usize,
    pub checksum_errors: usize,
    pub transport_errors: usize,
    /// Completed frames, in order.
    pub frames: Vec<Frame>,
}

/// Run `table` for `cycles` rounds, or until `cancel` fires when `None`.
///
/// Checksum failures, response timeouts and short reads of single slots are
/// recorded and the schedule continues with the next slot. Other errors,
/// a lost transport included, abort the run.
pub fn run_schedule<M: LinMaster + ?Sized>(
    master: &mut M,
    table: &ScheduleTable,
    cycles: Option<usize>,
    cancel: &CancelToken,
) -> Result<ScheduleReport> {
    let mut report = ScheduleReport::default();
    if table.is_empty() {
        warn!("Empty schedule table");
        return Ok(report);
    }

    while cycles.is_none_or(|n| report.cycles < n) {
        for slot in table.slots() {
            if cancel.is_cancelled() {
                info!(cycles = report.cycles, "Schedule cancelled");
                return Ok(report);
            }

            // Each exchange gets its own copy of the slot's frame.
            let direction = slot.frame.direction();
            match master.send(slot.frame.clone()) {
                Ok(frame) => {
                    match direction {
                        Direction::Transmit => report.sent += 1,
                        Direction::Receive(_) => report.received += 1,
                        Direction::Ignore => report.headers_only += 1,
                    }
                    debug!(frame = %frame, "Slot complete");
                    report.frames.push(frame);
                }
                Err(LinError::ChecksumMismatch { identifier, .. }) => {
                    warn!(id = identifier, "Slot dropped: checksum mismatch");
                    report.checksum_errors += 1;
                }
                Err(LinError::Transport(
                    e @ (TransportError::Timeout { .. } | TransportError::ShortRead { .. }),
                )) => {
                    warn!(id = slot.frame.identifier(), error = %e, "Slot dropped: transport error");
                    report.transport_errors += 1;
                }
                Err(e) => return Err(e),
            }

            if !slot.delay.is_zero() {
                thread::sleep(slot.delay);
            }
        }
        report.cycles += 1;
    }

    Ok(report)
}
