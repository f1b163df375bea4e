//! LIN protocol engine.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, trace, warn};

use super::machine::EngineState;
use crate::checksum::ChecksumVariant;
use crate::error::{LinError, Result};
use crate::events::{LinEvent, LinObserver, TracingObserver};
use crate::frame::{Direction, Frame, Pid};
use crate::protocol::constants::{SLEEP_FILLER_DEFAULT, WAKE_UP_PULSE_DEFAULT};
use crate::protocol::header::{HeaderScanner, ScanResult};
use crate::roles::{CancelToken, LinMaster, LinSlave};
use crate::transport::{LinTransport, TransportError};

/// Runtime settings of an engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Checksum used for identifiers 0..=59 unless a frame overrides it.
    ///
    /// Defaults to `Enhanced`, the LIN 2.x choice. LIN 1.3 clusters need
    /// `Classic` here.
    pub checksum: ChecksumVariant,
    /// Dominant pulse length for wake-up.
    pub wake_up_pulse: Duration,
    /// Payload bytes 2..=8 of the goto-sleep command.
    pub sleep_filler: u8,
    /// Pause between header polls when the transport has nothing to read.
    pub poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            checksum: ChecksumVariant::Enhanced,
            wake_up_pulse: WAKE_UP_PULSE_DEFAULT,
            sleep_filler: SLEEP_FILLER_DEFAULT,
            poll_interval: Duration::from_millis(1),
        }
    }
}

/// Frame-exchange engine driving one transport.
///
/// Every operation takes `&mut self`, so at most one exchange is ever in
/// flight on the transport.
pub struct LinEngine<T: LinTransport, O: LinObserver = TracingObserver> {
    transport: T,
    observer: Arc<O>,
    config: EngineConfig,
    state: EngineState,
    /// Header handed out by `wait()` and not yet completed.
    pending: Option<Pid>,
}

impl<T: LinTransport> LinEngine<T, TracingObserver> {
    /// Create an engine with the default tracing observer.
    pub fn new(transport: T, config: EngineConfig) -> Self {
        Self::with_observer(transport, config, Arc::new(TracingObserver))
    }
}

impl<T: LinTransport, O: LinObserver> LinEngine<T, O> {
    /// Create an engine with a custom observer.
    pub fn with_observer(transport: T, config: EngineConfig, observer: Arc<O>) -> Self {
        Self {
            transport,
            observer,
            config,
            state: EngineState::Idle,
            pending: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Drop a pending slave exchange without touching the bus.
    pub fn abandon(&mut self) {
        if self.pending.take().is_some() {
            self.goto_state(EngineState::Idle);
        }
    }

    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub(crate) fn emit(&self, event: LinEvent) {
        self.observer.on_event(&event);
    }

    pub(crate) fn ensure_idle(&self, message: &'static str) -> Result<()> {
        if self.state != EngineState::Idle {
            return Err(LinError::ProtocolState {
                state: self.state,
                message,
            });
        }
        Ok(())
    }

    fn goto_state(&mut self, next: EngineState) {
        debug_assert!(
            self.state.can_transition(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        trace!(from = %self.state, to = %next, "State transition");
        let from = self.state;
        self.state = next;
        self.emit(LinEvent::StateChanged { from, to: next });
    }

    /// Pass through the terminal marker and return to idle.
    fn finish<R>(&mut self, result: Result<R>) -> Result<R> {
        match &result {
            Ok(_) => self.goto_state(EngineState::Complete),
            Err(e) => {
                debug!(error = %e, "Exchange failed");
                self.goto_state(EngineState::Error);
            }
        }
        self.goto_state(EngineState::Idle);
        result
    }

    fn variant_for(&self, frame: &Frame) -> ChecksumVariant {
        frame
            .checksum_variant()
            .unwrap_or(self.config.checksum)
            .resolve(frame.identifier())
    }

    /// Write payload and checksum in one burst.
    fn transmit_response(&mut self, frame: &mut Frame) -> Result<()> {
        let checksum = self.variant_for(frame).compute(frame.pid().value(), frame.data());
        let mut response = Vec::with_capacity(frame.data().len() + 1);
        response.extend_from_slice(frame.data());
        response.push(checksum);
        self.transport.write(&response)?;
        frame.set_checksum(checksum);
        self.emit(LinEvent::FrameSent {
            identifier: frame.identifier(),
            data: frame.data().to_vec(),
            checksum,
        });
        Ok(())
    }

    /// Read `len` payload bytes plus checksum and verify them.
    fn receive_response(&mut self, frame: &mut Frame, len: usize) -> Result<()> {
        let mut bytes = self.transport.read(len + 1)?;
        let received = bytes.pop().ok_or(TransportError::ShortRead {
            expected: len + 1,
            actual: 0,
        })?;
        let variant = self.variant_for(frame);
        if let Err(expected) = variant.verify(frame.pid().value(), &bytes, received) {
            warn!(
                id = frame.identifier(),
                expected = %format!("0x{:02X}", expected),
                received = %format!("0x{:02X}", received),
                "Checksum mismatch, response discarded"
            );
            self.emit(LinEvent::ChecksumError {
                identifier: frame.identifier(),
                expected,
                received,
            });
            return Err(LinError::ChecksumMismatch {
                identifier: frame.identifier(),
                expected,
                received,
            });
        }
        self.emit(LinEvent::FrameReceived {
            identifier: frame.identifier(),
            data: bytes.clone(),
            checksum: received,
        });
        frame.fill(bytes, received);
        Ok(())
    }

    fn master_exchange(&mut self, frame: &mut Frame) -> Result<()> {
        let pid = frame.pid();
        self.transport.send_break()?;
        self.transport.write(&[pid.value()])?;
        self.emit(LinEvent::Header {
            identifier: pid.identifier(),
            pid: pid.value(),
        });

        match frame.direction() {
            Direction::Transmit => self.transmit_response(frame),
            Direction::Receive(len) => {
                self.goto_state(EngineState::AwaitResponse);
                self.receive_response(frame, len)
            }
            Direction::Ignore => Ok(()),
        }
    }

    fn fail_wait(&mut self, error: LinError) -> Result<Frame> {
        self.goto_state(EngineState::Error);
        self.goto_state(EngineState::Idle);
        Err(error)
    }
}

impl<T: LinTransport, O: LinObserver> LinMaster for LinEngine<T, O> {
    #[instrument(skip(self, frame), fields(id = frame.identifier()))]
    fn send(&mut self, mut frame: Frame) -> Result<Frame> {
        self.ensure_idle("send() requires an idle engine")?;
        self.goto_state(EngineState::HeaderSent);
        let result = self.master_exchange(&mut frame);
        debug!(frame = %frame, ok = result.is_ok(), "Master exchange finished");
        self.finish(result.map(|_| frame))
    }
}

impl<T: LinTransport, O: LinObserver> LinSlave for LinEngine<T, O> {
    #[instrument(skip(self, cancel))]
    fn wait(&mut self, deadline: Option<Instant>, cancel: &CancelToken) -> Result<Frame> {
        self.ensure_idle("wait() requires an idle engine")?;
        self.goto_state(EngineState::AwaitHeader);

        let start = Instant::now();
        let mut scanner = HeaderScanner::new();
        loop {
            if cancel.is_cancelled() {
                debug!("Header wait cancelled");
                self.goto_state(EngineState::Idle);
                return Err(LinError::Cancelled);
            }
            if let Some(deadline) = deadline
                && Instant::now() >= deadline
            {
                self.goto_state(EngineState::Idle);
                return Err(LinError::Timeout {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                });
            }

            let bytes = match self.transport.read(1) {
                Ok(bytes) => bytes,
                Err(TransportError::Timeout { .. }) => {
                    thread::sleep(self.config.poll_interval);
                    continue;
                }
                Err(e) => return self.fail_wait(e.into()),
            };

            for byte in bytes {
                match scanner.feed(byte) {
                    ScanResult::Pending => {}
                    ScanResult::ParityError(pid) => {
                        warn!(pid = %format!("0x{:02X}", pid), "Header parity error, skipped");
                        self.emit(LinEvent::ParityError { pid });
                    }
                    ScanResult::Header(pid) => {
                        debug!(id = pid.identifier(), pid = %pid, "Header received");
                        self.emit(LinEvent::Header {
                            identifier: pid.identifier(),
                            pid: pid.value(),
                        });
                        self.pending = Some(pid);
                        self.goto_state(EngineState::ResponsePending);
                        return Ok(Frame::from_pid(pid));
                    }
                }
            }
        }
    }

    #[instrument(skip(self, frame), fields(id = frame.identifier()))]
    fn complete(&mut self, mut frame: Frame) -> Result<Frame> {
        let Some(pid) = self.pending.take() else {
            return Err(LinError::ProtocolState {
                state: self.state,
                message: "complete() without a pending header",
            });
        };
        if frame.identifier() != pid.identifier() {
            self.goto_state(EngineState::Idle);
            return Err(LinError::ProtocolState {
                state: EngineState::ResponsePending,
                message: "frame does not match the pending header",
            });
        }

        match frame.direction() {
            Direction::Ignore => {
                // Not ours: any byte written now would corrupt the bus.
                self.goto_state(EngineState::Idle);
                Ok(frame)
            }
            Direction::Transmit => {
                let result = self.transmit_response(&mut frame);
                self.finish(result.map(|_| frame))
            }
            Direction::Receive(len) => {
                let result = self.receive_response(&mut frame, len);
                self.finish(result.map(|_| frame))
            }
        }
    }

    fn bus_idle(&mut self, idle: Duration) {
        self.emit(LinEvent::BusIdle {
            idle_ms: idle.as_millis() as u64,
        });
    }
}
