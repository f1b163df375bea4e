//! Slave-side response dispatch and bus monitoring.
//!
//! [`ResponseHandler`] is where an application maps identifiers to its own
//! part in a frame: publish, subscribe or stay silent.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::FrameEntry;
use crate::error::{LinError, Result};
use crate::frame::Frame;
use crate::protocol::constants::BUS_IDLE_SLEEP_TIMEOUT;
use crate::roles::{CancelToken, LinSlave};
use crate::transport::TransportError;

/// Decides how this node takes part in a received header.
pub trait ResponseHandler {
    /// Call [`Frame::set_data`], [`Frame::set_length`] or leave the frame
    /// untouched to ignore it.
    fn respond(&mut self, frame: &mut Frame) -> Result<()>;
}

impl<F> ResponseHandler for F
where
    F: FnMut(&mut Frame) -> Result<()>,
{
    fn respond(&mut self, frame: &mut Frame) -> Result<()> {
        self(frame)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Response {
    Publish(Vec<u8>),
    Subscribe(usize),
}

/// Static identifier -> response table.
#[derive(Debug, Clone, Default)]
pub struct ResponseTable {
    entries: HashMap<u8, Response>,
}

impl ResponseTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: &[FrameEntry]) -> Result<Self> {
        let mut table = Self::new();
        for entry in entries {
            // Validates identifier and sizes.
            entry.to_frame()?;
            if !entry.data.is_empty() {
                table.publish(entry.identifier, entry.data.clone());
            } else if let Some(len) = entry.length {
                table.subscribe(entry.identifier, len);
            }
        }
        Ok(table)
    }

    /// Publish `data` whenever `identifier` is seen.
    pub fn publish(&mut self, identifier: u8, data: Vec<u8>) {
        self.entries.insert(identifier, Response::Publish(data));
    }

    /// Receive `len` bytes whenever `identifier` is seen.
    pub fn subscribe(&mut self, identifier: u8, len: usize) {
        self.entries.insert(identifier, Response::Subscribe(len));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResponseHandler for ResponseTable {
    fn respond(&mut self, frame: &mut Frame) -> Result<()> {
        match self.entries.get(&frame.identifier()) {
            Some(Response::Publish(data)) => frame.set_data(data.clone()),
            Some(Response::Subscribe(len)) => frame.set_length(*len),
            None => {
                frame.ignore();
                Ok(())
            }
        }
    }
}

/// One wait/respond/complete cycle.
pub fn serve_once<S, H>(
    slave: &mut S,
    handler: &mut H,
    deadline: Option<Instant>,
    cancel: &CancelToken,
) -> Result<Frame>
where
    S: LinSlave + ?Sized,
    H: ResponseHandler + ?Sized,
{
    let mut frame = slave.wait(deadline, cancel)?;
    if let Err(e) = handler.respond(&mut frame) {
        // Stay silent rather than leave the exchange half done.
        frame.ignore();
        slave.complete(frame)?;
        return Err(e);
    }
    slave.complete(frame)
}

/// Counters collected by [`run_slave`] and [`run_monitor`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlaveReport {
    pub headers: usize,
    pub checksum_errors: usize,
    /// Subscribed responses that timed out or arrived short.
    pub transport_errors: usize,
    pub handler_errors: usize,
    /// Times the bus went idle for the auto-sleep timeout.
    pub idle_periods: usize,
}

/// Serve headers until `cancel` fires.
///
/// `header_timeout` bounds each individual wait; `None` uses the bus
/// auto-sleep timeout so idle periods are still reported.
pub fn run_slave<S, H>(
    slave: &mut S,
    handler: &mut H,
    header_timeout: Option<Duration>,
    cancel: &CancelToken,
) -> Result<SlaveReport>
where
    S: LinSlave + ?Sized,
    H: ResponseHandler + ?Sized,
{
    serve_loop(slave, handler, header_timeout, BUS_IDLE_SLEEP_TIMEOUT, cancel)
}

/// Log every header on the bus without ever writing to it.
pub fn run_monitor<S, F>(slave: &mut S, cancel: &CancelToken, mut on_header: F) -> Result<SlaveReport>
where
    S: LinSlave + ?Sized,
    F: FnMut(&Frame),
{
    let mut silent = |frame: &mut Frame| -> Result<()> {
        on_header(frame);
        frame.ignore();
        Ok(())
    };
    run_slave(slave, &mut silent, None, cancel)
}

fn serve_loop<S, H>(
    slave: &mut S,
    handler: &mut H,
    header_timeout: Option<Duration>,
    idle_after: Duration,
    cancel: &CancelToken,
) -> Result<SlaveReport>
where
    S: LinSlave + ?Sized,
    H: ResponseHandler + ?Sized,
{
    let timeout = header_timeout.unwrap_or(idle_after);
    let mut report = SlaveReport::default();
    let mut idle = IdleTracker::new(idle_after);

    loop {
        let deadline = Instant::now() + timeout;
        match serve_once(slave, handler, Some(deadline), cancel) {
            Ok(frame) => {
                report.headers += 1;
                idle.activity();
                debug!(frame = %frame, "Exchange complete");
            }
            Err(LinError::ChecksumMismatch { identifier, .. }) => {
                report.headers += 1;
                report.checksum_errors += 1;
                idle.activity();
                warn!(id = identifier, "Response dropped: checksum mismatch");
            }
            Err(LinError::Transport(
                e @ (TransportError::Timeout { .. } | TransportError::ShortRead { .. }),
            )) => {
                report.headers += 1;
                report.transport_errors += 1;
                idle.activity();
                warn!(error = %e, "Response dropped: incomplete");
            }
            Err(LinError::Timeout { .. }) => {
                if let Some(quiet) = idle.check() {
                    report.idle_periods += 1;
                    slave.bus_idle(quiet);
                }
            }
            Err(LinError::Cancelled) => return Ok(report),
            Err(
                e @ (LinError::PayloadTooLarge { .. }
                | LinError::LengthMismatch { .. }
                | LinError::InvalidIdentifier(_)),
            ) => {
                report.headers += 1;
                report.handler_errors += 1;
                idle.activity();
                warn!(error = %e, "Response handler failed, frame ignored");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Reports once per quiet period.
struct IdleTracker {
    threshold: Duration,
    last_activity: Instant,
    reported: bool,
}

impl IdleTracker {
    fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last_activity: Instant::now(),
            reported: false,
        }
    }

    fn activity(&mut self) {
        self.last_activity = Instant::now();
        self.reported = false;
    }

    fn check(&mut self) -> Option<Duration> {
        let idle = self.last_activity.elapsed();
        if self.reported || idle < self.threshold {
            return None;
        }
        self.reported = true;
        debug!(idle_ms = idle.as_millis() as u64, "Bus idle");
        Some(idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::events::{LinEvent, LinObserver};
    use crate::state::{EngineConfig, LinEngine};
    use crate::transport::MockTransport;

    /// Cancels the runner once the bus is reported idle.
    struct StopOnIdle(CancelToken);

    impl LinObserver for StopOnIdle {
        fn on_event(&self, event: &LinEvent) {
            if matches!(event, LinEvent::BusIdle { .. }) {
                self.0.cancel();
            }
        }
    }

    #[test]
    fn test_table_dispatch() {
        let mut table = ResponseTable::new();
        table.publish(24, b"foobar".to_vec());
        table.subscribe(42, 4);

        let mut frame = Frame::new(24).unwrap();
        table.respond(&mut frame).unwrap();
        assert_eq!(frame.data(), b"foobar");

        let mut frame = Frame::new(42).unwrap();
        table.respond(&mut frame).unwrap();
        assert_eq!(frame.length(), Some(4));

        let mut frame = Frame::new(7).unwrap();
        table.respond(&mut frame).unwrap();
        assert_eq!(frame.direction(), crate::frame::Direction::Ignore);
    }

    #[test]
    fn test_table_from_entries() {
        let entries = vec![
            FrameEntry {
                identifier: 1,
                data: vec![1],
                ..Default::default()
            },
            FrameEntry {
                identifier: 2,
                length: Some(2),
                ..Default::default()
            },
        ];
        assert_eq!(ResponseTable::from_entries(&entries).unwrap().len(), 2);

        let bad = vec![FrameEntry {
            identifier: 70,
            ..Default::default()
        }];
        assert!(ResponseTable::from_entries(&bad).is_err());
    }

    #[test]
    fn test_idle_tracker_reports_once() {
        let mut idle = IdleTracker::new(Duration::from_millis(5));
        assert_eq!(idle.check(), None);
        std::thread::sleep(Duration::from_millis(10));
        assert!(idle.check().unwrap() >= Duration::from_millis(5));
        assert_eq!(idle.check(), None);
        idle.activity();
        assert_eq!(idle.check(), None);
    }

    #[test]
    fn test_quiet_bus_emits_idle_event() {
        let mock = MockTransport::new();
        let cancel = CancelToken::new();
        let observer = Arc::new(StopOnIdle(cancel.clone()));
        let mut engine = LinEngine::with_observer(mock.clone(), EngineConfig::default(), observer);
        let mut table = ResponseTable::new();

        let report = serve_loop(
            &mut engine,
            &mut table,
            Some(Duration::from_millis(2)),
            Duration::from_millis(20),
            &cancel,
        )
        .unwrap();

        assert_eq!(report.idle_periods, 1);
        assert_eq!(report.headers, 0);
        assert!(mock.get_writes().is_empty());
    }
}
