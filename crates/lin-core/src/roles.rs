//! Node capabilities.
//!
//! A LIN node picks the capability set matching its role: the single master
//! issues headers with [`LinMaster`], slaves answer them with [`LinSlave`].
//! [`NetworkManagement`] covers wake-up and sleep signaling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::frame::Frame;

/// Master capability.
pub trait LinMaster {
    /// Run one complete frame exchange.
    ///
    /// Writes the header, then either publishes `frame.data()` or reads
    /// `frame.length()` response bytes. Returns the completed frame, with
    /// the received payload and the checksum filled in.
    fn send(&mut self, frame: Frame) -> Result<Frame>;
}

/// Slave capability.
pub trait LinSlave {
    /// Block until a header with valid parity arrives.
    ///
    /// Returns a frame carrying only the identifier. The caller declares its
    /// part in the response with [`Frame::set_data`], [`Frame::set_length`]
    /// or [`Frame::ignore`] and passes the frame to [`LinSlave::complete`].
    /// Fails with `Timeout` once `deadline` passes and with `Cancelled` when
    /// `cancel` fires; no bytes are written in either case.
    fn wait(&mut self, deadline: Option<Instant>, cancel: &CancelToken) -> Result<Frame>;

    /// Finish the exchange started by the last successful [`LinSlave::wait`].
    fn complete(&mut self, frame: Frame) -> Result<Frame>;

    /// No header has been seen for `idle`; every node is asleep by now.
    fn bus_idle(&mut self, idle: Duration) {
        let _ = idle;
    }
}

/// Network management capability.
pub trait NetworkManagement {
    /// Drive the wake-up pulse.
    ///
    /// Returns the instant from which every slave is guaranteed to listen
    /// (100 ms after the release edge). Headers must not be sent earlier.
    fn wake_up(&mut self) -> Result<Instant>;

    /// Broadcast the goto-sleep diagnostic command.
    ///
    /// Nodes also fall asleep on their own after 4 s of bus inactivity.
    fn goto_sleep(&mut self) -> Result<()>;
}

/// Cancellation handle for [`LinSlave::wait`].
///
/// Clones share the flag, so one can be moved to another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Re-arm the token for another wait.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
