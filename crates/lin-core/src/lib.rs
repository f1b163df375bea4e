//! LIN-Core: LIN bus protocol engine in Rust.
//!
//! This crate implements the master and slave sides of the LIN
//! (Local Interconnect Network) frame exchange, on top of a pluggable
//! byte transport.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Frame**: Frame model, identifier validation, PID parity
//! - **Checksum**: Classic (LIN 1.3) and enhanced (LIN 2.0) checksums
//! - **Protocol**: Wire constants and header detection
//! - **Transport**: Byte transport abstraction (serial port, mock)
//! - **State**: Exchange state machine and the engine
//! - **Roles**: Master, slave and network-management capabilities
//! - **Network**: Wake-up and goto-sleep signaling
//! - **Schedule / Responder**: Master schedule tables, slave response tables
//! - **Events**: Observer pattern for front-end decoupling
//! - **Config**: TOML node configuration
//!
//! # Example
//!
//! ```no_run
//! use lin_core::{EngineConfig, Frame, LinEngine, LinMaster, SerialTransport};
//! use std::time::Duration;
//!
//! let transport = SerialTransport::open("/dev/serial0", 19_200, Duration::from_millis(50))?;
//! let mut engine = LinEngine::new(transport, EngineConfig::default());
//!
//! let frame = engine.send(Frame::receive(42, 4)?)?;
//! println!("{}", frame);
//! # Ok::<(), lin_core::LinError>(())
//! ```

pub mod checksum;
pub mod config;
pub mod error;
pub mod events;
pub mod frame;
pub mod network;
pub mod protocol;
pub mod responder;
pub mod roles;
pub mod schedule;
pub mod state;
pub mod transport;

// Re-exports for convenience
pub use checksum::{ChecksumVariant, classic_checksum, enhanced_checksum};
pub use config::{FrameEntry, NodeConfig};
pub use error::LinError;
pub use events::{LinEvent, LinObserver, NullObserver, TracingObserver};
pub use frame::{Direction, Frame, FrameKind, Pid};
pub use responder::{
    ResponseHandler, ResponseTable, SlaveReport, run_monitor, run_slave, serve_once,
};
pub use roles::{CancelToken, LinMaster, LinSlave, NetworkManagement};
pub use schedule::{ScheduleReport, ScheduleTable, run_schedule};
pub use state::{EngineConfig, EngineState, LinEngine};
pub use transport::{LinTransport, MockTransport, ObservableTransport, SerialTransport, TransportError};
