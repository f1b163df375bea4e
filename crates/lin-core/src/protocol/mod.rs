//! Protocol module - LIN wire definitions.

pub mod constants;
pub mod header;

pub use constants::*;
pub use header::{HeaderScanner, ScanResult};
