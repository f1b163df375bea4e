//! State machine module.

pub mod engine;
pub mod machine;

pub use engine::{EngineConfig, LinEngine};
pub use machine::EngineState;
