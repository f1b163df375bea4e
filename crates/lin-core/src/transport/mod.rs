//! Transport layer module.

pub mod mock;
pub mod observable;
pub mod serial;
pub mod traits;

pub use mock::MockTransport;
pub use observable::ObservableTransport;
pub use serial::SerialTransport;
pub use traits::{LinTransport, TransportError};
