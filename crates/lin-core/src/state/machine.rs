//! Frame-exchange state machine.

use std::fmt;

/// Exchange state of a LIN engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// No exchange in flight.
    #[default]
    Idle,
    /// Master: break, sync and PID written.
    HeaderSent,
    /// Master: waiting for a slave's response bytes.
    AwaitResponse,
    /// Slave: hunting for a header.
    AwaitHeader,
    /// Slave: header handed to the caller, response not yet completed.
    ResponsePending,
    /// Exchange finished.
    Complete,
    /// Exchange failed.
    Error,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Idle => write!(f, "IDLE"),
            EngineState::HeaderSent => write!(f, "HEADER_SENT"),
            EngineState::AwaitResponse => write!(f, "AWAIT_RESPONSE"),
            EngineState::AwaitHeader => write!(f, "AWAIT_HEADER"),
            EngineState::ResponsePending => write!(f, "RESPONSE_PENDING"),
            EngineState::Complete => write!(f, "COMPLETE"),
            EngineState::Error => write!(f, "ERROR"),
        }
    }
}

impl EngineState {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition(&self, next: EngineState) -> bool {
        use EngineState::*;
        matches!(
            (self, next),
            (Idle, HeaderSent)
                | (Idle, AwaitHeader)
                | (HeaderSent, AwaitResponse)
                | (HeaderSent, Complete)
                | (HeaderSent, Error)
                | (AwaitResponse, Complete)
                | (AwaitResponse, Error)
                | (AwaitHeader, ResponsePending)
                | (AwaitHeader, Idle)
                | (AwaitHeader, Error)
                | (ResponsePending, Complete)
                | (ResponsePending, Error)
                | (ResponsePending, Idle)
                | (Complete, Idle)
                | (Error, Idle)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_idle() {
        assert_eq!(EngineState::default(), EngineState::Idle);
    }

    #[test]
    fn test_master_path() {
        let path = [
            EngineState::Idle,
            EngineState::HeaderSent,
            EngineState::AwaitResponse,
            EngineState::Complete,
            EngineState::Idle,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_slave_path() {
        let path = [
            EngineState::Idle,
            EngineState::AwaitHeader,
            EngineState::ResponsePending,
            EngineState::Error,
            EngineState::Idle,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!EngineState::Idle.can_transition(EngineState::ResponsePending));
        assert!(!EngineState::Idle.can_transition(EngineState::Complete));
        assert!(!EngineState::ResponsePending.can_transition(EngineState::HeaderSent));
        assert!(!EngineState::Complete.can_transition(EngineState::HeaderSent));
    }

    #[test]
    fn test_display() {
        assert_eq!(EngineState::ResponsePending.to_string(), "RESPONSE_PENDING");
    }
}
