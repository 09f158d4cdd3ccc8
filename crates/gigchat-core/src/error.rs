//! Error types for the core state machines.

use thiserror::Error;

use crate::connection::ConnectionState;

/// Errors raised by [`crate::Connection`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Operation is not valid in the current state.
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// State when the operation was attempted.
        state: ConnectionState,
        /// Operation that was attempted.
        operation: &'static str,
    },

    /// Event arrived in a state that does not accept it.
    #[error("unexpected event {event} in state {state:?}")]
    UnexpectedEvent {
        /// State when the event arrived.
        state: ConnectionState,
        /// Event name.
        event: &'static str,
    },
}
