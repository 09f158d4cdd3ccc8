//! Runtime errors.

use thiserror::Error;

/// Errors from talking to a connection runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RuntimeError {
    /// The runtime task has exited (released, or every lease dropped).
    #[error("connection runtime stopped")]
    Stopped,
}
