//! Protocol errors.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding envelopes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame text is not a JSON object with an `event` field.
    #[error("invalid envelope: {0}")]
    Envelope(String),

    /// Envelope names an event outside the vocabulary.
    #[error("unknown event: {0}")]
    UnknownEvent(String),

    /// Payload does not have the shape the event requires.
    #[error("malformed {event} payload: {reason}")]
    MalformedPayload {
        /// Event name.
        event: &'static str,
        /// What was wrong with the payload.
        reason: String,
    },

    /// Namespace name is not one of the known namespaces.
    #[error("unknown namespace: {0}")]
    UnknownNamespace(String),

    /// Serialization failed.
    #[error("failed to encode {event}: {reason}")]
    Encode {
        /// Event name.
        event: &'static str,
        /// Serializer error.
        reason: String,
    },
}

impl ProtocolError {
    pub(crate) fn malformed(event: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedPayload { event, reason: reason.into() }
    }
}
