//! Outbound command outcomes.
//!
//! Sending never raises an error. The caller gets a [`SendStatus`] and
//! decides whether to retry or tell the user.

use gigchat_proto::Command;
use thiserror::Error;

/// Why a command was not emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DropReason {
    /// No live connection.
    #[error("not connected")]
    NotConnected,

    /// Conversation id was zero.
    #[error("no conversation selected")]
    NoConversation,

    /// Message body was blank.
    #[error("empty message body")]
    EmptyBody,
}

/// Outcome of an outbound operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendStatus {
    /// Command is ready for the wire.
    Sent(Command),
    /// Nothing was emitted.
    Dropped(DropReason),
}

impl SendStatus {
    /// Whether the command was emitted.
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent(_))
    }

    /// The emitted command, if any.
    pub fn command(&self) -> Option<&Command> {
        match self {
            Self::Sent(command) => Some(command),
            Self::Dropped(_) => None,
        }
    }
}

impl From<DropReason> for SendStatus {
    fn from(reason: DropReason) -> Self {
        Self::Dropped(reason)
    }
}
