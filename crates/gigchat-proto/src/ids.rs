//! Identifier types shared by commands and events.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de::Error as _};

/// Conversation (room) identifier. Zero is never a valid conversation.
pub type ChatId = u64;

/// Message identifier assigned by the server.
pub type MessageId = u64;

/// Notification identifier assigned by the server.
pub type NotificationId = u64;

/// Participant identifier.
///
/// The server is inconsistent about whether user ids are JSON strings or
/// integers, so both are accepted and normalized to a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Create a user id from its string form.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// String form of the id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Number(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(text) if text.trim().is_empty() => Err(D::Error::custom("empty user id")),
            Raw::Text(text) => Ok(Self(text)),
            Raw::Number(number) => Ok(Self(number.to_string())),
        }
    }
}
