//! Chat message payloads.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ChatId, MessageId, Result, UserId, envelope::require_id};

/// Content type of a message.
///
/// Serialized as the upper-case tag the server uses (`"TEXT"`, `"IMAGE"`,
/// `"FILE"`). Unrecognized tags are preserved in [`MessageKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    /// Plain text.
    #[default]
    Text,
    /// Image attachment.
    Image,
    /// File attachment.
    File,
    /// Any other tag.
    Other(String),
}

impl MessageKind {
    /// Wire tag.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "TEXT",
            Self::Image => "IMAGE",
            Self::File => "FILE",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for MessageKind {
    fn from(tag: String) -> Self {
        match tag.to_ascii_uppercase().as_str() {
            "TEXT" => Self::Text,
            "IMAGE" => Self::Image,
            "FILE" => Self::File,
            _ => Self::Other(tag),
        }
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message as the server describes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    /// Server-assigned message id.
    pub id: MessageId,
    /// Conversation the message belongs to.
    pub chat_id: ChatId,
    /// Author.
    pub sender_id: UserId,
    /// Body text.
    pub message: String,
    /// Content type.
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Message was edited after creation.
    #[serde(default)]
    pub is_edited: bool,
    /// Message was soft-deleted.
    #[serde(default)]
    pub is_deleted: bool,
}

impl MessagePayload {
    pub(crate) fn validate(&self, event: &'static str) -> Result<()> {
        require_id(event, "id", self.id)?;
        require_id(event, "chatId", self.chat_id)
    }
}
