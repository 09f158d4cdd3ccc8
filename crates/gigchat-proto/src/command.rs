//! Outbound commands (client to server).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    ChatId, MessageId, MessageKind, Namespace, ProtocolError, Result, UserId,
    envelope::{self, RawEnvelope, require_id},
};

/// Credential presented during the handshake.
///
/// The token is carried in the handshake frame, never in the URL, and its
/// `Debug` output is redacted so it cannot leak through logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auth {
    /// Bearer token.
    pub token: String,
}

impl Auth {
    /// Wrap a bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }

    /// Whether the token is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.token.trim().is_empty()
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth").field("token", &"<redacted>").finish()
    }
}

/// First frame on a fresh socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    /// Namespace being joined.
    pub namespace: Namespace,
    /// Credential.
    pub auth: Auth,
}

/// Payload of `sendMessage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    /// Target conversation.
    pub chat_id: ChatId,
    /// Body text.
    pub message: String,
    /// Content type. Always `TEXT` for messages typed by the user.
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
}

/// Payload of `markAsRead`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsRead {
    /// Conversation being read.
    pub chat_id: ChatId,
    /// Messages being acknowledged. Empty means "everything so far".
    #[serde(default)]
    pub message_ids: Vec<MessageId>,
}

/// Closed set of commands the client emits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Authenticate the socket for a namespace.
    Handshake(Handshake),
    /// Subscribe to a conversation's events.
    JoinChat {
        /// Conversation to join.
        chat_id: ChatId,
    },
    /// Unsubscribe from a conversation's events.
    LeaveChat {
        /// Conversation to leave.
        chat_id: ChatId,
    },
    /// Post a message.
    SendMessage(SendMessage),
    /// Subscribe to the user-scoped notification room.
    JoinRoom {
        /// Current user.
        user_id: UserId,
    },
    /// Acknowledge messages as read.
    MarkAsRead(MarkAsRead),
}

impl Command {
    /// `handshake` command name.
    pub const HANDSHAKE: &'static str = "handshake";
    /// `joinChat` command name.
    pub const JOIN_CHAT: &'static str = "joinChat";
    /// `leaveChat` command name.
    pub const LEAVE_CHAT: &'static str = "leaveChat";
    /// `sendMessage` command name.
    pub const SEND_MESSAGE: &'static str = "sendMessage";
    /// `joinRoom` command name.
    pub const JOIN_ROOM: &'static str = "joinRoom";
    /// `markAsRead` command name.
    pub const MARK_AS_READ: &'static str = "markAsRead";

    /// Text message to `chat_id`.
    pub fn text(chat_id: ChatId, message: impl Into<String>) -> Self {
        Self::SendMessage(SendMessage { chat_id, message: message.into(), kind: MessageKind::Text })
    }

    /// Wire name of this command.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Handshake(_) => Self::HANDSHAKE,
            Self::JoinChat { .. } => Self::JOIN_CHAT,
            Self::LeaveChat { .. } => Self::LEAVE_CHAT,
            Self::SendMessage(_) => Self::SEND_MESSAGE,
            Self::JoinRoom { .. } => Self::JOIN_ROOM,
            Self::MarkAsRead(_) => Self::MARK_AS_READ,
        }
    }

    /// Serialize to one text frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Encode` if serialization fails
    pub fn encode(&self) -> Result<String> {
        let name = self.name();
        match self {
            Self::Handshake(handshake) => envelope::encode(name, handshake),
            Self::JoinChat { chat_id } | Self::LeaveChat { chat_id } => {
                envelope::encode(name, chat_id)
            },
            Self::SendMessage(send) => envelope::encode(name, send),
            Self::JoinRoom { user_id } => envelope::encode(name, user_id),
            Self::MarkAsRead(mark) => envelope::encode(name, mark),
        }
    }

    /// Parse and validate one text frame sent by a client.
    ///
    /// Used by servers and test brokers.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Envelope` if the frame is not an envelope
    /// - `ProtocolError::UnknownEvent` for names outside the vocabulary
    /// - `ProtocolError::MalformedPayload` for wrongly shaped payloads
    pub fn decode(text: &str) -> Result<Self> {
        let RawEnvelope { event, data } = RawEnvelope::parse(text)?;

        let command = match event.as_str() {
            Self::HANDSHAKE => Self::Handshake(envelope::payload(Self::HANDSHAKE, data)?),
            Self::JOIN_CHAT => {
                let chat_id = envelope::payload(Self::JOIN_CHAT, data)?;
                require_id(Self::JOIN_CHAT, "chatId", chat_id)?;
                Self::JoinChat { chat_id }
            },
            Self::LEAVE_CHAT => {
                let chat_id = envelope::payload(Self::LEAVE_CHAT, data)?;
                require_id(Self::LEAVE_CHAT, "chatId", chat_id)?;
                Self::LeaveChat { chat_id }
            },
            Self::SEND_MESSAGE => {
                let send: SendMessage = envelope::payload(Self::SEND_MESSAGE, data)?;
                require_id(Self::SEND_MESSAGE, "chatId", send.chat_id)?;
                Self::SendMessage(send)
            },
            Self::JOIN_ROOM => Self::JoinRoom { user_id: envelope::payload(Self::JOIN_ROOM, data)? },
            Self::MARK_AS_READ => {
                let mark: MarkAsRead = envelope::payload(Self::MARK_AS_READ, data)?;
                require_id(Self::MARK_AS_READ, "chatId", mark.chat_id)?;
                Self::MarkAsRead(mark)
            },
            other => return Err(ProtocolError::UnknownEvent(other.to_string())),
        };

        Ok(command)
    }
}
