//! Inbound events (server to client).
//!
//! [`ServerEvent::decode`] is the only way frames enter the client. It parses
//! the envelope, dispatches on the event name, and validates the payload, so
//! downstream code only ever sees well-formed events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    ChatId, MessageId, MessagePayload, NotificationId, ProtocolError, Result, UserId,
    envelope::{self, RawEnvelope, require_id},
};

/// Online/offline state of a participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceStatus {
    /// Participant has a live connection.
    Online,
    /// Participant has no live connection.
    Offline,
}

/// Single participant presence change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdate {
    /// Participant whose state changed.
    pub user_id: UserId,
    /// New state.
    pub status: PresenceStatus,
    /// Last time the participant was seen, if the server knows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<DateTime<Utc>>,
}

/// Soft-delete notice for one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeleted {
    /// Deleted message.
    pub id: MessageId,
    /// Conversation of the message, when the server includes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<ChatId>,
}

/// Read receipt from a participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    /// Conversation the receipt applies to.
    pub chat_id: ChatId,
    /// Participant who read the messages.
    pub reader_id: UserId,
    /// Messages that were read. Empty means "everything so far".
    #[serde(default)]
    pub message_ids: Vec<MessageId>,
}

/// Entry in the user-scoped notification feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    /// Server-assigned id.
    pub id: NotificationId,
    /// Short title.
    pub title: String,
    /// Optional body text.
    #[serde(default)]
    pub body: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Closed set of events the server pushes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// Handshake accepted.
    Connect {
        /// Server-side session id.
        sid: String,
    },
    /// Handshake rejected.
    ConnectError {
        /// Rejection reason.
        message: String,
    },
    /// Server is closing the session.
    Disconnect {
        /// Optional reason.
        reason: Option<String>,
    },
    /// Message created.
    NewMessage(MessagePayload),
    /// Message edited.
    MessageUpdated(MessagePayload),
    /// Message soft-deleted.
    MessageDeleted(MessageDeleted),
    /// Full snapshot of online participants.
    OnlineUsers(Vec<UserId>),
    /// One participant went online or offline.
    UserPresence(PresenceUpdate),
    /// Participant read messages.
    MessagesRead(ReadReceipt),
    /// Notification for the current user.
    Notification(NotificationPayload),
}

#[derive(Serialize, Deserialize)]
struct ConnectData {
    sid: String,
}

#[derive(Serialize, Deserialize)]
struct ConnectErrorData {
    message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DisconnectData {
    Reason(String),
    Object {
        #[serde(default)]
        reason: Option<String>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RosterData {
    List(Vec<UserId>),
    Object {
        #[serde(rename = "userIds")]
        user_ids: Vec<UserId>,
    },
}

impl ServerEvent {
    /// `connect` event name.
    pub const CONNECT: &'static str = "connect";
    /// `connect_error` event name.
    pub const CONNECT_ERROR: &'static str = "connect_error";
    /// `disconnect` event name.
    pub const DISCONNECT: &'static str = "disconnect";
    /// `newMessage` event name.
    pub const NEW_MESSAGE: &'static str = "newMessage";
    /// `messageUpdated` event name.
    pub const MESSAGE_UPDATED: &'static str = "messageUpdated";
    /// `messageDeleted` event name.
    pub const MESSAGE_DELETED: &'static str = "messageDeleted";
    /// `onlineUsers` event name.
    pub const ONLINE_USERS: &'static str = "onlineUsers";
    /// `userPresence` event name.
    pub const USER_PRESENCE: &'static str = "userPresence";
    /// `messagesRead` event name.
    pub const MESSAGES_READ: &'static str = "messagesRead";
    /// `notification` event name.
    pub const NOTIFICATION: &'static str = "notification";

    /// Wire name of this event.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Connect { .. } => Self::CONNECT,
            Self::ConnectError { .. } => Self::CONNECT_ERROR,
            Self::Disconnect { .. } => Self::DISCONNECT,
            Self::NewMessage(_) => Self::NEW_MESSAGE,
            Self::MessageUpdated(_) => Self::MESSAGE_UPDATED,
            Self::MessageDeleted(_) => Self::MESSAGE_DELETED,
            Self::OnlineUsers(_) => Self::ONLINE_USERS,
            Self::UserPresence(_) => Self::USER_PRESENCE,
            Self::MessagesRead(_) => Self::MESSAGES_READ,
            Self::Notification(_) => Self::NOTIFICATION,
        }
    }

    /// Parse and validate one text frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Envelope` if the frame is not an event envelope
    /// - `ProtocolError::UnknownEvent` for names outside the vocabulary
    /// - `ProtocolError::MalformedPayload` for wrongly shaped payloads or zero
    ///   ids
    pub fn decode(text: &str) -> Result<Self> {
        let RawEnvelope { event, data } = RawEnvelope::parse(text)?;
        Self::from_parts(&event, data)
    }

    fn from_parts(event: &str, data: Value) -> Result<Self> {
        let decoded = match event {
            Self::CONNECT => {
                let ConnectData { sid } = envelope::payload(Self::CONNECT, data)?;
                Self::Connect { sid }
            },
            Self::CONNECT_ERROR => {
                let ConnectErrorData { message } = envelope::payload(Self::CONNECT_ERROR, data)?;
                Self::ConnectError { message }
            },
            Self::DISCONNECT => {
                let reason = match envelope::payload(Self::DISCONNECT, data)? {
                    None => None,
                    Some(DisconnectData::Reason(reason)) => Some(reason),
                    Some(DisconnectData::Object { reason }) => reason,
                };
                Self::Disconnect { reason }
            },
            Self::NEW_MESSAGE => {
                let message: MessagePayload = envelope::payload(Self::NEW_MESSAGE, data)?;
                message.validate(Self::NEW_MESSAGE)?;
                Self::NewMessage(message)
            },
            Self::MESSAGE_UPDATED => {
                let message: MessagePayload = envelope::payload(Self::MESSAGE_UPDATED, data)?;
                message.validate(Self::MESSAGE_UPDATED)?;
                Self::MessageUpdated(message)
            },
            Self::MESSAGE_DELETED => {
                let deleted: MessageDeleted = envelope::payload(Self::MESSAGE_DELETED, data)?;
                require_id(Self::MESSAGE_DELETED, "id", deleted.id)?;
                if let Some(chat_id) = deleted.chat_id {
                    require_id(Self::MESSAGE_DELETED, "chatId", chat_id)?;
                }
                Self::MessageDeleted(deleted)
            },
            Self::ONLINE_USERS => match envelope::payload(Self::ONLINE_USERS, data)? {
                RosterData::List(user_ids) | RosterData::Object { user_ids } => {
                    Self::OnlineUsers(user_ids)
                },
            },
            Self::USER_PRESENCE => Self::UserPresence(envelope::payload(Self::USER_PRESENCE, data)?),
            Self::MESSAGES_READ => {
                let receipt: ReadReceipt = envelope::payload(Self::MESSAGES_READ, data)?;
                require_id(Self::MESSAGES_READ, "chatId", receipt.chat_id)?;
                Self::MessagesRead(receipt)
            },
            Self::NOTIFICATION => {
                let notification: NotificationPayload =
                    envelope::payload(Self::NOTIFICATION, data)?;
                require_id(Self::NOTIFICATION, "id", notification.id)?;
                Self::Notification(notification)
            },
            other => return Err(ProtocolError::UnknownEvent(other.to_string())),
        };

        Ok(decoded)
    }

    /// Serialize to one text frame.
    ///
    /// Used by servers and test brokers; clients only decode.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Encode` if serialization fails
    pub fn encode(&self) -> Result<String> {
        let name = self.name();
        match self {
            Self::Connect { sid } => envelope::encode(name, &ConnectData { sid: sid.clone() }),
            Self::ConnectError { message } => {
                envelope::encode(name, &ConnectErrorData { message: message.clone() })
            },
            Self::Disconnect { reason } => {
                envelope::encode(name, &serde_json::json!({ "reason": reason }))
            },
            Self::NewMessage(message) | Self::MessageUpdated(message) => {
                envelope::encode(name, message)
            },
            Self::MessageDeleted(deleted) => envelope::encode(name, deleted),
            Self::OnlineUsers(user_ids) => envelope::encode(name, user_ids),
            Self::UserPresence(update) => envelope::encode(name, update),
            Self::MessagesRead(receipt) => envelope::encode(name, receipt),
            Self::Notification(notification) => envelope::encode(name, notification),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MessageKind;

    #[test]
    fn decodes_new_message() {
        let event = ServerEvent::decode(
            r#"{"event":"newMessage","data":{"id":7,"chatId":42,"senderId":"u1","message":"hi","type":"TEXT","createdAt":"2024-05-01T10:00:00Z"}}"#,
        )
        .unwrap();

        match event {
            ServerEvent::NewMessage(message) => {
                assert_eq!(message.id, 7);
                assert_eq!(message.chat_id, 42);
                assert_eq!(message.message, "hi");
                assert_eq!(message.kind, MessageKind::Text);
            },
            other => panic!("expected NewMessage, got {other:?}"),
        }
    }

    #[test]
    fn roster_accepts_list_and_object_forms() {
        let list = ServerEvent::decode(r#"{"event":"onlineUsers","data":["a",2]}"#).unwrap();
        let object =
            ServerEvent::decode(r#"{"event":"onlineUsers","data":{"userIds":["a","2"]}}"#).unwrap();

        assert_eq!(list, object);
        assert_eq!(list, ServerEvent::OnlineUsers(vec!["a".into(), "2".into()]));
    }

    #[test]
    fn disconnect_reason_is_optional() {
        assert_eq!(
            ServerEvent::decode(r#"{"event":"disconnect"}"#).unwrap(),
            ServerEvent::Disconnect { reason: None }
        );
        assert_eq!(
            ServerEvent::decode(r#"{"event":"disconnect","data":"io server disconnect"}"#).unwrap(),
            ServerEvent::Disconnect { reason: Some("io server disconnect".into()) }
        );
        assert_eq!(
            ServerEvent::decode(r#"{"event":"disconnect","data":{"reason":"kicked"}}"#).unwrap(),
            ServerEvent::Disconnect { reason: Some("kicked".into()) }
        );
    }

    #[test]
    fn unknown_event_is_rejected() {
        let err = ServerEvent::decode(r#"{"event":"typing","data":{}}"#).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownEvent("typing".into()));
    }

    #[test]
    fn zero_ids_are_rejected() {
        let err = ServerEvent::decode(r#"{"event":"messageDeleted","data":{"id":0}}"#).unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedPayload { event: "messageDeleted", .. }));

        let err = ServerEvent::decode(
            r#"{"event":"newMessage","data":{"id":1,"chatId":0,"senderId":"u","message":"x","createdAt":"2024-05-01T10:00:00Z"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedPayload { event: "newMessage", .. }));
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let err =
            ServerEvent::decode(r#"{"event":"userPresence","data":{"userId":"a","status":"away"}}"#)
                .unwrap_err();
        assert!(matches!(err, ProtocolError::MalformedPayload { event: "userPresence", .. }));
    }

    #[test]
    fn encode_then_decode_preserves_presence() {
        let event = ServerEvent::UserPresence(PresenceUpdate {
            user_id: "u9".into(),
            status: PresenceStatus::Offline,
            last_seen: Some("2024-05-01T10:00:00Z".parse().unwrap()),
        });

        let text = event.encode().unwrap();
        assert_eq!(ServerEvent::decode(&text).unwrap(), event);
    }
}
