//! Client events and actions.

use std::collections::BTreeSet;

use gigchat_core::{Chat, ConnectionState, Message, Notification, RosterDiff};
use gigchat_proto::{ChatId, Command, Handshake, MessageId, PresenceUpdate, UserId};

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Receiving text frames from the socket
/// - Reporting when the socket closes underneath it
/// - Driving time forward via ticks
///
/// Generic over `I` (Instant type) to support both production and paused
/// tokio time in tests.
#[derive(Debug, Clone)]
pub enum ClientEvent<I = std::time::Instant> {
    /// Text frame received from the server.
    FrameReceived(String),

    /// Socket closed without a `disconnect` event.
    TransportClosed {
        /// Why the socket closed.
        reason: String,
    },

    /// Time tick for handshake timeout processing.
    Tick {
        /// Current time from the environment.
        now: I,
    },
}

/// Local notifications delivered to subscribers.
///
/// Closed set: every state change the client makes is reported as exactly
/// one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// Connection moved to a new state.
    ConnectionChanged(ConnectionState),

    /// A message was appended to its conversation.
    MessageAppended(Message),

    /// A message body was replaced.
    MessageEdited(Message),

    /// A message was soft-deleted.
    MessageDeleted {
        /// Conversation of the message.
        chat_id: ChatId,
        /// Deleted message.
        message_id: MessageId,
    },

    /// The online set was replaced by a roster snapshot.
    RosterReplaced(RosterDiff),

    /// One participant's presence changed.
    PresenceChanged(PresenceUpdate),

    /// A participant read messages.
    MessagesRead {
        /// Conversation the receipt applies to.
        chat_id: ChatId,
        /// Participant who read.
        reader_id: UserId,
        /// Messages newly marked as read by this participant.
        marked: usize,
    },

    /// A notification arrived.
    NotificationReceived(Notification),
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAction {
    /// Open a socket and send this handshake first.
    Open(Handshake),

    /// Send a command on the open socket.
    Send(Command),

    /// Close the socket.
    Close {
        /// Reason for closing.
        reason: String,
    },

    /// Deliver a notification to subscribers.
    Notify(ChatEvent),
}

/// Point-in-time copy of client state for readers outside the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSnapshot {
    /// Connection state.
    pub connection: ConnectionState,
    /// Conversation the socket is joined to.
    pub current_chat: Option<ChatId>,
    /// All known conversations ordered by id.
    pub chats: Vec<Chat>,
    /// Online participants.
    pub online: BTreeSet<UserId>,
    /// Notifications, newest first.
    pub notifications: Vec<Notification>,
}

impl ClientSnapshot {
    /// Conversation by id.
    pub fn chat(&self, chat_id: ChatId) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == chat_id)
    }
}
