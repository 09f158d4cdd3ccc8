//! Conversation state: message lists, previews, unread counters, and the
//! per-chat presence fields shown in the chat list.
//!
//! Messages are never removed. A delete marks the message and keeps its body,
//! mirroring the server's soft-delete.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use gigchat_proto::{
    ChatId, MessageId, MessageKind, MessagePayload, PresenceStatus, ReadReceipt, UserId,
};

/// A message held in local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Server-assigned id.
    pub id: MessageId,
    /// Conversation.
    pub chat_id: ChatId,
    /// Author.
    pub sender_id: UserId,
    /// Body text. Kept after a soft delete.
    pub body: String,
    /// Content type.
    pub kind: MessageKind,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Edited after creation.
    pub edited: bool,
    /// Soft-deleted.
    pub deleted: bool,
    /// Participants who acknowledged reading this message.
    pub read_by: BTreeSet<UserId>,
}

impl From<MessagePayload> for Message {
    fn from(payload: MessagePayload) -> Self {
        Self {
            id: payload.id,
            chat_id: payload.chat_id,
            sender_id: payload.sender_id,
            body: payload.message,
            kind: payload.kind,
            created_at: payload.created_at,
            edited: payload.is_edited,
            deleted: payload.is_deleted,
            read_by: BTreeSet::new(),
        }
    }
}

/// Last-message preview shown in the chat list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePreview {
    /// Message the preview was taken from.
    pub message_id: MessageId,
    /// Author.
    pub sender_id: UserId,
    /// Body text.
    pub body: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Source message was soft-deleted.
    pub deleted: bool,
}

impl From<&Message> for MessagePreview {
    fn from(message: &Message) -> Self {
        Self {
            message_id: message.id,
            sender_id: message.sender_id.clone(),
            body: message.body.clone(),
            created_at: message.created_at,
            deleted: message.deleted,
        }
    }
}

/// One conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chat {
    /// Conversation id.
    pub id: ChatId,
    /// The other participant of a direct conversation, once known.
    pub counterparty: Option<UserId>,
    /// Messages in arrival order.
    pub messages: Vec<Message>,
    /// Preview of the most recent message.
    pub last_message: Option<MessagePreview>,
    /// Messages received while the conversation was not active.
    pub unread: u32,
    /// Counterparty is online.
    pub online: bool,
    /// Counterparty was last seen at.
    pub last_seen: Option<DateTime<Utc>>,
}

impl Chat {
    /// Empty conversation.
    pub fn new(id: ChatId) -> Self {
        Self {
            id,
            counterparty: None,
            messages: Vec::new(),
            last_message: None,
            unread: 0,
            online: false,
            last_seen: None,
        }
    }

    /// Message by id.
    pub fn message(&self, id: MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    fn message_mut(&mut self, id: MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }

    fn refresh_preview(&mut self, id: MessageId) {
        let is_last = self.last_message.as_ref().is_some_and(|p| p.message_id == id);
        if is_last && let Some(message) = self.message(id) {
            self.last_message = Some(MessagePreview::from(message));
        }
    }
}

/// All conversations known to the client.
#[derive(Debug, Clone)]
pub struct ChatStore {
    /// Current user, used to infer counterparties and own read receipts.
    me: UserId,
    chats: BTreeMap<ChatId, Chat>,
}

impl ChatStore {
    /// Empty store for user `me`.
    pub fn new(me: UserId) -> Self {
        Self { me, chats: BTreeMap::new() }
    }

    /// Current user.
    pub fn me(&self) -> &UserId {
        &self.me
    }

    /// Register a conversation known from elsewhere (e.g. a REST listing).
    ///
    /// Existing conversations keep their state; a counterparty is only filled
    /// in if missing.
    pub fn register(&mut self, chat_id: ChatId, counterparty: Option<UserId>) -> &mut Chat {
        let chat = self.chats.entry(chat_id).or_insert_with(|| Chat::new(chat_id));
        if chat.counterparty.is_none() {
            chat.counterparty = counterparty;
        }
        chat
    }

    /// Conversation by id.
    pub fn get(&self, chat_id: ChatId) -> Option<&Chat> {
        self.chats.get(&chat_id)
    }

    /// All conversations ordered by id.
    pub fn chats(&self) -> impl Iterator<Item = &Chat> {
        self.chats.values()
    }

    /// Messages of a conversation. Empty if unknown.
    pub fn messages(&self, chat_id: ChatId) -> &[Message] {
        self.chats.get(&chat_id).map_or(&[], |c| c.messages.as_slice())
    }

    /// Unread messages across all conversations.
    pub fn total_unread(&self) -> u32 {
        self.chats.values().map(|c| c.unread).sum()
    }

    /// Append a new message.
    ///
    /// Returns `false` without changes if the conversation already holds a
    /// message with this id. The unread counter grows only for messages
    /// from someone else in a conversation that is not `active`.
    pub fn append(&mut self, payload: MessagePayload, active: Option<ChatId>) -> bool {
        let chat_id = payload.chat_id;
        let chat = self.chats.entry(chat_id).or_insert_with(|| Chat::new(chat_id));

        if chat.message(payload.id).is_some() {
            return false;
        }

        if chat.counterparty.is_none() && payload.sender_id != self.me {
            chat.counterparty = Some(payload.sender_id.clone());
        }

        let own = payload.sender_id == self.me;
        let message = Message::from(payload);
        chat.last_message = Some(MessagePreview::from(&message));
        chat.messages.push(message);

        if !own && active != Some(chat_id) {
            chat.unread = chat.unread.saturating_add(1);
        }
        true
    }

    /// Replace the content of an existing message and flag it edited.
    ///
    /// Returns `false` if no message with this id is known.
    pub fn replace(&mut self, payload: MessagePayload) -> bool {
        let Some(chat_id) = self.locate(payload.id, Some(payload.chat_id)) else {
            return false;
        };
        let Some(chat) = self.chats.get_mut(&chat_id) else {
            return false;
        };
        let Some(message) = chat.message_mut(payload.id) else {
            return false;
        };

        message.body = payload.message;
        message.kind = payload.kind;
        message.edited = true;
        message.deleted = message.deleted || payload.is_deleted;

        chat.refresh_preview(payload.id);
        true
    }

    /// Soft-delete a message. The body is kept.
    ///
    /// Returns the conversation of the message, or `None` if unknown.
    pub fn soft_delete(&mut self, id: MessageId, chat_hint: Option<ChatId>) -> Option<ChatId> {
        let chat_id = self.locate(id, chat_hint)?;
        let chat = self.chats.get_mut(&chat_id)?;
        chat.message_mut(id)?.deleted = true;
        chat.refresh_preview(id);
        Some(chat_id)
    }

    /// Apply a read receipt.
    ///
    /// Records the reader on the acknowledged messages (all messages if the
    /// receipt lists none). A receipt from the current user clears the
    /// conversation's unread counter. Returns how many messages were marked.
    pub fn apply_read(&mut self, receipt: &ReadReceipt) -> usize {
        let Some(chat) = self.chats.get_mut(&receipt.chat_id) else {
            return 0;
        };

        let mut marked = 0;
        for message in &mut chat.messages {
            let listed = receipt.message_ids.is_empty() || receipt.message_ids.contains(&message.id);
            if listed && message.read_by.insert(receipt.reader_id.clone()) {
                marked += 1;
            }
        }

        if receipt.reader_id == self.me {
            chat.unread = 0;
        }
        marked
    }

    /// Reset the unread counter of a conversation.
    pub fn reset_unread(&mut self, chat_id: ChatId) {
        if let Some(chat) = self.chats.get_mut(&chat_id) {
            chat.unread = 0;
        }
    }

    /// Update per-chat presence fields for conversations with `user`.
    ///
    /// Returns the affected conversations.
    pub fn apply_presence(
        &mut self,
        user: &UserId,
        status: PresenceStatus,
        last_seen: Option<DateTime<Utc>>,
    ) -> Vec<ChatId> {
        let mut affected = Vec::new();
        for chat in self.chats.values_mut() {
            if chat.counterparty.as_ref() != Some(user) {
                continue;
            }
            chat.online = status == PresenceStatus::Online;
            if last_seen.is_some() {
                chat.last_seen = last_seen;
            }
            affected.push(chat.id);
        }
        affected
    }

    /// Recompute per-chat online flags from a roster.
    pub fn apply_roster(&mut self, online: &BTreeSet<UserId>) {
        for chat in self.chats.values_mut() {
            chat.online = chat.counterparty.as_ref().is_some_and(|user| online.contains(user));
        }
    }

    /// Find the conversation holding message `id`, trying `hint` first.
    fn locate(&self, id: MessageId, hint: Option<ChatId>) -> Option<ChatId> {
        if let Some(chat_id) = hint
            && self.chats.get(&chat_id).is_some_and(|c| c.message(id).is_some())
        {
            return Some(chat_id);
        }
        self.chats.values().find(|c| c.message(id).is_some()).map(|c| c.id)
    }
}
