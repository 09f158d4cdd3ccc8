//! Client state machine.
//!
//! The `Client` owns every piece of local state for one namespace connection
//! and routes validated server events into it. It never touches the socket:
//! commands come back as [`ClientAction::Send`] for the caller to write.

use gigchat_core::{
    ChatStore, Connection, ConnectionAction, ConnectionConfig, ConnectionState, NotificationFeed,
    PresenceTracker, RoomMembership, env::Environment,
};
use gigchat_proto::{
    Auth, ChatId, Command, MarkAsRead, MessageId, Namespace, ServerEvent, UserId,
};
use tracing::{debug, info, warn};

use crate::{
    error::ClientError,
    event::{ChatEvent, ClientAction, ClientEvent, ClientSnapshot},
    sender::{DropReason, SendStatus},
};

/// Client identity.
///
/// The user id addresses the user-scoped notification room and tells own
/// read receipts apart from everyone else's. The credential is only ever
/// sent in the handshake frame.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    /// Current user.
    pub user_id: UserId,
    /// Handshake credential.
    pub auth: Auth,
}

impl ClientIdentity {
    /// Create an identity.
    pub fn new(user_id: impl Into<UserId>, token: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), auth: Auth::new(token) }
    }
}

/// Client for one gigchat namespace connection.
pub struct Client<E: Environment> {
    /// Environment for timing.
    env: E,

    /// Current user.
    user_id: UserId,

    /// Handshake lifecycle.
    connection: Connection<E::Instant>,

    /// Conversations and their messages.
    chats: ChatStore,

    /// Online set.
    presence: PresenceTracker,

    /// Conversation the socket is joined to.
    rooms: RoomMembership,

    /// User-scoped notifications.
    notifications: NotificationFeed,
}

impl<E: Environment> Client<E> {
    /// Create a disconnected client.
    pub fn new(
        env: E,
        identity: ClientIdentity,
        namespace: Namespace,
        config: ConnectionConfig,
    ) -> Self {
        let ClientIdentity { user_id, auth } = identity;
        Self {
            env,
            connection: Connection::new(namespace, auth, config),
            chats: ChatStore::new(user_id.clone()),
            presence: PresenceTracker::new(),
            rooms: RoomMembership::new(),
            notifications: NotificationFeed::default(),
            user_id,
        }
    }

    /// Current user.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Namespace this client serves.
    pub fn namespace(&self) -> Namespace {
        self.connection.namespace()
    }

    /// Connection state.
    pub fn state(&self) -> &ConnectionState {
        self.connection.state()
    }

    /// Whether commands can be sent.
    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Whether a credential is available.
    pub fn has_credential(&self) -> bool {
        self.connection.has_credential()
    }

    /// Conversation the socket is joined to.
    pub fn current_chat(&self) -> Option<ChatId> {
        self.rooms.current()
    }

    /// Conversation state.
    pub fn chats(&self) -> &ChatStore {
        &self.chats
    }

    /// Presence state.
    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    /// Notification feed.
    pub fn notifications(&self) -> &NotificationFeed {
        &self.notifications
    }

    /// Copy of the state readers care about.
    pub fn snapshot(&self) -> ClientSnapshot {
        ClientSnapshot {
            connection: self.connection.state().clone(),
            current_chat: self.rooms.current(),
            chats: self.chats.chats().cloned().collect(),
            online: self.presence.online().clone(),
            notifications: self.notifications.iter().cloned().collect(),
        }
    }

    /// Start the handshake.
    ///
    /// Returns no actions when there is no credential.
    ///
    /// # Errors
    ///
    /// - `ClientError::Connection` if a handshake is already underway or done
    pub fn connect(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        let namespace = self.connection.namespace();
        let actions = self.connection.begin(self.env.now())?;
        if actions.is_empty() {
            debug!(%namespace, "no credential, not connecting");
            return Ok(vec![]);
        }

        debug!(%namespace, "handshake started");
        let mut actions = lift(actions);
        actions.push(ClientAction::Notify(ChatEvent::ConnectionChanged(
            self.connection.state().clone(),
        )));
        Ok(actions)
    }

    /// Process an event and return resulting actions.
    ///
    /// # Errors
    ///
    /// - `ClientError::Protocol` for frames that fail validation
    /// - `ClientError::Connection` for events the connection state cannot
    ///   accept
    pub fn handle(
        &mut self,
        event: ClientEvent<E::Instant>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::FrameReceived(text) => self.handle_frame(&text),
            ClientEvent::TransportClosed { reason } => Ok(self.handle_transport_closed(&reason)),
            ClientEvent::Tick { now } => Ok(self.handle_tick(now)),
        }
    }

    /// Change the conversation the socket is joined to.
    ///
    /// The selection is always remembered. Leave/join commands are only
    /// emitted while connected; otherwise the join happens on connect.
    /// Selecting a conversation resets its unread counter.
    pub fn select_chat(&mut self, target: Option<ChatId>) -> Vec<ClientAction> {
        let commands = self.rooms.select(target);
        if let Some(chat_id) = self.rooms.current() {
            self.chats.reset_unread(chat_id);
        }

        if !self.connection.is_connected() {
            if !commands.is_empty() {
                debug!(?target, "selection recorded, join deferred until connected");
            }
            return vec![];
        }
        commands.into_iter().map(ClientAction::Send).collect()
    }

    /// Build a `sendMessage` command.
    ///
    /// Nothing is inserted locally: the message appears once the server
    /// echoes it back as `newMessage`.
    pub fn send_message(&self, chat_id: ChatId, body: impl Into<String>) -> SendStatus {
        let body = body.into();
        let status = if !self.connection.is_connected() {
            SendStatus::Dropped(DropReason::NotConnected)
        } else if chat_id == 0 {
            SendStatus::Dropped(DropReason::NoConversation)
        } else if body.trim().is_empty() {
            SendStatus::Dropped(DropReason::EmptyBody)
        } else {
            SendStatus::Sent(Command::text(chat_id, body))
        };

        if let SendStatus::Dropped(reason) = &status {
            warn!(chat_id, %reason, "sendMessage dropped");
        }
        status
    }

    /// Build a `markAsRead` command. Empty `message_ids` means everything.
    pub fn mark_as_read(&self, chat_id: ChatId, message_ids: Vec<MessageId>) -> SendStatus {
        let status = if !self.connection.is_connected() {
            SendStatus::Dropped(DropReason::NotConnected)
        } else if chat_id == 0 {
            SendStatus::Dropped(DropReason::NoConversation)
        } else {
            SendStatus::Sent(Command::MarkAsRead(MarkAsRead { chat_id, message_ids }))
        };

        if let SendStatus::Dropped(reason) = &status {
            warn!(chat_id, %reason, "markAsRead dropped");
        }
        status
    }

    /// Register a conversation known from elsewhere so presence can be
    /// shown before its first message arrives.
    pub fn register_chat(&mut self, chat_id: ChatId, counterparty: Option<UserId>) {
        if chat_id == 0 {
            return;
        }
        let chat = self.chats.register(chat_id, counterparty);
        if let Some(user) = chat.counterparty.clone() {
            chat.online = self.presence.is_online(&user);
            chat.last_seen = self.presence.entry(&user).and_then(|e| e.last_seen);
        }
    }

    /// Mark every notification read.
    pub fn mark_notifications_read(&mut self) {
        self.notifications.mark_all_read();
    }

    /// Explicit teardown.
    pub fn close(&mut self, reason: &str) -> Vec<ClientAction> {
        let actions = self.connection.close(reason);
        if actions.is_empty() {
            return vec![];
        }

        info!(namespace = %self.connection.namespace(), reason, "connection closed");
        let mut actions = lift(actions);
        actions.push(self.connection_changed());
        actions
    }

    fn handle_frame(&mut self, text: &str) -> Result<Vec<ClientAction>, ClientError> {
        let event = ServerEvent::decode(text)?;
        debug!(event = event.name(), "frame received");

        let was_connected = self.connection.is_connected();
        let was = self.connection.state().clone();
        let mut actions = lift(self.connection.handle_event(&event)?);

        if *self.connection.state() != was {
            actions.push(self.connection_changed());
            if self.connection.is_connected() && !was_connected {
                info!(namespace = %self.connection.namespace(), "connected");
                actions.extend(self.on_connected());
            } else if !self.connection.is_connected() {
                info!(namespace = %self.connection.namespace(), "disconnected");
            }
        }

        actions.extend(self.apply(event));
        Ok(actions)
    }

    /// Route a data event into local state.
    fn apply(&mut self, event: ServerEvent) -> Option<ClientAction> {
        let notification = match event {
            ServerEvent::Connect { .. }
            | ServerEvent::ConnectError { .. }
            | ServerEvent::Disconnect { .. } => return None,

            ServerEvent::NewMessage(payload) => {
                let (chat_id, id) = (payload.chat_id, payload.id);
                if !self.chats.append(payload, self.rooms.current()) {
                    debug!(chat_id, id, "duplicate message ignored");
                    return None;
                }
                let message = self.chats.get(chat_id)?.message(id)?.clone();
                ChatEvent::MessageAppended(message)
            },

            ServerEvent::MessageUpdated(payload) => {
                let (chat_id, id) = (payload.chat_id, payload.id);
                if !self.chats.replace(payload) {
                    debug!(chat_id, id, "update for unknown message ignored");
                    return None;
                }
                let message = self
                    .chats
                    .chats()
                    .find_map(|c| c.message(id))
                    .cloned()?;
                ChatEvent::MessageEdited(message)
            },

            ServerEvent::MessageDeleted(deleted) => {
                let Some(chat_id) = self.chats.soft_delete(deleted.id, deleted.chat_id) else {
                    debug!(id = deleted.id, "delete for unknown message ignored");
                    return None;
                };
                ChatEvent::MessageDeleted { chat_id, message_id: deleted.id }
            },

            ServerEvent::OnlineUsers(roster) => {
                let diff = self.presence.replace_roster(roster);
                self.chats.apply_roster(self.presence.online());
                ChatEvent::RosterReplaced(diff)
            },

            ServerEvent::UserPresence(update) => {
                self.presence.apply(&update);
                self.chats.apply_presence(&update.user_id, update.status, update.last_seen);
                ChatEvent::PresenceChanged(update)
            },

            ServerEvent::MessagesRead(receipt) => {
                let marked = self.chats.apply_read(&receipt);
                ChatEvent::MessagesRead {
                    chat_id: receipt.chat_id,
                    reader_id: receipt.reader_id,
                    marked,
                }
            },

            ServerEvent::Notification(payload) => {
                let id = payload.id;
                if !self.notifications.push(payload) {
                    debug!(id, "duplicate notification ignored");
                    return None;
                }
                let notification = self.notifications.iter().find(|n| n.id == id)?.clone();
                ChatEvent::NotificationReceived(notification)
            },
        };

        Some(ClientAction::Notify(notification))
    }

    /// Subscriptions re-established on every successful handshake.
    fn on_connected(&self) -> Vec<ClientAction> {
        match self.connection.namespace() {
            Namespace::Notification => {
                vec![ClientAction::Send(Command::JoinRoom { user_id: self.user_id.clone() })]
            },
            Namespace::Chat => self.rooms.rejoin().map(ClientAction::Send).into_iter().collect(),
        }
    }

    fn handle_transport_closed(&mut self, reason: &str) -> Vec<ClientAction> {
        if *self.connection.state() == ConnectionState::Disconnected {
            return vec![];
        }

        info!(namespace = %self.connection.namespace(), reason, "transport closed");
        self.connection.transport_closed();
        vec![self.connection_changed()]
    }

    fn handle_tick(&mut self, now: E::Instant) -> Vec<ClientAction> {
        let actions = self.connection.tick(now);
        if actions.is_empty() {
            return vec![];
        }

        warn!(namespace = %self.connection.namespace(), "handshake timed out");
        let mut actions = lift(actions);
        actions.push(self.connection_changed());
        actions
    }

    fn connection_changed(&self) -> ClientAction {
        ClientAction::Notify(ChatEvent::ConnectionChanged(self.connection.state().clone()))
    }
}

fn lift(actions: Vec<ConnectionAction>) -> Vec<ClientAction> {
    actions
        .into_iter()
        .map(|action| match action {
            ConnectionAction::Open(handshake) => ClientAction::Open(handshake),
            ConnectionAction::Close { reason } => ClientAction::Close { reason },
        })
        .collect()
}
