//! In-process stand-in for the realtime server.
//!
//! `SimBroker` accepts handshakes, tracks which sessions joined which
//! conversation, echoes `sendMessage` back as `newMessage` with increasing
//! ids, and relays read receipts. Tests inspect the commands it received and
//! inject arbitrary server events.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::{DateTime, Utc};
use gigchat_proto::{
    ChatId, Command, Handshake, MessageKind, MessagePayload, Namespace, ReadReceipt, ServerEvent,
    UserId,
};
use tokio::sync::mpsc;
use tracing::debug;

/// Session id assigned by the broker.
pub type SessionId = u64;

/// Epoch used for echoed message timestamps (2024-05-01T10:00:00Z).
const BASE_TIMESTAMP: i64 = 1_714_557_600;

struct Session {
    namespace: Namespace,
    user_id: UserId,
    outbox: mpsc::UnboundedSender<String>,
    chats: BTreeSet<ChatId>,
}

#[derive(Default)]
struct BrokerState {
    sessions: BTreeMap<SessionId, Session>,
    next_session: SessionId,
    /// Last message id handed out.
    last_message: u64,
    /// Token to user id. Unknown tokens map to a user named after the token.
    users: HashMap<String, UserId>,
    rejected: HashSet<String>,
    silent: bool,
    unreachable: bool,
    stalled: bool,
    handshakes: Vec<Handshake>,
    commands: Vec<(SessionId, Command)>,
}

/// Shared simulated server. Clones talk to the same broker.
#[derive(Clone, Default)]
pub struct SimBroker {
    state: Arc<Mutex<BrokerState>>,
}

impl SimBroker {
    /// Empty broker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a token to a user id for echoed message senders.
    pub fn register_user(&self, token: &str, user_id: impl Into<UserId>) {
        self.lock().users.insert(token.to_string(), user_id.into());
    }

    /// Answer handshakes with this token with `connect_error`.
    pub fn reject_token(&self, token: &str) {
        self.lock().rejected.insert(token.to_string());
    }

    /// Never answer handshakes.
    pub fn set_silent(&self, silent: bool) {
        self.lock().silent = silent;
    }

    /// Fail every `open`.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().unreachable = unreachable;
    }

    /// Never finish opening a socket.
    pub fn set_stalled(&self, stalled: bool) {
        self.lock().stalled = stalled;
    }

    /// Number of sockets ever opened against this broker.
    pub fn connections_opened(&self) -> usize {
        self.lock().handshakes.len()
    }

    /// Number of sockets currently open.
    pub fn open_sessions(&self) -> usize {
        self.lock().sessions.len()
    }

    /// Every handshake received, in order.
    pub fn handshakes(&self) -> Vec<Handshake> {
        self.lock().handshakes.clone()
    }

    /// Every command received, in order, excluding handshakes.
    pub fn commands(&self) -> Vec<Command> {
        self.lock().commands.iter().map(|(_, command)| command.clone()).collect()
    }

    /// Conversations a session is joined to.
    pub fn joined(&self, session: SessionId) -> BTreeSet<ChatId> {
        self.lock().sessions.get(&session).map(|s| s.chats.clone()).unwrap_or_default()
    }

    /// Ids of the open sessions.
    pub fn sessions(&self) -> Vec<SessionId> {
        self.lock().sessions.keys().copied().collect()
    }

    /// Push an event to every open session in `namespace`.
    pub fn broadcast(&self, namespace: Namespace, event: &ServerEvent) {
        let Ok(text) = event.encode() else {
            return;
        };
        let state = self.lock();
        for session in state.sessions.values().filter(|s| s.namespace == namespace) {
            let _ = session.outbox.send(text.clone());
        }
    }

    /// Push a raw text frame to every open session, bypassing validation.
    pub fn broadcast_raw(&self, text: &str) {
        let state = self.lock();
        for session in state.sessions.values() {
            let _ = session.outbox.send(text.to_string());
        }
    }

    /// Push an event to the sessions joined to `chat_id`.
    pub fn push_to_chat(&self, chat_id: ChatId, event: &ServerEvent) {
        let Ok(text) = event.encode() else {
            return;
        };
        let state = self.lock();
        for session in state.sessions.values().filter(|s| s.chats.contains(&chat_id)) {
            let _ = session.outbox.send(text.clone());
        }
    }

    /// Drop every socket without a `disconnect` event.
    pub fn drop_all(&self) {
        self.lock().sessions.clear();
    }

    pub(crate) fn is_stalled(&self) -> bool {
        self.lock().stalled
    }

    pub(crate) fn open(
        &self,
        handshake: Handshake,
    ) -> Option<(SessionId, mpsc::UnboundedReceiver<String>)> {
        let mut state = self.lock();
        if state.unreachable {
            return None;
        }

        let session_id = state.next_session;
        state.next_session += 1;
        state.handshakes.push(handshake.clone());

        let (outbox, inbox) = mpsc::unbounded_channel();
        let token = handshake.auth.token.clone();
        let reply = if state.silent {
            None
        } else if state.rejected.contains(&token) {
            Some(ServerEvent::ConnectError { message: "invalid token".to_string() })
        } else {
            Some(ServerEvent::Connect { sid: format!("sim-{session_id}") })
        };
        if let Some(text) = reply.and_then(|event| event.encode().ok()) {
            let _ = outbox.send(text);
        }

        let user_id = state.users.get(&token).cloned().unwrap_or_else(|| UserId::new(token));
        state.sessions.insert(session_id, Session {
            namespace: handshake.namespace,
            user_id,
            outbox,
            chats: BTreeSet::new(),
        });
        debug!(session_id, namespace = %handshake.namespace, "sim session opened");

        Some((session_id, inbox))
    }

    pub(crate) fn close(&self, session: SessionId) {
        if self.lock().sessions.remove(&session).is_some() {
            debug!(session, "sim session closed");
        }
    }

    /// Returns `false` if the session is gone.
    pub(crate) fn receive(&self, session: SessionId, command: Command) -> bool {
        let mut state = self.lock();
        if !state.sessions.contains_key(&session) {
            return false;
        }
        state.commands.push((session, command.clone()));

        match command {
            Command::JoinChat { chat_id } => {
                if let Some(s) = state.sessions.get_mut(&session) {
                    s.chats.insert(chat_id);
                }
            },
            Command::LeaveChat { chat_id } => {
                if let Some(s) = state.sessions.get_mut(&session) {
                    s.chats.remove(&chat_id);
                }
            },
            Command::SendMessage(send) => {
                state.last_message += 1;
                let id = state.last_message;
                let Some(sender_id) = state.sessions.get(&session).map(|s| s.user_id.clone())
                else {
                    return false;
                };
                let offset = i64::try_from(id).unwrap_or_default();
                let created_at =
                    DateTime::<Utc>::from_timestamp(BASE_TIMESTAMP.saturating_add(offset), 0)
                        .unwrap_or_default();
                let echo = ServerEvent::NewMessage(MessagePayload {
                    id,
                    chat_id: send.chat_id,
                    sender_id,
                    message: send.message,
                    kind: MessageKind::Text,
                    created_at,
                    is_edited: false,
                    is_deleted: false,
                });
                Self::fan_out(&state, session, send.chat_id, &echo);
            },
            Command::MarkAsRead(read) => {
                let Some(reader_id) = state.sessions.get(&session).map(|s| s.user_id.clone())
                else {
                    return false;
                };
                let receipt = ServerEvent::MessagesRead(ReadReceipt {
                    chat_id: read.chat_id,
                    reader_id,
                    message_ids: read.message_ids,
                });
                Self::fan_out(&state, session, read.chat_id, &receipt);
            },
            Command::Handshake(_) | Command::JoinRoom { .. } => {},
        }
        true
    }

    /// Deliver to the origin session and every session joined to `chat_id`.
    fn fan_out(state: &BrokerState, origin: SessionId, chat_id: ChatId, event: &ServerEvent) {
        let Ok(text) = event.encode() else {
            return;
        };
        for (id, session) in &state.sessions {
            if *id == origin || session.chats.contains(&chat_id) {
                let _ = session.outbox.send(text.clone());
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
