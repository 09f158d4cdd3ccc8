//! Conversation membership of the socket.
//!
//! The socket is joined to at most one conversation. Switching emits an
//! explicit leave for the previous conversation before joining the next, so
//! the server never fans out events for a conversation nobody is viewing.

use gigchat_proto::{ChatId, Command};

/// Tracks the conversation the socket is joined to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomMembership {
    current: Option<ChatId>,
}

impl RoomMembership {
    /// Not joined to any conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Conversation currently joined.
    pub fn current(&self) -> Option<ChatId> {
        self.current
    }

    /// Change the target conversation.
    ///
    /// Zero is treated as "none". Selecting the current conversation again
    /// emits nothing. Otherwise emits `leaveChat` for the previous
    /// conversation (if any) followed by `joinChat` for the new one (if any),
    /// in that order.
    pub fn select(&mut self, target: Option<ChatId>) -> Vec<Command> {
        let target = target.filter(|id| *id != 0);
        if target == self.current {
            return vec![];
        }

        let mut commands = Vec::with_capacity(2);
        if let Some(previous) = self.current.take() {
            commands.push(Command::LeaveChat { chat_id: previous });
        }
        if let Some(chat_id) = target {
            commands.push(Command::JoinChat { chat_id });
        }

        self.current = target;
        commands
    }

    /// Join command for the current conversation, used after a reconnect.
    pub fn rejoin(&self) -> Option<Command> {
        self.current.map(|chat_id| Command::JoinChat { chat_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_selection_joins() {
        let mut rooms = RoomMembership::new();
        assert_eq!(rooms.select(Some(7)), vec![Command::JoinChat { chat_id: 7 }]);
        assert_eq!(rooms.current(), Some(7));
    }

    #[test]
    fn switching_leaves_then_joins() {
        let mut rooms = RoomMembership::new();
        rooms.select(Some(7));

        assert_eq!(rooms.select(Some(9)), vec![
            Command::LeaveChat { chat_id: 7 },
            Command::JoinChat { chat_id: 9 },
        ]);
    }

    #[test]
    fn reselecting_is_silent() {
        let mut rooms = RoomMembership::new();
        rooms.select(Some(7));
        assert!(rooms.select(Some(7)).is_empty());
    }

    #[test]
    fn zero_and_none_only_leave() {
        let mut rooms = RoomMembership::new();
        assert!(rooms.select(Some(0)).is_empty());

        rooms.select(Some(7));
        assert_eq!(rooms.select(Some(0)), vec![Command::LeaveChat { chat_id: 7 }]);
        assert_eq!(rooms.current(), None);
        assert!(rooms.select(None).is_empty());
    }

    #[test]
    fn rejoin_targets_current() {
        let mut rooms = RoomMembership::new();
        assert_eq!(rooms.rejoin(), None);
        rooms.select(Some(3));
        assert_eq!(rooms.rejoin(), Some(Command::JoinChat { chat_id: 3 }));
    }
}
