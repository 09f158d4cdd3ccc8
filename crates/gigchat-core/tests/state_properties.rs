//! Property tests for conversation and presence state.
//!
//! These tests verify critical invariants:
//! - A roster snapshot fully replaces the online set
//! - Appending the same message id twice never duplicates it
//! - Unread counters only grow for conversations that are not active
//! - Room switching always leaves before it joins

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use gigchat_core::{ChatStore, PresenceTracker, RoomMembership};
use gigchat_proto::{Command, MessageKind, MessagePayload, PresenceStatus, PresenceUpdate, UserId};
use proptest::prelude::*;

fn user() -> impl Strategy<Value = UserId> {
    (1u64..20).prop_map(UserId::from)
}

fn payload(id: u64, chat_id: u64, sender: &str) -> MessagePayload {
    MessagePayload {
        id,
        chat_id,
        sender_id: sender.into(),
        message: format!("msg {id}"),
        kind: MessageKind::Text,
        created_at: DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap(),
        is_edited: false,
        is_deleted: false,
    }
}

proptest! {
    /// INVARIANT: after any history of updates, the online set equals the
    /// last roster snapshot exactly.
    #[test]
    fn roster_replaces_online_set(
        updates in prop::collection::vec((user(), any::<bool>()), 0..20),
        roster in prop::collection::vec(user(), 0..10),
    ) {
        let mut tracker = PresenceTracker::new();
        for (user_id, online) in updates {
            let status = if online { PresenceStatus::Online } else { PresenceStatus::Offline };
            tracker.apply(&PresenceUpdate { user_id, status, last_seen: None });
        }

        tracker.replace_roster(roster.clone());

        let expected: BTreeSet<UserId> = roster.into_iter().collect();
        prop_assert_eq!(tracker.online(), &expected);
    }

    /// INVARIANT: a conversation never holds two messages with the same id.
    #[test]
    fn append_deduplicates(ids in prop::collection::vec(1u64..30, 0..60)) {
        let mut store = ChatStore::new("me".into());
        for id in &ids {
            store.append(payload(*id, 1, "peer"), None);
        }

        let unique: BTreeSet<u64> = ids.iter().copied().collect();
        let held: Vec<u64> = store.messages(1).iter().map(|m| m.id).collect();
        prop_assert_eq!(held.len(), unique.len());
        prop_assert_eq!(u32::try_from(unique.len()).unwrap(), store.get(1).map_or(0, |c| c.unread));
    }

    /// INVARIANT: messages for the active conversation never count as unread.
    #[test]
    fn active_chat_stays_read(chats in prop::collection::vec(1u64..4, 1..40)) {
        let mut store = ChatStore::new("me".into());
        for (id, chat_id) in chats.iter().enumerate() {
            store.append(payload(id as u64 + 1, *chat_id, "peer"), Some(1));
        }

        let inactive = chats.iter().filter(|c| **c != 1).count();
        prop_assert_eq!(store.get(1).map_or(0, |c| c.unread), 0);
        prop_assert_eq!(store.total_unread() as usize, inactive);
    }

    /// INVARIANT: every switch emits at most one leave followed by at most
    /// one join, and the leave targets the previous conversation.
    #[test]
    fn switching_leaves_before_join(targets in prop::collection::vec(prop::option::of(0u64..5), 0..30)) {
        let mut rooms = RoomMembership::new();
        for target in targets {
            let previous = rooms.current();
            let commands = rooms.select(target);

            match commands.as_slice() {
                [] => prop_assert_eq!(previous, rooms.current()),
                [Command::JoinChat { chat_id }] => {
                    prop_assert_eq!(previous, None);
                    prop_assert_eq!(Some(*chat_id), rooms.current());
                },
                [Command::LeaveChat { chat_id }] => {
                    prop_assert_eq!(Some(*chat_id), previous);
                    prop_assert_eq!(rooms.current(), None);
                },
                [Command::LeaveChat { chat_id: left }, Command::JoinChat { chat_id: joined }] => {
                    prop_assert_eq!(Some(*left), previous);
                    prop_assert_eq!(Some(*joined), rooms.current());
                    prop_assert_ne!(left, joined);
                },
                other => prop_assert!(false, "unexpected commands: {:?}", other),
            }
        }
    }
}
