//! Property tests for the client state machine.
//!
//! These tests verify critical invariants over arbitrary interleavings of
//! selections, incoming messages, drops and reconnects:
//! - The selected conversation never counts unread messages
//! - Message ids are unique within a conversation
//! - Room commands only reach the wire while connected

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use gigchat_client::{Client, ClientAction, ClientEvent, ClientIdentity};
use gigchat_core::{ConnectionConfig, env::Environment};
use gigchat_harness::SimEnv;
use gigchat_proto::{Command, MessageKind, MessagePayload, Namespace, ServerEvent};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Select(Option<u64>),
    Incoming { id: u64, chat_id: u64 },
    Drop,
    Reconnect,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        prop::option::of(0u64..4).prop_map(Op::Select),
        (1u64..20, 1u64..4).prop_map(|(id, chat_id)| Op::Incoming { id, chat_id }),
        Just(Op::Drop),
        Just(Op::Reconnect),
    ]
}

fn frame(event: &ServerEvent) -> ClientEvent<<SimEnv as Environment>::Instant> {
    ClientEvent::FrameReceived(event.encode().unwrap())
}

fn incoming(id: u64, chat_id: u64) -> ServerEvent {
    ServerEvent::NewMessage(MessagePayload {
        id,
        chat_id,
        sender_id: "bob".into(),
        message: format!("m{id}"),
        kind: MessageKind::Text,
        created_at: DateTime::<Utc>::from_timestamp(1_714_557_600, 0).unwrap(),
        is_edited: false,
        is_deleted: false,
    })
}

fn room_commands(actions: &[ClientAction]) -> usize {
    actions
        .iter()
        .filter(|a| {
            matches!(
                a,
                ClientAction::Send(Command::JoinChat { .. } | Command::LeaveChat { .. })
            )
        })
        .count()
}

proptest! {
    /// INVARIANT: the current conversation stays read and ids stay unique.
    #[test]
    fn selection_and_delivery(ops in prop::collection::vec(op(), 0..80)) {
        let mut client = Client::new(
            SimEnv::new(),
            ClientIdentity::new("me", "abc"),
            Namespace::Chat,
            ConnectionConfig::default(),
        );
        client.connect().unwrap();
        client.handle(frame(&ServerEvent::Connect { sid: "s0".into() })).unwrap();

        for op in ops {
            match op {
                Op::Select(target) => {
                    let connected = client.is_connected();
                    let actions = client.select_chat(target);
                    if !connected {
                        prop_assert_eq!(room_commands(&actions), 0);
                    }
                },
                Op::Incoming { id, chat_id } => {
                    // Frames only arrive on a live socket.
                    if client.is_connected() {
                        client.handle(frame(&incoming(id, chat_id))).unwrap();
                    }
                },
                Op::Drop => {
                    client.handle(ClientEvent::TransportClosed { reason: "drop".into() }).unwrap();
                },
                Op::Reconnect => {
                    if !client.state().is_connected() && client.connect().is_ok() {
                        let actions =
                            client.handle(frame(&ServerEvent::Connect { sid: "s1".into() })).unwrap();
                        let expected = usize::from(client.current_chat().is_some());
                        prop_assert_eq!(room_commands(&actions), expected);
                    }
                },
            }

            if let Some(current) = client.current_chat()
                && let Some(chat) = client.chats().get(current)
            {
                prop_assert_eq!(chat.unread, 0);
            }
            for chat in client.chats().chats() {
                let ids: HashSet<u64> = chat.messages.iter().map(|m| m.id).collect();
                prop_assert_eq!(ids.len(), chat.messages.len());
            }
        }
    }
}
