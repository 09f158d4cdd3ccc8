//! Client flow tests: handshake, dispatch, room switching, and sends.
//!
//! These tests drive the Sans-IO client with hand-built frames and check the
//! actions it hands back, without any socket.

use std::time::Duration;

use chrono::{DateTime, Utc};
use gigchat_client::{
    ChatEvent, Client, ClientAction, ClientError, ClientEvent, ClientIdentity, DropReason,
    SendStatus,
};
use gigchat_core::{ConnectionConfig, ConnectionState, env::Environment};
use gigchat_harness::SimEnv;
use gigchat_proto::{
    Command, MessageDeleted, MessageKind, MessagePayload, Namespace, NotificationPayload,
    PresenceStatus, PresenceUpdate, ReadReceipt, ServerEvent, UserId,
};

fn client(namespace: Namespace, token: &str) -> Client<SimEnv> {
    Client::new(
        SimEnv::new(),
        ClientIdentity::new("me", token),
        namespace,
        ConnectionConfig::default(),
    )
}

fn frame(event: ServerEvent) -> ClientEvent<<SimEnv as Environment>::Instant> {
    ClientEvent::FrameReceived(event.encode().unwrap())
}

fn connected(namespace: Namespace) -> Client<SimEnv> {
    let mut client = client(namespace, "abc");
    client.connect().unwrap();
    client.handle(frame(ServerEvent::Connect { sid: "s1".into() })).unwrap();
    client
}

fn message(id: u64, chat_id: u64, sender: &str, body: &str) -> MessagePayload {
    MessagePayload {
        id,
        chat_id,
        sender_id: sender.into(),
        message: body.into(),
        kind: MessageKind::Text,
        created_at: DateTime::<Utc>::from_timestamp(1_714_557_600, 0).unwrap(),
        is_edited: false,
        is_deleted: false,
    }
}

fn sends(actions: &[ClientAction]) -> Vec<Command> {
    actions
        .iter()
        .filter_map(|a| match a {
            ClientAction::Send(command) => Some(command.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn send_and_echo_end_to_end() {
    let mut client = client(Namespace::Chat, "abc");

    let actions = client.connect().unwrap();
    assert!(matches!(actions.first(), Some(ClientAction::Open(handshake)) if handshake.auth.token == "abc"));

    let actions = client.handle(frame(ServerEvent::Connect { sid: "s1".into() })).unwrap();
    assert!(actions.contains(&ClientAction::Notify(ChatEvent::ConnectionChanged(
        ConnectionState::Connected { sid: "s1".into() }
    ))));

    let status = client.send_message(42, "hi");
    let SendStatus::Sent(command) = status else { panic!("expected send, got {status:?}") };
    assert_eq!(
        command.encode().unwrap(),
        r#"{"event":"sendMessage","data":{"chatId":42,"message":"hi","type":"TEXT"}}"#
    );

    // No optimistic insert.
    assert!(client.chats().messages(42).is_empty());

    let actions = client.handle(frame(ServerEvent::NewMessage(message(7, 42, "me", "hi")))).unwrap();
    assert!(matches!(
        actions.as_slice(),
        [ClientAction::Notify(ChatEvent::MessageAppended(m))] if m.id == 7
    ));

    let messages = client.chats().messages(42);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, 7);
    assert_eq!(messages[0].body, "hi");
}

#[test]
fn no_credential_never_connects() {
    let mut client = client(Namespace::Chat, "");

    assert!(client.connect().unwrap().is_empty());
    assert_eq!(client.state(), &ConnectionState::Disconnected);
    assert!(!client.has_credential());
}

#[test]
fn send_while_disconnected_is_dropped() {
    let mut client = client(Namespace::Chat, "abc");
    assert_eq!(client.send_message(42, "hi"), SendStatus::Dropped(DropReason::NotConnected));

    // Still connecting counts as not connected.
    client.connect().unwrap();
    assert_eq!(client.send_message(42, "hi"), SendStatus::Dropped(DropReason::NotConnected));
    assert_eq!(client.mark_as_read(42, vec![]), SendStatus::Dropped(DropReason::NotConnected));
}

#[test]
fn send_rejects_zero_chat_and_blank_body() {
    let client = connected(Namespace::Chat);

    assert_eq!(client.send_message(0, "hi"), SendStatus::Dropped(DropReason::NoConversation));
    assert_eq!(client.send_message(42, "   "), SendStatus::Dropped(DropReason::EmptyBody));
    assert_eq!(client.mark_as_read(0, vec![1]), SendStatus::Dropped(DropReason::NoConversation));
    assert!(client.mark_as_read(42, vec![1, 2]).is_sent());
}

#[test]
fn unread_counts_only_inactive_chats() {
    let mut client = connected(Namespace::Chat);
    client.select_chat(Some(1));

    client.handle(frame(ServerEvent::NewMessage(message(10, 1, "bob", "a")))).unwrap();
    client.handle(frame(ServerEvent::NewMessage(message(11, 2, "carol", "b")))).unwrap();
    client.handle(frame(ServerEvent::NewMessage(message(12, 2, "carol", "c")))).unwrap();
    // Echo of our own send to an inactive conversation.
    client.handle(frame(ServerEvent::NewMessage(message(13, 2, "me", "d")))).unwrap();

    assert_eq!(client.chats().get(1).map(|c| c.unread), Some(0));
    assert_eq!(client.chats().get(2).map(|c| c.unread), Some(2));
    assert_eq!(
        client.chats().get(2).and_then(|c| c.last_message.as_ref()).map(|p| p.body.as_str()),
        Some("d")
    );

    // Selecting the conversation clears its counter.
    client.select_chat(Some(2));
    assert_eq!(client.chats().get(2).map(|c| c.unread), Some(0));
}

#[test]
fn duplicate_message_is_not_appended_twice() {
    let mut client = connected(Namespace::Chat);

    client.handle(frame(ServerEvent::NewMessage(message(7, 42, "bob", "hi")))).unwrap();
    let actions = client.handle(frame(ServerEvent::NewMessage(message(7, 42, "bob", "hi")))).unwrap();

    assert!(actions.is_empty());
    assert_eq!(client.chats().messages(42).len(), 1);
}

#[test]
fn edit_then_soft_delete_keeps_body() {
    let mut client = connected(Namespace::Chat);
    client.handle(frame(ServerEvent::NewMessage(message(7, 42, "bob", "hi")))).unwrap();

    client.handle(frame(ServerEvent::MessageUpdated(message(7, 42, "bob", "hello")))).unwrap();
    let actions = client
        .handle(frame(ServerEvent::MessageDeleted(MessageDeleted { id: 7, chat_id: None })))
        .unwrap();

    assert_eq!(actions, vec![ClientAction::Notify(ChatEvent::MessageDeleted {
        chat_id: 42,
        message_id: 7
    })]);
    let stored = &client.chats().messages(42)[0];
    assert!(stored.deleted);
    assert!(stored.edited);
    assert_eq!(stored.body, "hello");
}

#[test]
fn roster_replaces_and_presence_patches() {
    let mut client = connected(Namespace::Chat);
    client.register_chat(5, Some("bob".into()));

    client
        .handle(frame(ServerEvent::OnlineUsers(vec!["carol".into(), "dave".into()])))
        .unwrap();
    client.handle(frame(ServerEvent::OnlineUsers(vec!["bob".into(), "carol".into()]))).unwrap();

    let online: Vec<&str> = client.presence().online().iter().map(UserId::as_str).collect();
    assert_eq!(online, vec!["bob", "carol"]);
    assert_eq!(client.chats().get(5).map(|c| c.online), Some(true));

    let seen = DateTime::<Utc>::from_timestamp(1_714_560_000, 0);
    client
        .handle(frame(ServerEvent::UserPresence(PresenceUpdate {
            user_id: "bob".into(),
            status: PresenceStatus::Offline,
            last_seen: seen,
        })))
        .unwrap();

    assert!(!client.presence().is_online(&"bob".into()));
    let chat = client.chats().get(5).unwrap();
    assert!(!chat.online);
    assert_eq!(chat.last_seen, seen);
}

#[test]
fn switching_rooms_leaves_then_joins() {
    let mut client = connected(Namespace::Chat);

    assert_eq!(sends(&client.select_chat(Some(3))), vec![Command::JoinChat { chat_id: 3 }]);
    assert_eq!(sends(&client.select_chat(Some(4))), vec![
        Command::LeaveChat { chat_id: 3 },
        Command::JoinChat { chat_id: 4 },
    ]);
    assert!(client.select_chat(Some(4)).is_empty());
}

#[test]
fn selection_before_connect_joins_on_connect() {
    let mut client = client(Namespace::Chat, "abc");
    assert!(client.select_chat(Some(9)).is_empty());

    client.connect().unwrap();
    let actions = client.handle(frame(ServerEvent::Connect { sid: "s1".into() })).unwrap();

    assert_eq!(sends(&actions), vec![Command::JoinChat { chat_id: 9 }]);
}

#[test]
fn reconnect_rejoins_current_chat_once() {
    let mut client = connected(Namespace::Chat);
    client.select_chat(Some(9));

    client.handle(ClientEvent::TransportClosed { reason: "reset".into() }).unwrap();
    assert_eq!(client.state(), &ConnectionState::Disconnected);

    client.connect().unwrap();
    let actions = client.handle(frame(ServerEvent::Connect { sid: "s2".into() })).unwrap();
    assert_eq!(sends(&actions), vec![Command::JoinChat { chat_id: 9 }]);
}

#[test]
fn notification_namespace_joins_user_room() {
    let mut client = client(Namespace::Notification, "abc");
    client.connect().unwrap();
    let actions = client.handle(frame(ServerEvent::Connect { sid: "n1".into() })).unwrap();
    assert_eq!(sends(&actions), vec![Command::JoinRoom { user_id: "me".into() }]);

    let payload = NotificationPayload {
        id: 1,
        title: "Gig accepted".into(),
        body: String::new(),
        created_at: DateTime::<Utc>::from_timestamp(1_714_557_600, 0).unwrap(),
    };
    client.handle(frame(ServerEvent::Notification(payload.clone()))).unwrap();
    let duplicate = client.handle(frame(ServerEvent::Notification(payload))).unwrap();

    assert!(duplicate.is_empty());
    assert_eq!(client.notifications().len(), 1);
    assert_eq!(client.notifications().unread_count(), 1);
    client.mark_notifications_read();
    assert_eq!(client.notifications().unread_count(), 0);
}

#[test]
fn own_read_receipt_clears_unread() {
    let mut client = connected(Namespace::Chat);
    client.handle(frame(ServerEvent::NewMessage(message(1, 8, "bob", "a")))).unwrap();
    client.handle(frame(ServerEvent::NewMessage(message(2, 8, "bob", "b")))).unwrap();

    let actions = client
        .handle(frame(ServerEvent::MessagesRead(ReadReceipt {
            chat_id: 8,
            reader_id: "me".into(),
            message_ids: vec![1, 2],
        })))
        .unwrap();

    assert!(matches!(
        actions.as_slice(),
        [ClientAction::Notify(ChatEvent::MessagesRead { chat_id: 8, marked: 2, .. })]
    ));
    assert_eq!(client.chats().get(8).map(|c| c.unread), Some(0));
}

#[test]
fn malformed_frame_is_rejected_without_state_change() {
    let mut client = connected(Namespace::Chat);

    let result = client.handle(ClientEvent::FrameReceived(
        r#"{"event":"newMessage","data":{"id":"seven"}}"#.into(),
    ));
    assert!(matches!(result, Err(ClientError::Protocol(_))));

    let result = client.handle(ClientEvent::FrameReceived(r#"{"event":"typing","data":{}}"#.into()));
    assert!(matches!(result, Err(ClientError::Protocol(_))));

    assert_eq!(client.chats().chats().count(), 0);
    assert!(client.is_connected());
}

#[test]
fn data_before_connect_is_rejected() {
    let mut client = client(Namespace::Chat, "abc");
    client.connect().unwrap();

    let result = client.handle(frame(ServerEvent::NewMessage(message(1, 1, "bob", "early"))));

    assert!(matches!(result, Err(ClientError::Connection(_))));
    assert!(client.chats().messages(1).is_empty());
}

#[test]
fn handshake_rejection_and_server_disconnect() {
    let mut client = client(Namespace::Chat, "abc");
    client.connect().unwrap();

    let actions =
        client.handle(frame(ServerEvent::ConnectError { message: "invalid token".into() })).unwrap();
    assert!(matches!(actions.first(), Some(ClientAction::Close { reason }) if reason.contains("invalid token")));
    assert_eq!(client.state(), &ConnectionState::Disconnected);

    let mut client = connected(Namespace::Chat);
    let actions = client
        .handle(frame(ServerEvent::Disconnect { reason: Some("kicked".into()) }))
        .unwrap();
    assert_eq!(actions, vec![
        ClientAction::Close { reason: "kicked".into() },
        ClientAction::Notify(ChatEvent::ConnectionChanged(ConnectionState::Disconnected)),
    ]);
    assert_eq!(client.send_message(1, "hi"), SendStatus::Dropped(DropReason::NotConnected));
}

#[test]
fn handshake_timeout_closes_attempt() {
    let env = SimEnv::new();
    let start = env.now();
    let mut client = Client::new(
        env,
        ClientIdentity::new("me", "abc"),
        Namespace::Chat,
        ConnectionConfig { handshake_timeout: Some(Duration::from_secs(5)) },
    );
    client.connect().unwrap();

    let actions =
        client.handle(ClientEvent::Tick { now: start + Duration::from_secs(2) }).unwrap();
    assert!(actions.is_empty());

    let actions =
        client.handle(ClientEvent::Tick { now: start + Duration::from_secs(60) }).unwrap();
    assert!(matches!(actions.first(), Some(ClientAction::Close { .. })));
    assert_eq!(client.state(), &ConnectionState::Disconnected);
}

#[test]
fn explicit_close_notifies_once() {
    let mut client = connected(Namespace::Chat);

    let actions = client.close("logout");
    assert_eq!(actions.len(), 2);
    assert!(client.close("logout").is_empty());

    let snapshot = client.snapshot();
    assert_eq!(snapshot.connection, ConnectionState::Disconnected);
}
