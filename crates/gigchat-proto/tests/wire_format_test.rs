//! Wire format snapshots and decoder robustness.
//!
//! Snapshots pin the exact JSON the server contract expects. The property
//! tests check that decoding never panics and that rejected frames always
//! carry a typed error.

use gigchat_proto::{
    Auth, Command, Handshake, MarkAsRead, MessageKind, MessagePayload, Namespace, ServerEvent,
};
use proptest::prelude::*;

#[test]
fn send_message_wire_format() {
    let text = Command::text(42, "hi").encode().unwrap();
    insta::assert_snapshot!(text, @r#"{"event":"sendMessage","data":{"chatId":42,"message":"hi","type":"TEXT"}}"#);
}

#[test]
fn join_chat_wire_format() {
    let text = Command::JoinChat { chat_id: 42 }.encode().unwrap();
    insta::assert_snapshot!(text, @r#"{"event":"joinChat","data":42}"#);
}

#[test]
fn join_room_wire_format() {
    let text = Command::JoinRoom { user_id: "17".into() }.encode().unwrap();
    insta::assert_snapshot!(text, @r#"{"event":"joinRoom","data":"17"}"#);
}

#[test]
fn mark_as_read_wire_format() {
    let text =
        Command::MarkAsRead(MarkAsRead { chat_id: 5, message_ids: vec![1, 2] }).encode().unwrap();
    insta::assert_snapshot!(text, @r#"{"event":"markAsRead","data":{"chatId":5,"messageIds":[1,2]}}"#);
}

#[test]
fn handshake_carries_token_in_auth_field() {
    let text = Command::Handshake(Handshake { namespace: Namespace::Chat, auth: Auth::new("abc") })
        .encode()
        .unwrap();
    insta::assert_snapshot!(text, @r#"{"event":"handshake","data":{"namespace":"/chat","auth":{"token":"abc"}}}"#);
}

#[test]
fn new_message_wire_format() {
    let event = ServerEvent::NewMessage(MessagePayload {
        id: 7,
        chat_id: 42,
        sender_id: "u1".into(),
        message: "hi".into(),
        kind: MessageKind::Text,
        created_at: "2024-05-01T10:00:00Z".parse().unwrap(),
        is_edited: false,
        is_deleted: false,
    });

    insta::assert_snapshot!(event.encode().unwrap(), @r#"{"event":"newMessage","data":{"id":7,"chatId":42,"senderId":"u1","message":"hi","type":"TEXT","createdAt":"2024-05-01T10:00:00Z","isEdited":false,"isDeleted":false}}"#);
}

proptest! {
    #[test]
    fn decode_never_panics(text in ".{0,256}") {
        let _ = ServerEvent::decode(&text);
        let _ = Command::decode(&text);
    }

    #[test]
    fn known_names_with_garbage_payload_are_typed_errors(
        name in prop::sample::select(vec![
            "newMessage", "messageUpdated", "messageDeleted", "userPresence",
            "messagesRead", "notification", "connect", "connect_error",
        ]),
        garbage in prop_oneof![
            Just("null".to_string()),
            Just("[]".to_string()),
            Just("\"x\"".to_string()),
            (0u64..1000).prop_map(|n| n.to_string()),
        ],
    ) {
        let frame = format!(r#"{{"event":"{name}","data":{garbage}}}"#);
        prop_assert!(ServerEvent::decode(&frame).is_err(), "{frame} decoded");
    }

    #[test]
    fn roster_preserves_order_and_members(ids in prop::collection::vec("[a-z0-9]{1,8}", 0..20)) {
        let frame = serde_json::json!({ "event": "onlineUsers", "data": ids }).to_string();
        let decoded = ServerEvent::decode(&frame).unwrap();

        let expected: Vec<_> = ids.iter().map(|id| id.as_str().into()).collect();
        prop_assert_eq!(decoded, ServerEvent::OnlineUsers(expected));
    }
}
