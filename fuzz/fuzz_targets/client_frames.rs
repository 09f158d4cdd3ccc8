//! Fuzz target for the client state machine.
//!
//! Drives a `Client` with arbitrary frames, selections, sends and drops.
//! Checks after every step:
//! - nothing panics
//! - the selected conversation never accumulates unread messages
//! - sends are only emitted while connected

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use gigchat_client::{Client, ClientEvent, ClientIdentity};
use gigchat_core::{ConnectionConfig, env::Environment};
use gigchat_proto::Namespace;
use libfuzzer_sys::fuzz_target;

#[derive(Clone)]
struct FuzzEnv;

impl Environment for FuzzEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        Duration::ZERO
    }

    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        std::future::ready(())
    }
}

#[derive(Debug, Arbitrary)]
enum Op {
    Frame(String),
    Select(Option<u8>),
    Send { chat_id: u8, body: String },
    Read(u8),
    Drop,
    Connect,
    Tick(u8),
}

fuzz_target!(|ops: Vec<Op>| {
    let identity = ClientIdentity::new("me", "token");
    let config = ConnectionConfig { handshake_timeout: Some(Duration::from_secs(20)) };
    let mut client = Client::new(FuzzEnv, identity, Namespace::Chat, config);
    let _ = client.connect();

    for op in ops {
        match op {
            Op::Frame(text) => {
                let _ = client.handle(ClientEvent::FrameReceived(text));
            },
            Op::Select(target) => {
                let _ = client.select_chat(target.map(u64::from));
            },
            Op::Send { chat_id, body } => {
                let status = client.send_message(u64::from(chat_id), body);
                assert!(!status.is_sent() || client.is_connected());
            },
            Op::Read(chat_id) => {
                let status = client.mark_as_read(u64::from(chat_id), Vec::new());
                assert!(!status.is_sent() || client.is_connected());
            },
            Op::Drop => {
                let _ = client.handle(ClientEvent::TransportClosed { reason: "fuzz".to_string() });
            },
            Op::Connect => {
                let _ = client.connect();
            },
            Op::Tick(secs) => {
                let now = Duration::from_secs(u64::from(secs));
                let _ = client.handle(ClientEvent::Tick { now });
            },
        }

        if let Some(current) = client.current_chat()
            && let Some(chat) = client.chats().get(current)
        {
            assert_eq!(chat.unread, 0);
        }
    }
});
