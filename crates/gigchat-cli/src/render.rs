//! Plain-text rendering of chat events and snapshots.

use std::fmt::Write as _;

use gigchat_client::{ChatEvent, ClientSnapshot};
use gigchat_core::{ConnectionState, Message};
use gigchat_proto::PresenceStatus;

/// One line for `event`, or `None` when there is nothing worth printing.
pub fn event_line(event: &ChatEvent) -> Option<String> {
    let line = match event {
        ChatEvent::ConnectionChanged(state) => match state {
            ConnectionState::Disconnected => "* disconnected".to_string(),
            ConnectionState::Connecting => "* connecting".to_string(),
            ConnectionState::Connected { sid } => format!("* connected ({sid})"),
        },
        ChatEvent::MessageAppended(message) => message_line(message),
        ChatEvent::MessageEdited(message) => format!("{} (edited)", message_line(message)),
        ChatEvent::MessageDeleted { chat_id, message_id } => {
            format!("[{chat_id}] message #{message_id} deleted")
        },
        ChatEvent::RosterReplaced(diff) => {
            if diff.is_empty() {
                return None;
            }
            let joined = diff.joined.iter().map(|u| format!(" +{u}"));
            let left = diff.left.iter().map(|u| format!(" -{u}"));
            format!("* online:{}", joined.chain(left).collect::<String>())
        },
        ChatEvent::PresenceChanged(update) => match update.status {
            PresenceStatus::Online => format!("* {} is online", update.user_id),
            PresenceStatus::Offline => format!("* {} is offline", update.user_id),
        },
        ChatEvent::MessagesRead { chat_id, reader_id, marked } => {
            if *marked == 0 {
                return None;
            }
            format!("[{chat_id}] {reader_id} read {marked}")
        },
        ChatEvent::NotificationReceived(notification) => {
            format!("! {}: {}", notification.title, notification.body)
        },
    };
    Some(line)
}

fn message_line(message: &Message) -> String {
    let body = if message.deleted { "(deleted)" } else { message.body.as_str() };
    format!(
        "[{}] {} <{}> {}",
        message.chat_id,
        message.created_at.format("%H:%M"),
        message.sender_id,
        body
    )
}

/// Known conversations, one per line. The current one is starred.
pub fn chat_list(snapshot: &ClientSnapshot) -> String {
    if snapshot.chats.is_empty() {
        return "no conversations".to_string();
    }

    let mut out = String::new();
    for chat in &snapshot.chats {
        let marker = if snapshot.current_chat == Some(chat.id) { '*' } else { ' ' };
        let who = chat.counterparty.as_ref().map_or("-", |u| u.as_str());
        let presence = if chat.online { " online" } else { "" };
        let _ = write!(out, "{marker} {} {who} unread={}{presence}", chat.id, chat.unread);
        if let Some(preview) = &chat.last_message {
            let _ = write!(out, " last=\"{}\"", preview.body);
        }
        out.push('\n');
    }
    out.pop();
    out
}

/// Comma-separated online set.
pub fn online_line(snapshot: &ClientSnapshot) -> String {
    if snapshot.online.is_empty() {
        return "online: nobody".to_string();
    }
    let names: Vec<&str> = snapshot.online.iter().map(|u| u.as_str()).collect();
    format!("online: {}", names.join(", "))
}

/// Notification feed, newest first.
pub fn notification_list(snapshot: &ClientSnapshot) -> String {
    if snapshot.notifications.is_empty() {
        return "no notifications".to_string();
    }
    snapshot
        .notifications
        .iter()
        .map(|n| {
            let marker = if n.read { ' ' } else { '!' };
            format!("{marker} {}: {}", n.title, n.body)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
