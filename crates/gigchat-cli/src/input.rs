//! Typed input lines.
//!
//! Lines starting with `/` are commands; anything else is a message for the
//! current conversation.

use gigchat_proto::ChatId;
use thiserror::Error;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// `/join <id>`: switch to a conversation.
    Join(ChatId),
    /// `/leave`: leave the current conversation.
    Leave,
    /// `/read`: mark everything in the current conversation read.
    Read,
    /// `/online`: print who is online.
    Online,
    /// `/chats`: list known conversations.
    Chats,
    /// `/notifications`: print the notification feed and mark it read.
    Notifications,
    /// `/reconnect`: handshake again after a drop.
    Reconnect,
    /// `/quit`: exit.
    Quit,
    /// Message body for the current conversation.
    Say(String),
    /// Blank line.
    Empty,
}

/// Rejected input lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Command name not recognised.
    #[error("unknown command: /{0}")]
    UnknownCommand(String),

    /// Command needs an argument.
    #[error("/{0} needs an argument")]
    MissingArgument(&'static str),

    /// Conversation id is not a number.
    #[error("invalid conversation id: {0}")]
    InvalidChatId(String),
}

impl Input {
    /// Parse one line.
    ///
    /// # Errors
    ///
    /// - `InputError::UnknownCommand` for an unrecognised `/command`
    /// - `InputError::MissingArgument` for `/join` without an id
    /// - `InputError::InvalidChatId` for a non-numeric id
    pub fn parse(line: &str) -> Result<Self, InputError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(Self::Empty);
        }

        let Some(command) = line.trim_start().strip_prefix('/') else {
            return Ok(Self::Say(line.to_string()));
        };

        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        match name {
            "join" => {
                let raw = parts.next().ok_or(InputError::MissingArgument("join"))?;
                raw.parse::<ChatId>()
                    .map(Self::Join)
                    .map_err(|_| InputError::InvalidChatId(raw.to_string()))
            },
            "leave" => Ok(Self::Leave),
            "read" => Ok(Self::Read),
            "online" => Ok(Self::Online),
            "chats" => Ok(Self::Chats),
            "notifications" => Ok(Self::Notifications),
            "reconnect" => Ok(Self::Reconnect),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(InputError::UnknownCommand(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands() {
        assert_eq!(Input::parse("/join 42"), Ok(Input::Join(42)));
        assert_eq!(Input::parse("  /join   7  "), Ok(Input::Join(7)));
        assert_eq!(Input::parse("/leave"), Ok(Input::Leave));
        assert_eq!(Input::parse("/read"), Ok(Input::Read));
        assert_eq!(Input::parse("/online"), Ok(Input::Online));
        assert_eq!(Input::parse("/chats"), Ok(Input::Chats));
        assert_eq!(Input::parse("/notifications"), Ok(Input::Notifications));
        assert_eq!(Input::parse("/reconnect"), Ok(Input::Reconnect));
        assert_eq!(Input::parse("/quit"), Ok(Input::Quit));
        assert_eq!(Input::parse("/exit\n"), Ok(Input::Quit));
    }

    #[test]
    fn plain_lines_are_messages() {
        assert_eq!(Input::parse("hello there"), Ok(Input::Say("hello there".to_string())));
        assert_eq!(Input::parse("  indented\r\n"), Ok(Input::Say("  indented".to_string())));
    }

    #[test]
    fn blank_lines() {
        assert_eq!(Input::parse(""), Ok(Input::Empty));
        assert_eq!(Input::parse("   \n"), Ok(Input::Empty));
    }

    #[test]
    fn rejected() {
        assert_eq!(Input::parse("/join"), Err(InputError::MissingArgument("join")));
        assert_eq!(Input::parse("/join abc"), Err(InputError::InvalidChatId("abc".to_string())));
        assert_eq!(Input::parse("/dance"), Err(InputError::UnknownCommand("dance".to_string())));
        assert_eq!(Input::parse("/"), Err(InputError::UnknownCommand(String::new())));
    }
}
