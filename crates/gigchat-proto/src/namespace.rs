//! Connection namespaces.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Logically separate connection context on the same endpoint.
///
/// Each namespace gets its own socket, handshake, and event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Namespace {
    /// Conversation traffic: messages, presence, read receipts.
    #[serde(rename = "/chat")]
    Chat,
    /// User-scoped notification feed.
    #[serde(rename = "/notification")]
    Notification,
}

impl Namespace {
    /// Path segment appended to the endpoint.
    pub const fn path(self) -> &'static str {
        match self {
            Self::Chat => "/chat",
            Self::Notification => "/notification",
        }
    }

    /// Websocket URL for this namespace on `endpoint`.
    pub fn url(self, endpoint: &str) -> String {
        format!("{}{}", endpoint.trim_end_matches('/'), self.path())
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path().trim_start_matches('/'))
    }
}

impl FromStr for Namespace {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_start_matches('/') {
            "chat" => Ok(Self::Chat),
            "notification" => Ok(Self::Notification),
            other => Err(ProtocolError::UnknownNamespace(other.to_string())),
        }
    }
}
