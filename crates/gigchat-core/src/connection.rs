//! Namespace connection state machine.
//!
//! Tracks the handshake lifecycle of one socket. Uses the action pattern:
//! methods take time as input and return actions for the driver to execute,
//! keeping the state machine free of I/O.
//!
//! # State Machine
//!
//! ```text
//! ┌──────────────┐  begin   ┌────────────┐   connect    ┌───────────┐
//! │ Disconnected │─────────>│ Connecting │─────────────>│ Connected │
//! └──────────────┘          └────────────┘              └───────────┘
//!        ^                        │                           │
//!        │   connect_error /      │          disconnect /     │
//!        │   handshake timeout    │          transport drop   │
//!        └────────────────────────┴───────────────────────────┘
//! ```
//!
//! Failures never surface as errors to the caller: they are transitions back
//! to `Disconnected`. There is no reconnect loop at this layer.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use gigchat_proto::{Auth, Handshake, Namespace, ServerEvent};

use crate::error::ConnectionError;

/// Time allowed between opening the socket and receiving `connect`.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(20);

/// Actions returned by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionAction {
    /// Open a socket and send this handshake as the first frame.
    Open(Handshake),

    /// Close the socket.
    Close {
        /// Reason for closing.
        reason: String,
    },
}

/// Connection state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket, or the last one failed or closed.
    Disconnected,
    /// Handshake sent, waiting for `connect`.
    Connecting,
    /// Handshake accepted.
    Connected {
        /// Server-side session id.
        sid: String,
    },
}

impl ConnectionState {
    /// Whether commands can be sent.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

/// Connection configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Give up on a handshake after this long. `None` waits forever.
    pub handshake_timeout: Option<Duration>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self { handshake_timeout: Some(DEFAULT_HANDSHAKE_TIMEOUT) }
    }
}

/// Connection state machine for one namespace.
///
/// Generic over `I` to support both real time and virtual time for
/// deterministic testing.
#[derive(Debug, Clone)]
pub struct Connection<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    namespace: Namespace,
    auth: Auth,
    config: ConnectionConfig,
    state: ConnectionState,
    /// When the current handshake was sent. `None` unless connecting.
    started_at: Option<I>,
}

impl<I> Connection<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a connection in [`ConnectionState::Disconnected`].
    pub fn new(namespace: Namespace, auth: Auth, config: ConnectionConfig) -> Self {
        Self { namespace, auth, config, state: ConnectionState::Disconnected, started_at: None }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Namespace this connection serves.
    #[must_use]
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Whether commands can be sent.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Whether a credential is available.
    #[must_use]
    pub fn has_credential(&self) -> bool {
        !self.auth.is_blank()
    }

    /// Start the handshake.
    ///
    /// Without a credential this is a no-op: no actions, state unchanged.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if not disconnected
    pub fn begin(&mut self, now: I) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if self.state != ConnectionState::Disconnected {
            return Err(ConnectionError::InvalidState {
                state: self.state.clone(),
                operation: "begin",
            });
        }

        if !self.has_credential() {
            return Ok(vec![]);
        }

        self.state = ConnectionState::Connecting;
        self.started_at = Some(now);

        let handshake = Handshake { namespace: self.namespace, auth: self.auth.clone() };
        Ok(vec![ConnectionAction::Open(handshake)])
    }

    /// Process a lifecycle-relevant event.
    ///
    /// Data events (messages, presence) are accepted only while connected.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::UnexpectedEvent` for `connect` outside `Connecting`,
    ///   or data events outside `Connected`
    pub fn handle_event(
        &mut self,
        event: &ServerEvent,
    ) -> Result<Vec<ConnectionAction>, ConnectionError> {
        match (&self.state, event) {
            (ConnectionState::Connecting, ServerEvent::Connect { sid }) => {
                self.state = ConnectionState::Connected { sid: sid.clone() };
                self.started_at = None;
                Ok(vec![])
            },

            (ConnectionState::Disconnected, ServerEvent::ConnectError { .. })
            | (ConnectionState::Disconnected, ServerEvent::Disconnect { .. }) => Ok(vec![]),

            (_, ServerEvent::ConnectError { message }) => {
                self.reset();
                Ok(vec![ConnectionAction::Close { reason: format!("handshake rejected: {message}") }])
            },

            (_, ServerEvent::Disconnect { reason }) => {
                self.reset();
                let reason = reason.clone().unwrap_or_else(|| "server disconnect".to_string());
                Ok(vec![ConnectionAction::Close { reason }])
            },

            (ConnectionState::Connected { .. }, ServerEvent::Connect { .. }) => {
                Err(ConnectionError::UnexpectedEvent { state: self.state.clone(), event: event.name() })
            },

            (ConnectionState::Connected { .. }, _) => Ok(vec![]),

            (state, event) => {
                Err(ConnectionError::UnexpectedEvent { state: state.clone(), event: event.name() })
            },
        }
    }

    /// The socket went away underneath us.
    pub fn transport_closed(&mut self) {
        self.reset();
    }

    /// Explicit teardown.
    ///
    /// Returns a `Close` action unless already disconnected.
    pub fn close(&mut self, reason: impl Into<String>) -> Vec<ConnectionAction> {
        if self.state == ConnectionState::Disconnected {
            return vec![];
        }
        self.reset();
        vec![ConnectionAction::Close { reason: reason.into() }]
    }

    /// Elapsed handshake time, if the handshake deadline has passed.
    #[must_use]
    pub fn check_timeout(&self, now: I) -> Option<Duration> {
        let (Some(started_at), Some(timeout)) = (self.started_at, self.config.handshake_timeout)
        else {
            return None;
        };

        let elapsed = now - started_at;
        if elapsed > timeout { Some(elapsed) } else { None }
    }

    /// Periodic maintenance: abandons handshakes past their deadline.
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction> {
        match self.check_timeout(now) {
            Some(elapsed) => {
                self.reset();
                vec![ConnectionAction::Close { reason: format!("handshake timeout after {elapsed:?}") }]
            },
            None => vec![],
        }
    }

    fn reset(&mut self) {
        self.state = ConnectionState::Disconnected;
        self.started_at = None;
    }
}
