//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the websocket driver but talks
//! to a [`SimBroker`] in-process, so the same [`gigchat_app::Runtime`] code
//! runs in production and in tests.

use gigchat_app::{Connector, Driver};
use gigchat_proto::{Command, Handshake, Namespace};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{SimBroker, SimEnv, sim_broker::SessionId};

/// Error type for the simulation driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimDriverError {
    /// Broker is configured unreachable.
    #[error("broker unreachable")]
    Unreachable,

    /// No open session.
    #[error("socket closed")]
    Closed,
}

/// Simulation driver for one namespace socket.
pub struct SimDriver {
    broker: SimBroker,
    namespace: Namespace,
    session: Option<(SessionId, mpsc::UnboundedReceiver<String>)>,
}

impl SimDriver {
    /// Driver for `namespace` on `broker`.
    pub fn new(broker: SimBroker, namespace: Namespace) -> Self {
        Self { broker, namespace, session: None }
    }

    /// Namespace this driver connects to.
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Broker session id, while open.
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|(id, _)| *id)
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = tokio::time::Instant;

    async fn open(&mut self, handshake: Handshake) -> Result<(), Self::Error> {
        if let Some((id, _)) = self.session.take() {
            self.broker.close(id);
        }
        if self.broker.is_stalled() {
            std::future::pending::<()>().await;
        }
        let session = self.broker.open(handshake).ok_or(SimDriverError::Unreachable)?;
        self.session = Some(session);
        Ok(())
    }

    async fn send(&mut self, command: Command) -> Result<(), Self::Error> {
        let Some((id, _)) = &self.session else {
            return Err(SimDriverError::Closed);
        };
        if self.broker.receive(*id, command) { Ok(()) } else { Err(SimDriverError::Closed) }
    }

    async fn recv(&mut self) -> Option<String> {
        let (_, inbox) = self.session.as_mut()?;
        inbox.recv().await
    }

    async fn close(&mut self) {
        if let Some((id, _)) = self.session.take() {
            self.broker.close(id);
        }
    }

    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }
}

/// Connector producing [`SimDriver`]s on one broker.
#[derive(Clone, Default)]
pub struct SimConnector {
    broker: SimBroker,
}

impl SimConnector {
    /// Connector for `broker`.
    pub fn new(broker: SimBroker) -> Self {
        Self { broker }
    }

    /// The broker drivers connect to.
    pub fn broker(&self) -> &SimBroker {
        &self.broker
    }
}

impl Connector for SimConnector {
    type Env = SimEnv;
    type Driver = SimDriver;

    fn env(&self) -> Self::Env {
        SimEnv::new()
    }

    fn driver(&self, namespace: Namespace) -> Self::Driver {
        SimDriver::new(self.broker.clone(), namespace)
    }
}
