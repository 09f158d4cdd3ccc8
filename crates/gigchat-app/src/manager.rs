//! Shared connection context.
//!
//! [`ConnectionManager`] is the only thing that creates or destroys a
//! namespace connection. Consumers hold a [`Lease`]; the connection lives as
//! long as at least one lease does.
//!
//! ```text
//!   acquire ──> count 0? ──yes──> spawn Runtime ──┐
//!                  │                              v
//!                  └──no──────────────────> count += 1 ──> Lease
//!
//!   Lease dropped ──> count -= 1 ──> count 0? ──yes──> remove slot, runtime exits
//!   release       ──> remove slot, close runtime (outstanding leases go inert)
//! ```

use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard},
};

use gigchat_client::{Client, ClientIdentity, ClientSnapshot, SendStatus};
use gigchat_proto::{Auth, ChatId, MessageId, Namespace, UserId};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info};

use crate::{Connector, Runtime, RuntimeConfig, RuntimeError, RuntimeHandle, Subscription};

/// One live connection.
struct Slot {
    handle: RuntimeHandle,
    task: JoinHandle<()>,
    leases: usize,
    /// Distinguishes this connection from earlier ones in the same namespace.
    generation: u64,
}

struct Inner<C: Connector> {
    connector: C,
    user_id: UserId,
    config: RuntimeConfig,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    slots: HashMap<Namespace, Slot>,
    next_generation: u64,
    spawned: usize,
}

/// Cloneable context owning every namespace connection of the process.
///
/// Clones share the same connections. Must be used inside a tokio runtime:
/// acquiring a new connection spawns its [`Runtime`] task.
pub struct ConnectionManager<C: Connector> {
    inner: Arc<Inner<C>>,
}

impl<C: Connector> Clone for ConnectionManager<C> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<C: Connector> fmt::Debug for ConnectionManager<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionManager").field("user_id", &self.inner.user_id).finish_non_exhaustive()
    }
}

impl<C: Connector> ConnectionManager<C> {
    /// Create a manager for the current user.
    pub fn new(connector: C, user_id: impl Into<UserId>, config: RuntimeConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                connector,
                user_id: user_id.into(),
                config,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Hold the connection for `namespace`, creating it if needed.
    ///
    /// Returns `None` without connecting when `credential` is blank. A live
    /// connection is reused whatever credential is passed; exactly one
    /// connection exists per namespace.
    pub fn acquire(&self, namespace: Namespace, credential: &str) -> Option<Lease<C>> {
        if Auth::new(credential).is_blank() {
            debug!(%namespace, "no credential, not acquiring");
            return None;
        }

        let mut state = self.lock();

        if let Some(slot) = state.slots.get_mut(&namespace) {
            if slot.task.is_finished() {
                debug!(%namespace, "previous runtime exited, replacing");
                state.slots.remove(&namespace);
            } else {
                slot.leases += 1;
                debug!(%namespace, leases = slot.leases, "connection reused");
                return Some(Lease {
                    manager: self.clone(),
                    namespace,
                    generation: slot.generation,
                    handle: slot.handle.clone(),
                });
            }
        }

        let identity = ClientIdentity::new(self.inner.user_id.clone(), credential);
        let env = self.inner.connector.env();
        let client = Client::new(env.clone(), identity, namespace, self.inner.config.connection.clone());
        let driver = self.inner.connector.driver(namespace);
        let (runtime, handle) = Runtime::new(driver, client, env, self.inner.config.clone());
        let task = tokio::spawn(runtime.run());

        let generation = state.next_generation;
        state.next_generation += 1;
        state.spawned += 1;
        state.slots.insert(namespace, Slot { handle: handle.clone(), task, leases: 1, generation });
        info!(%namespace, "connection created");

        Some(Lease { manager: self.clone(), namespace, generation, handle })
    }

    /// Forcibly close the connection for `namespace` and clear the handle.
    ///
    /// Outstanding leases stay valid but inert: sends report
    /// `NotConnected`. Their drops no longer affect any later connection.
    pub fn release(&self, namespace: Namespace) {
        let slot = self.lock().slots.remove(&namespace);
        if let Some(slot) = slot {
            info!(%namespace, leases = slot.leases, "connection released");
            slot.handle.close("released");
        }
    }

    /// Whether a connection for `namespace` is held and its runtime running.
    pub fn is_live(&self, namespace: Namespace) -> bool {
        self.lock().slots.get(&namespace).is_some_and(|slot| !slot.task.is_finished())
    }

    /// Number of leases held on the connection for `namespace`.
    pub fn lease_count(&self, namespace: Namespace) -> usize {
        self.lock().slots.get(&namespace).map_or(0, |slot| slot.leases)
    }

    /// Connections created over the lifetime of this manager.
    pub fn connections_created(&self) -> usize {
        self.lock().spawned
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn drop_lease(&self, namespace: Namespace, generation: u64) {
        let mut state = self.lock();
        let Some(slot) = state.slots.get_mut(&namespace) else {
            return;
        };
        if slot.generation != generation {
            return;
        }

        slot.leases = slot.leases.saturating_sub(1);
        debug!(%namespace, leases = slot.leases, "lease dropped");
        if slot.leases == 0
            && let Some(slot) = state.slots.remove(&namespace)
        {
            info!(%namespace, "last lease dropped, closing connection");
            slot.handle.close("last lease dropped");
        }
    }
}

/// One consumer's hold on a namespace connection.
///
/// Dropping the lease gives the hold back; the connection closes when the
/// last lease is dropped.
pub struct Lease<C: Connector> {
    manager: ConnectionManager<C>,
    namespace: Namespace,
    generation: u64,
    handle: RuntimeHandle,
}

impl<C: Connector> fmt::Debug for Lease<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("namespace", &self.namespace)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl<C: Connector> Lease<C> {
    /// Namespace of the held connection.
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Change the conversation the socket is joined to.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Stopped` if the connection was released
    pub async fn select_chat(&self, target: Option<ChatId>) -> Result<(), RuntimeError> {
        self.handle.select_chat(target).await
    }

    /// Send a text message.
    pub async fn send_message(&self, chat_id: ChatId, body: impl Into<String>) -> SendStatus {
        self.handle.send_message(chat_id, body).await
    }

    /// Acknowledge messages as read. Empty `message_ids` means everything.
    pub async fn mark_as_read(&self, chat_id: ChatId, message_ids: Vec<MessageId>) -> SendStatus {
        self.handle.mark_as_read(chat_id, message_ids).await
    }

    /// Register a conversation known from elsewhere.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Stopped` if the connection was released
    pub async fn register_chat(
        &self,
        chat_id: ChatId,
        counterparty: Option<UserId>,
    ) -> Result<(), RuntimeError> {
        self.handle.register_chat(chat_id, counterparty).await
    }

    /// Mark every notification read.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Stopped` if the connection was released
    pub async fn mark_notifications_read(&self) -> Result<(), RuntimeError> {
        self.handle.mark_notifications_read().await
    }

    /// Start a new handshake if the connection dropped.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Stopped` if the connection was released
    pub async fn reconnect(&self) -> Result<(), RuntimeError> {
        self.handle.reconnect().await
    }

    /// Latest chat list, presence, and connection state.
    pub fn snapshot(&self) -> ClientSnapshot {
        self.handle.snapshot()
    }

    /// Receiver that is marked changed whenever new state is published.
    pub fn snapshots(&self) -> watch::Receiver<ClientSnapshot> {
        self.handle.snapshots()
    }

    /// Register a listener. Drop it to unregister.
    pub fn subscribe(&self) -> Subscription {
        self.handle.subscribe()
    }

    /// Live listeners on this connection.
    pub fn listener_count(&self) -> usize {
        self.handle.listener_count()
    }

    /// Whether the connection runtime has exited.
    pub fn is_stopped(&self) -> bool {
        self.handle.is_stopped()
    }
}

impl<C: Connector> Drop for Lease<C> {
    fn drop(&mut self) {
        self.manager.drop_lease(self.namespace, self.generation);
    }
}
