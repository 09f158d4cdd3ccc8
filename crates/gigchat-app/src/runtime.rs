//! Event loop for one namespace connection.
//!
//! The Runtime owns the [`Client`] and the [`Driver`] and is the only place
//! state is mutated. It selects over:
//! - a shutdown signal, outside the bounded intent queue
//! - intents from handles (send, select, reconnect)
//! - frames from the socket
//! - a periodic tick for handshake timeouts
//!
//! Opening a socket keeps serving shutdown, intents and ticks: sends report
//! `NotConnected` and the handshake deadline abandons an open that never
//! finishes.
//!
//! Transport failures never end the loop: they become transitions to
//! disconnected. The loop ends when every handle is gone or on an explicit
//! close.

use std::{collections::VecDeque, future::Future, pin::Pin, time::Duration};

use gigchat_client::{
    ChatEvent, Client, ClientAction, ClientEvent, ClientSnapshot, DropReason, SendStatus,
};
use gigchat_core::{ConnectionConfig, ConnectionState, env::Environment};
use gigchat_proto::{ChatId, Handshake, MessageId, UserId};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, warn};

use crate::{Driver, RuntimeError, Subscription};

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Handshake settings.
    pub connection: ConnectionConfig,
    /// How often to check the handshake deadline.
    pub tick_interval: Duration,
    /// Queued intents before senders wait.
    pub intent_capacity: usize,
    /// Events buffered per subscriber before it lags.
    pub event_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            tick_interval: Duration::from_secs(1),
            intent_capacity: 32,
            event_capacity: 256,
        }
    }
}

/// Requests from handles to the runtime task.
#[derive(Debug)]
enum Intent {
    SelectChat(Option<ChatId>),
    SendMessage { chat_id: ChatId, body: String, reply: oneshot::Sender<SendStatus> },
    MarkAsRead { chat_id: ChatId, message_ids: Vec<MessageId>, reply: oneshot::Sender<SendStatus> },
    RegisterChat { chat_id: ChatId, counterparty: Option<UserId> },
    MarkNotificationsRead,
    Reconnect,
}

/// Cloneable handle to a running [`Runtime`].
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    intents: mpsc::Sender<Intent>,
    shutdown: mpsc::UnboundedSender<String>,
    events: broadcast::Sender<ChatEvent>,
    snapshot: watch::Receiver<ClientSnapshot>,
}

impl RuntimeHandle {
    /// Change the conversation the socket is joined to.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Stopped` if the runtime has exited
    pub async fn select_chat(&self, target: Option<ChatId>) -> Result<(), RuntimeError> {
        self.submit(Intent::SelectChat(target)).await
    }

    /// Send a text message. Resolves once the runtime has decided.
    ///
    /// A stopped runtime reports [`DropReason::NotConnected`].
    pub async fn send_message(&self, chat_id: ChatId, body: impl Into<String>) -> SendStatus {
        let (reply, rx) = oneshot::channel();
        self.ask(Intent::SendMessage { chat_id, body: body.into(), reply }, rx).await
    }

    /// Acknowledge messages as read. Empty `message_ids` means everything.
    pub async fn mark_as_read(&self, chat_id: ChatId, message_ids: Vec<MessageId>) -> SendStatus {
        let (reply, rx) = oneshot::channel();
        self.ask(Intent::MarkAsRead { chat_id, message_ids, reply }, rx).await
    }

    /// Register a conversation known from elsewhere.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Stopped` if the runtime has exited
    pub async fn register_chat(
        &self,
        chat_id: ChatId,
        counterparty: Option<UserId>,
    ) -> Result<(), RuntimeError> {
        self.submit(Intent::RegisterChat { chat_id, counterparty }).await
    }

    /// Mark every notification read.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Stopped` if the runtime has exited
    pub async fn mark_notifications_read(&self) -> Result<(), RuntimeError> {
        self.submit(Intent::MarkNotificationsRead).await
    }

    /// Start a new handshake if disconnected.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Stopped` if the runtime has exited
    pub async fn reconnect(&self) -> Result<(), RuntimeError> {
        self.submit(Intent::Reconnect).await
    }

    /// Close the socket and stop the runtime.
    ///
    /// Does not wait and never queues behind pending intents; safe to call
    /// from `Drop`.
    pub fn close(&self, reason: impl Into<String>) {
        if self.shutdown.send(reason.into()).is_err() {
            debug!("runtime already stopped");
        }
    }

    /// Latest published state.
    pub fn snapshot(&self) -> ClientSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver that is marked changed whenever new state is published.
    pub fn snapshots(&self) -> watch::Receiver<ClientSnapshot> {
        self.snapshot.clone()
    }

    /// Register a listener for chat events.
    pub fn subscribe(&self) -> Subscription {
        Subscription::new(self.events.subscribe())
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.events.receiver_count()
    }

    /// Whether the runtime has exited.
    pub fn is_stopped(&self) -> bool {
        self.intents.is_closed()
    }

    async fn submit(&self, intent: Intent) -> Result<(), RuntimeError> {
        self.intents.send(intent).await.map_err(|_| RuntimeError::Stopped)
    }

    async fn ask(&self, intent: Intent, rx: oneshot::Receiver<SendStatus>) -> SendStatus {
        if self.intents.send(intent).await.is_err() {
            return SendStatus::Dropped(DropReason::NotConnected);
        }
        rx.await.unwrap_or(SendStatus::Dropped(DropReason::NotConnected))
    }
}

type Tick = Pin<Box<dyn Future<Output = ()> + Send>>;

fn tick_after<E: Environment>(env: &E, interval: Duration) -> Tick {
    let env = env.clone();
    Box::pin(async move { env.sleep(interval).await })
}

/// Status owed to a waiting handle.
struct Reply {
    tx: oneshot::Sender<SendStatus>,
    status: SendStatus,
}

impl Reply {
    fn send(self) {
        // The caller may have given up waiting.
        let _ = self.tx.send(self.status);
    }
}

/// Result of applying an intent to the client.
enum Applied {
    Actions {
        actions: Vec<ClientAction>,
        reply: Option<Reply>,
        /// Local state changed even if no action was produced.
        changed: bool,
    },
    Reconnect,
}

impl Applied {
    fn answer(status: SendStatus, tx: oneshot::Sender<SendStatus>) -> Self {
        let actions = status.command().cloned().map(ClientAction::Send).into_iter().collect();
        Self::Actions { actions, reply: Some(Reply { tx, status }), changed: false }
    }
}

/// Client plus its outputs: everything but the socket.
struct Session<E: Environment> {
    client: Client<E>,
    events: broadcast::Sender<ChatEvent>,
    snapshot: watch::Sender<ClientSnapshot>,
}

impl<E: Environment> Session<E> {
    fn handle(&mut self, event: ClientEvent<E::Instant>) -> Vec<ClientAction> {
        match self.client.handle(event) {
            Ok(actions) => actions,
            Err(e) => {
                warn!(namespace = %self.client.namespace(), "{e}");
                vec![]
            },
        }
    }

    fn apply(&mut self, intent: Intent) -> Applied {
        match intent {
            Intent::SelectChat(target) => Applied::Actions {
                actions: self.client.select_chat(target),
                reply: None,
                changed: true,
            },
            Intent::SendMessage { chat_id, body, reply } => {
                Applied::answer(self.client.send_message(chat_id, body), reply)
            },
            Intent::MarkAsRead { chat_id, message_ids, reply } => {
                Applied::answer(self.client.mark_as_read(chat_id, message_ids), reply)
            },
            Intent::RegisterChat { chat_id, counterparty } => {
                self.client.register_chat(chat_id, counterparty);
                Applied::Actions { actions: vec![], reply: None, changed: true }
            },
            Intent::MarkNotificationsRead => {
                self.client.mark_notifications_read();
                Applied::Actions { actions: vec![], reply: None, changed: true }
            },
            Intent::Reconnect => Applied::Reconnect,
        }
    }

    /// Deliver notifications now; return the actions that need the socket.
    fn deliver(&self, actions: Vec<ClientAction>) -> Vec<ClientAction> {
        actions
            .into_iter()
            .filter_map(|action| match action {
                ClientAction::Notify(event) => {
                    self.notify(event);
                    None
                },
                other => Some(other),
            })
            .collect()
    }

    fn notify(&self, event: ChatEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn publish(&self) {
        self.snapshot.send_replace(self.client.snapshot());
    }
}

/// Event loop for one namespace connection.
///
/// # Type Parameters
///
/// - `D`: Socket driver
/// - `E`: Environment for timing
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    session: Session<E>,
    env: E,
    config: RuntimeConfig,
    intents: mpsc::Receiver<Intent>,
    shutdown: mpsc::UnboundedReceiver<String>,
    tick: Tick,
    /// Whether the driver has a socket to read from.
    open: bool,
    /// Set once the loop must end, with the close reason.
    stop: Option<String>,
}

impl<D, E> Runtime<D, E>
where
    D: Driver<Instant = E::Instant>,
    E: Environment,
{
    /// Create a runtime and the handle used to talk to it.
    pub fn new(driver: D, client: Client<E>, env: E, config: RuntimeConfig) -> (Self, RuntimeHandle) {
        let (intents_tx, intents_rx) = mpsc::channel(config.intent_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = mpsc::unbounded_channel();
        let (events_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let (snapshot_tx, snapshot_rx) = watch::channel(client.snapshot());

        let handle = RuntimeHandle {
            intents: intents_tx,
            shutdown: shutdown_tx,
            events: events_tx.clone(),
            snapshot: snapshot_rx,
        };
        let tick = tick_after(&env, config.tick_interval);
        let runtime = Self {
            driver,
            session: Session { client, events: events_tx, snapshot: snapshot_tx },
            env,
            config,
            intents: intents_rx,
            shutdown: shutdown_rx,
            tick,
            open: false,
            stop: None,
        };
        (runtime, handle)
    }

    /// Run until every handle is dropped or a close is requested.
    pub async fn run(mut self) {
        match self.session.client.connect() {
            Ok(actions) => self.execute(actions).await,
            Err(e) => warn!("connect refused: {e}"),
        }

        while self.stop.is_none() {
            tokio::select! {
                biased;
                reason = self.shutdown.recv() => {
                    self.stop = Some(reason.unwrap_or_else(|| "released".to_string()));
                },
                intent = self.intents.recv() => {
                    let Some(intent) = intent else {
                        debug!("all handles dropped");
                        self.stop = Some("released".to_string());
                        continue;
                    };
                    self.handle_intent(intent).await;
                },
                frame = self.driver.recv(), if self.open => {
                    let event = match frame {
                        Some(text) => ClientEvent::FrameReceived(text),
                        None => {
                            self.open = false;
                            ClientEvent::TransportClosed { reason: "socket closed".to_string() }
                        },
                    };
                    self.dispatch(event).await;
                },
                () = &mut self.tick => {
                    self.tick = tick_after(&self.env, self.config.tick_interval);
                    let now = self.env.now();
                    self.dispatch(ClientEvent::Tick { now }).await;
                },
            }
        }

        let reason = self.stop.take().unwrap_or_default();
        self.shutdown(&reason).await;
    }

    async fn handle_intent(&mut self, intent: Intent) {
        match self.session.apply(intent) {
            Applied::Actions { actions, reply, changed } => {
                let publish = changed && actions.is_empty();
                self.execute(actions).await;
                if publish {
                    self.session.publish();
                }
                if let Some(reply) = reply {
                    reply.send();
                }
            },
            Applied::Reconnect => {
                if self.session.client.state().is_connected() || self.open {
                    debug!("reconnect ignored, socket already in use");
                    return;
                }
                match self.session.client.connect() {
                    Ok(actions) => self.execute(actions).await,
                    Err(e) => warn!("reconnect refused: {e}"),
                }
            },
        }
    }

    async fn dispatch(&mut self, event: ClientEvent<E::Instant>) {
        let actions = self.session.handle(event);
        self.execute(actions).await;
    }

    /// Execute client actions, feeding transport failures back in.
    ///
    /// Publishes the snapshot once if anything was executed.
    async fn execute(&mut self, actions: Vec<ClientAction>) {
        if actions.is_empty() {
            return;
        }
        let mut pending: VecDeque<ClientAction> = actions.into();

        while let Some(action) = pending.pop_front() {
            match action {
                ClientAction::Open(handshake) => match self.open_socket(handshake, &mut pending).await {
                    Some(Ok(())) => self.open = true,
                    Some(Err(e)) => {
                        warn!(namespace = %self.session.client.namespace(), "open failed: {e}");
                        self.open = false;
                        pending.extend(self.transport_closed(e.to_string()));
                    },
                    None => {
                        self.open = false;
                        if self.stop.is_some() {
                            break;
                        }
                    },
                },
                ClientAction::Send(command) => {
                    let name = command.name();
                    if let Err(e) = self.driver.send(command).await {
                        warn!(command = name, "send failed: {e}");
                        self.open = false;
                        self.driver.close().await;
                        pending.extend(self.transport_closed(e.to_string()));
                    }
                },
                ClientAction::Close { reason } => {
                    debug!(%reason, "closing socket");
                    self.driver.close().await;
                    self.open = false;
                },
                ClientAction::Notify(event) => self.session.notify(event),
            }
        }

        self.session.publish();
    }

    /// Drive `Driver::open` while still serving shutdown, intents and ticks.
    ///
    /// Returns `None` when the open was abandoned: on shutdown (`stop` is
    /// set) or when the handshake deadline passed (the client's close
    /// actions are queued on `pending`).
    async fn open_socket(
        &mut self,
        handshake: Handshake,
        pending: &mut VecDeque<ClientAction>,
    ) -> Option<Result<(), D::Error>> {
        // Observers see `Connecting` before the socket work starts.
        let queued: Vec<ClientAction> = pending.drain(..).collect();
        pending.extend(self.session.deliver(queued));
        self.session.publish();

        let open = self.driver.open(handshake);
        tokio::pin!(open);

        loop {
            tokio::select! {
                biased;
                reason = self.shutdown.recv() => {
                    debug!("shutdown while opening");
                    self.stop = Some(reason.unwrap_or_else(|| "released".to_string()));
                    return None;
                },
                result = &mut open => return Some(result),
                intent = self.intents.recv() => {
                    let Some(intent) = intent else {
                        self.stop = Some("released".to_string());
                        return None;
                    };
                    match self.session.apply(intent) {
                        Applied::Actions { actions, reply, changed } => {
                            let touched = changed || !actions.is_empty();
                            pending.extend(self.session.deliver(actions));
                            if touched {
                                self.session.publish();
                            }
                            if let Some(reply) = reply {
                                reply.send();
                            }
                        },
                        Applied::Reconnect => debug!("reconnect ignored, handshake in progress"),
                    }
                },
                () = &mut self.tick => {
                    self.tick = tick_after(&self.env, self.config.tick_interval);
                    let now = self.env.now();
                    let actions = self.session.handle(ClientEvent::Tick { now });
                    if *self.session.client.state() != ConnectionState::Connecting {
                        warn!(namespace = %self.session.client.namespace(), "open abandoned");
                        pending.extend(actions);
                        return None;
                    }
                    pending.extend(self.session.deliver(actions));
                },
            }
        }
    }

    fn transport_closed(&mut self, reason: String) -> Vec<ClientAction> {
        self.session.handle(ClientEvent::TransportClosed { reason })
    }

    async fn shutdown(&mut self, reason: &str) {
        let actions = self.session.client.close(reason);
        self.execute(actions).await;
        self.driver.close().await;
        self.open = false;
    }
}
