//! Async runtime
//!
//! Event loop that owns the transports and drives the Sans-IO [`Client`].
//! Uses `tokio::select!` to handle transport signals, caller requests and the
//! reconnect deadline concurrently.
//!
//! Callers talk to the loop through a cloneable [`ClientHandle`]. Snapshots
//! and status are published on watch channels so any number of views can
//! follow them without touching the client.

use std::{collections::HashMap, time::Duration};

use meadow_core::{Environment, TransportId};
use meadow_proto::Snapshot;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

use crate::{
    Client, ClientConfig, ClientError,
    event::{ClientAction, ClientEvent},
    status::{ConnectionStatus, StatusReport},
    system_env::SystemEnv,
    transport::{self, TransportHandle, TransportSignal},
};

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The runtime loop has exited.
    #[error("runtime stopped")]
    Stopped,

    /// The client rejected the request.
    #[error(transparent)]
    Client(#[from] ClientError),
}

struct Request {
    event: ClientEvent,
    reply: oneshot::Sender<Result<(), ClientError>>,
}

/// Async runtime for the client.
pub struct Runtime {
    client: Client<SystemEnv>,
    transports: HashMap<TransportId, TransportHandle>,
    signals_tx: transport::SignalSender,
    signals_rx: mpsc::UnboundedReceiver<(TransportId, TransportSignal)>,
    requests: mpsc::Receiver<Request>,
    snapshot_tx: watch::Sender<Snapshot>,
    status_tx: watch::Sender<StatusReport>,
    stopping: bool,
}

impl Runtime {
    /// Create a runtime and the handle that controls it.
    ///
    /// Nothing connects until [`Runtime::run`] is polled.
    pub fn new(config: ClientConfig) -> (Self, ClientHandle) {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let (requests_tx, requests) = mpsc::channel(32);
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::default());
        let (status_tx, status_rx) = watch::channel(StatusReport::default());

        let runtime = Self {
            client: Client::new(SystemEnv::new(), config),
            transports: HashMap::new(),
            signals_tx,
            signals_rx,
            requests,
            snapshot_tx,
            status_tx,
            stopping: false,
        };
        let handle =
            ClientHandle { requests: requests_tx, snapshot: snapshot_rx, status: status_rx };

        (runtime, handle)
    }

    /// Run the event loop.
    ///
    /// Returns once a shutdown has completed, or when every
    /// [`ClientHandle`] has been dropped.
    pub async fn run(mut self) {
        tracing::info!(endpoint = self.client.session().endpoint(), "runtime started");
        let actions = self.client.start();
        self.dispatch(actions);

        loop {
            let now = self.client.env().now();
            let delay = self.client.next_deadline().map(|at| at.saturating_duration_since(now));

            tokio::select! {
                Some((id, signal)) = self.signals_rx.recv() => {
                    let event = match signal {
                        TransportSignal::Opened => ClientEvent::TransportOpened { id },
                        TransportSignal::Message(text) => {
                            ClientEvent::TransportMessage { id, text }
                        },
                        TransportSignal::Error(detail) => {
                            ClientEvent::TransportError { id, detail }
                        },
                        TransportSignal::Closed { reason } => {
                            self.transports.remove(&id);
                            ClientEvent::TransportClosed { id, reason }
                        },
                    };
                    // Transport events never fail; intents are the only fallible input.
                    let actions = self.client.handle(event).unwrap_or_default();
                    self.dispatch(actions);
                }

                request = self.requests.recv() => {
                    let Some(Request { event, reply }) = request else {
                        tracing::debug!("all handles dropped");
                        break;
                    };

                    if matches!(event, ClientEvent::Shutdown) {
                        self.stopping = true;
                    }
                    let result = self.client.handle(event).map(|actions| self.dispatch(actions));
                    if let Err(err) = &result {
                        self.publish_status();
                        tracing::debug!(error = %err, "request rejected");
                    }
                    let _ = reply.send(result);
                }

                () = wait_for(self.client.env(), delay) => {
                    let actions = self.client.handle(ClientEvent::Tick).unwrap_or_default();
                    self.dispatch(actions);
                }
            }

            if self.stopping && self.is_settled() {
                break;
            }
        }

        for (_, handle) in self.transports.drain() {
            handle.stop();
        }
        tracing::info!("runtime stopped");
    }

    fn is_settled(&self) -> bool {
        matches!(
            self.client.connection_status(),
            ConnectionStatus::Disconnected | ConnectionStatus::Idle
        )
    }

    fn dispatch(&mut self, actions: Vec<ClientAction>) {
        for action in actions {
            match action {
                ClientAction::OpenTransport { id, endpoint } => {
                    let handle = transport::spawn(id, endpoint, self.signals_tx.clone());
                    self.transports.insert(id, handle);
                },
                ClientAction::Send { id, text } => match self.transports.get(&id) {
                    Some(handle) => {
                        if let Err(e) = handle.send(text) {
                            tracing::warn!(error = %e, "dropping outbound frame");
                        }
                    },
                    None => tracing::warn!(transport_id = %id, "no transport for outbound frame"),
                },
                ClientAction::CloseTransport { id, reason } => {
                    if let Some(handle) = self.transports.remove(&id) {
                        handle.stop();
                    }
                    // Aborted tasks cannot report their own close.
                    let _ = self.signals_tx.send((id, TransportSignal::Closed { reason }));
                },
                ClientAction::StateChanged { revision } => {
                    tracing::trace!(revision, "publishing snapshot");
                    self.snapshot_tx.send_replace(self.client.read().clone());
                },
                ClientAction::StatusChanged(_)
                | ClientAction::Notice(_)
                | ClientAction::Fault(_) => {},
            }
        }

        self.publish_status();
    }

    fn publish_status(&self) {
        let report = self.client.report();
        self.status_tx.send_if_modified(|current| {
            if *current == report {
                false
            } else {
                *current = report;
                true
            }
        });
    }
}

async fn wait_for<E: Environment>(env: &E, delay: Option<Duration>) {
    match delay {
        Some(delay) => env.sleep(delay).await,
        None => std::future::pending().await,
    }
}

/// Cloneable handle to a running [`Runtime`].
#[derive(Clone)]
pub struct ClientHandle {
    requests: mpsc::Sender<Request>,
    snapshot: watch::Receiver<Snapshot>,
    status: watch::Receiver<StatusReport>,
}

impl ClientHandle {
    /// Submit an event and wait for the client to process it.
    ///
    /// # Errors
    ///
    /// - `RuntimeError::Client` if the client rejected the intent
    /// - `RuntimeError::Stopped` if the runtime has exited
    pub async fn send(&self, event: ClientEvent) -> Result<(), RuntimeError> {
        let (reply, response) = oneshot::channel();
        self.requests.send(Request { event, reply }).await.map_err(|_| RuntimeError::Stopped)?;
        response.await.map_err(|_| RuntimeError::Stopped)?.map_err(RuntimeError::from)
    }

    /// Purchase feed.
    pub async fn buy_feed(&self, amount: u32) -> Result<(), RuntimeError> {
        self.send(ClientEvent::BuyFeed { amount }).await
    }

    /// Sell a held resource.
    pub async fn sell(&self, item: &str, quantity: u32) -> Result<(), RuntimeError> {
        self.send(ClientEvent::Sell { item: item.to_string(), quantity }).await
    }

    /// Breed two animals.
    pub async fn breed(&self, first: &str, second: &str) -> Result<(), RuntimeError> {
        self.send(ClientEvent::Breed { first: first.to_string(), second: second.to_string() })
            .await
    }

    /// Purchase an animal.
    pub async fn buy_animal(&self, kind: &str, name: &str) -> Result<(), RuntimeError> {
        self.send(ClientEvent::BuyAnimal { kind: kind.to_string(), name: name.to_string() })
            .await
    }

    /// Feed every animal.
    pub async fn feed_animals(&self) -> Result<(), RuntimeError> {
        self.send(ClientEvent::FeedAnimals).await
    }

    /// Ask the authority for a fresh snapshot.
    pub async fn refresh(&self) -> Result<(), RuntimeError> {
        self.send(ClientEvent::RefreshState).await
    }

    /// Force a new connection now.
    pub async fn reconnect(&self) -> Result<(), RuntimeError> {
        self.send(ClientEvent::Reconnect).await
    }

    /// Tear down without reconnecting. The runtime exits once closed.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.send(ClientEvent::Shutdown).await
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// Latest published status.
    pub fn report(&self) -> StatusReport {
        self.status.borrow().clone()
    }

    /// Follow snapshot changes.
    pub fn watch_snapshot(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.clone()
    }

    /// Follow status changes.
    pub fn watch_status(&self) -> watch::Receiver<StatusReport> {
        self.status.clone()
    }
}
