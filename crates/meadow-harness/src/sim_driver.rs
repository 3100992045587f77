//! Simulation driver connecting a client to an in-memory authority.
//!
//! `SimDriver` plays the role the async runtime plays in production: it
//! executes the client's actions against a simulated network and feeds the
//! results back as events. Everything happens synchronously on the caller's
//! thread, in a deterministic order, on virtual time.
//!
//! The network is a queue. Actions produce events (an open succeeds or
//! fails, a frame reaches the authority and its replies come back), and
//! [`SimDriver::run`] drains the queue until the system is quiet. After every
//! event the registered invariants are checked and violations collected.

use std::{collections::VecDeque, time::Duration};

use meadow_client::{Client, ClientAction, ClientConfig, ClientError, ClientEvent};
use meadow_core::TransportId;

use crate::{
    invariants::{InvariantRegistry, Observation, Violation},
    operation::Operation,
    sim_authority::ScriptedAuthority,
    sim_env::SimEnv,
};

/// Safety valve for [`SimDriver::run`]; a quiet system needs far fewer.
const MAX_EVENTS_PER_RUN: usize = 10_000;

/// Deterministic driver for a [`Client`] talking to a [`ScriptedAuthority`].
pub struct SimDriver {
    env: SimEnv,
    client: Client<SimEnv>,
    authority: ScriptedAuthority,
    network_up: bool,
    live: Vec<TransportId>,
    inbox: VecDeque<ClientEvent>,
    delivered: Vec<String>,
    actions: Vec<ClientAction>,
    revisions: Vec<u64>,
    resets: Vec<usize>,
    reset_seen: bool,
    invariants: Option<InvariantRegistry>,
    violations: Vec<Violation>,
}

impl SimDriver {
    /// Driver with default client configuration and seed 0.
    pub fn new(authority: ScriptedAuthority) -> Self {
        Self::with_config(authority, ClientConfig::default(), 0)
    }

    /// Driver with explicit client configuration and RNG seed.
    pub fn with_config(authority: ScriptedAuthority, config: ClientConfig, seed: u64) -> Self {
        let env = SimEnv::with_seed(seed);
        Self {
            client: Client::new(env.clone(), config),
            env,
            authority,
            network_up: true,
            live: Vec::new(),
            inbox: VecDeque::new(),
            delivered: Vec::new(),
            actions: Vec::new(),
            revisions: Vec::new(),
            resets: Vec::new(),
            reset_seen: false,
            invariants: None,
            violations: Vec::new(),
        }
    }

    /// Enable invariant checking.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    /// Start the client and run until quiet.
    pub fn start(&mut self) {
        // Lifecycle events are never rejected.
        let _ = self.submit(ClientEvent::Start);
    }

    /// Submit an event and run until quiet.
    ///
    /// # Errors
    ///
    /// The client's error if it rejected the event. Nothing was transmitted
    /// in that case.
    pub fn submit(&mut self, event: ClientEvent) -> Result<(), ClientError> {
        let result = self.step(event);
        self.run();
        result
    }

    /// Advance virtual time, deliver the client's tick and run until quiet.
    pub fn advance(&mut self, by: Duration) {
        self.env.advance(by);
        let _ = self.submit(ClientEvent::Tick);
    }

    /// The authority advances one day and pushes the update to the live
    /// connection.
    pub fn advance_day(&mut self) {
        match self.authority.advance_day() {
            Ok(frame) => self.push_frame(frame),
            Err(e) => tracing::warn!(error = %e, "authority failed to encode update"),
        }
    }

    /// The authority pushes `text` to the live connection, if any.
    pub fn push_frame(&mut self, text: impl Into<String>) {
        let text = text.into();
        for &id in &self.live {
            self.inbox.push_back(ClientEvent::TransportMessage { id, text: text.clone() });
        }
        self.run();
    }

    /// Break every live connection.
    pub fn drop_connection(&mut self, reason: &str) {
        for id in std::mem::take(&mut self.live) {
            tracing::debug!(transport_id = %id, reason, "dropping connection");
            self.inbox.push_back(ClientEvent::TransportError { id, detail: reason.to_string() });
            self.inbox.push_back(ClientEvent::TransportClosed { id, reason: reason.to_string() });
        }
        self.run();
    }

    /// Make connection attempts succeed or fail. Taking the network down
    /// also breaks the live connection.
    pub fn set_network(&mut self, up: bool) {
        self.network_up = up;
        if !up {
            self.drop_connection("network unreachable");
        }
    }

    /// Apply one model operation. Rejected intents are expected and ignored.
    pub fn apply(&mut self, op: &Operation) {
        if let Some(event) = op.client_event() {
            if let Err(e) = self.submit(event) {
                tracing::trace!(?op, error = %e, "operation rejected");
            }
            return;
        }

        match *op {
            Operation::AdvanceDay => self.advance_day(),
            Operation::AdvanceTime { millis } => self.advance(Duration::from_millis(millis.into())),
            Operation::InjectGarbage => self.push_frame("{\"type\": \"state_update\", \"state\""),
            Operation::DropConnection => self.drop_connection("connection reset"),
            Operation::NetworkDown => self.set_network(false),
            Operation::NetworkUp => self.set_network(true),
            _ => {},
        }
    }

    /// Process queued events until none remain.
    pub fn run(&mut self) {
        let mut processed = 0;
        while let Some(event) = self.inbox.pop_front() {
            if let Err(e) = self.step(event) {
                tracing::warn!(error = %e, "transport event rejected");
            }

            processed += 1;
            if processed >= MAX_EVENTS_PER_RUN {
                tracing::warn!(pending = self.inbox.len(), "event budget exhausted");
                break;
            }
        }
    }

    /// Current observable state.
    pub fn observe(&self) -> Observation {
        let session = self.client.session();
        Observation {
            status: session.status(),
            attempt: session.attempt(),
            transport: session.transport(),
            live_transports: self.live.clone(),
            revisions: self.revisions.clone(),
            resets: self.resets.clone(),
            snapshot: self.client.read().clone(),
        }
    }

    /// The client under test.
    pub fn client(&self) -> &Client<SimEnv> {
        &self.client
    }

    /// The client under test, mutably. Events handled this way bypass the
    /// simulated network.
    pub fn client_mut(&mut self) -> &mut Client<SimEnv> {
        &mut self.client
    }

    /// The authority.
    pub fn authority(&self) -> &ScriptedAuthority {
        &self.authority
    }

    /// The authority, mutably.
    pub fn authority_mut(&mut self) -> &mut ScriptedAuthority {
        &mut self.authority
    }

    /// The shared environment.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Frames that reached the authority, in order.
    pub fn delivered(&self) -> &[String] {
        &self.delivered
    }

    /// Every action the client produced, in order.
    pub fn actions(&self) -> &[ClientAction] {
        &self.actions
    }

    /// Transports the network currently holds open.
    pub fn live_transports(&self) -> &[TransportId] {
        &self.live
    }

    /// Invariant violations seen so far.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    fn step(&mut self, event: ClientEvent) -> Result<(), ClientError> {
        let result = self.client.handle(event).map(|actions| self.dispatch(actions));
        self.record();
        result
    }

    fn dispatch(&mut self, actions: Vec<ClientAction>) {
        for action in actions {
            match &action {
                ClientAction::OpenTransport { id, endpoint } => self.open(*id, endpoint),
                ClientAction::Send { id, text } => self.deliver(*id, text),
                ClientAction::CloseTransport { id, reason } => {
                    self.live.retain(|live| live != id);
                    let closed = ClientEvent::TransportClosed { id: *id, reason: reason.clone() };
                    self.inbox.push_back(closed);
                },
                ClientAction::StateChanged { revision: 0 } => self.reset_seen = true,
                ClientAction::StateChanged { .. }
                | ClientAction::StatusChanged(_)
                | ClientAction::Notice(_)
                | ClientAction::Fault(_) => {},
            }
            self.actions.push(action);
        }
    }

    fn open(&mut self, id: TransportId, endpoint: &str) {
        if !self.network_up {
            tracing::debug!(transport_id = %id, endpoint, "connection refused");
            self.inbox.push_back(ClientEvent::TransportError {
                id,
                detail: "connection refused".to_string(),
            });
            self.inbox.push_back(ClientEvent::TransportClosed { id, reason: String::new() });
            return;
        }

        self.live.push(id);
        self.inbox.push_back(ClientEvent::TransportOpened { id });
        match self.authority.on_connect() {
            Ok(frames) => {
                for text in frames {
                    self.inbox.push_back(ClientEvent::TransportMessage { id, text });
                }
            },
            Err(e) => tracing::warn!(error = %e, "authority failed to encode greeting"),
        }
    }

    fn deliver(&mut self, id: TransportId, text: &str) {
        if !self.live.contains(&id) {
            tracing::warn!(transport_id = %id, "frame sent on a dead transport");
            return;
        }

        self.delivered.push(text.to_string());
        match self.authority.handle(text) {
            Ok(replies) => {
                for text in replies {
                    self.inbox.push_back(ClientEvent::TransportMessage { id, text });
                }
            },
            Err(e) => tracing::warn!(error = %e, "authority failed to encode reply"),
        }
    }

    fn record(&mut self) {
        if std::mem::take(&mut self.reset_seen) {
            self.resets.push(self.revisions.len());
        }
        self.revisions.push(self.client.revision());

        let Some(registry) = &self.invariants else {
            return;
        };
        if let Err(violations) = registry.check_all(&self.observe()) {
            for violation in &violations {
                tracing::error!(%violation, "invariant violated");
            }
            self.violations.extend(violations);
        }
    }
}
