//! Top-level client state machine.
//!
//! Wires the [`Session`], [`StateStore`] and [`CommandEncoder`] together
//! behind a single event-in, actions-out interface. Still Sans-IO: the caller
//! owns the transports and feeds their activity back as [`ClientEvent`]s.

use meadow_core::{
    CommandEncoder, EncoderConfig, Environment, Fault, Session, SessionAction, SessionConfig,
    StateStore, SubscriptionId, ValidatedCommand, ValidationError,
};
use meadow_proto::Snapshot;

use crate::{
    error::ClientError,
    event::{ClientAction, ClientEvent},
    status::{ConnectionStatus, StatusReport},
};

/// Client configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientConfig {
    /// Endpoint and reconnection policy
    pub session: SessionConfig,
    /// Local validation limits and catalog
    pub encoder: EncoderConfig,
}

/// Meadow client.
///
/// Keeps the live mirror of the remote farm and turns user intents into
/// commands. Generic over [`Environment`] so the same logic runs on system
/// time or a simulated clock.
pub struct Client<E: Environment> {
    env: E,
    session: Session<E::Instant>,
    store: StateStore,
    encoder: CommandEncoder,
    last_error: Option<Fault>,
    last_notice: Option<String>,
}

impl<E: Environment> Client<E> {
    /// Create an idle client.
    pub fn new(env: E, config: ClientConfig) -> Self {
        let seed = env.random_u64();
        Self {
            session: Session::new(config.session, seed),
            store: StateStore::new(),
            encoder: CommandEncoder::new(config.encoder),
            env,
            last_error: None,
            last_notice: None,
        }
    }

    /// Process one event.
    ///
    /// Lifecycle misuse from the driver (a second start, a transport event
    /// that does not fit the current status) is logged and ignored.
    ///
    /// # Errors
    ///
    /// - `ClientError::Validation` if an intent fails local validation
    /// - `ClientError::Session` if an intent arrives while not connected
    ///
    /// The error is also recorded as [`Client::last_error`]. Nothing is
    /// transmitted in either case.
    pub fn handle(&mut self, event: ClientEvent) -> Result<Vec<ClientAction>, ClientError> {
        let before = self.connection_status();
        let before_since = self.session.status_since();
        let now = self.env.now();

        let session_actions = match event {
            ClientEvent::Start => self.session.start(now).unwrap_or_else(|err| {
                tracing::warn!(error = %err, "ignoring start");
                Vec::new()
            }),
            ClientEvent::TransportOpened { id } => {
                self.session.on_transport_open(id, now).unwrap_or_else(|err| {
                    tracing::warn!(transport_id = %id, error = %err, "ignoring transport open");
                    Vec::new()
                })
            },
            ClientEvent::TransportMessage { id, text } => {
                self.session.on_transport_message(id, &text).unwrap_or_else(|err| {
                    tracing::warn!(transport_id = %id, error = %err, "ignoring transport message");
                    Vec::new()
                })
            },
            ClientEvent::TransportClosed { id, reason } => {
                self.session.on_transport_close(id, &reason, now)
            },
            ClientEvent::TransportError { id, detail } => {
                self.session.on_transport_error(id, &detail)
            },
            ClientEvent::Tick => self.session.tick(now),
            ClientEvent::BuyFeed { amount } => {
                let validated = self.encoder.buy_feed(amount);
                self.submit(validated)?
            },
            ClientEvent::Sell { item, quantity } => {
                let validated = self.encoder.sell(self.store.read(), &item, quantity);
                self.submit(validated)?
            },
            ClientEvent::Breed { first, second } => {
                let validated = self.encoder.breed(self.store.read(), &first, &second);
                self.submit(validated)?
            },
            ClientEvent::BuyAnimal { kind, name } => {
                let validated = self.encoder.buy_animal(self.store.read(), &kind, &name);
                self.submit(validated)?
            },
            ClientEvent::FeedAnimals => {
                let validated = Ok(self.encoder.feed_animals());
                self.submit(validated)?
            },
            ClientEvent::RefreshState => {
                self.session.request_state().map_err(|err| self.reject(err.into()))?
            },
            ClientEvent::Reconnect => self.session.reconnect(now),
            ClientEvent::DismissError => {
                self.dismiss_error();
                Vec::new()
            },
            ClientEvent::Shutdown => self.session.shutdown(now),
            ClientEvent::Reset => self.session.reset(),
        };

        let mut actions = self.execute(session_actions);

        let after = self.connection_status();
        if after != before {
            let held_ms = before_since.map(|since| (now - since).as_millis() as u64);
            tracing::info!(status = %after, previous = %before, ?held_ms, "connection status");
            actions.push(ClientAction::StatusChanged(after));
        }

        Ok(actions)
    }

    /// Begin connecting.
    pub fn start(&mut self) -> Vec<ClientAction> {
        self.handle(ClientEvent::Start).unwrap_or_default()
    }

    /// Purchase feed.
    pub fn buy_feed(&mut self, amount: u32) -> Result<Vec<ClientAction>, ClientError> {
        self.handle(ClientEvent::BuyFeed { amount })
    }

    /// Sell a held resource.
    pub fn sell(&mut self, item: &str, quantity: u32) -> Result<Vec<ClientAction>, ClientError> {
        self.handle(ClientEvent::Sell { item: item.to_string(), quantity })
    }

    /// Breed two animals.
    pub fn breed(&mut self, first: &str, second: &str) -> Result<Vec<ClientAction>, ClientError> {
        self.handle(ClientEvent::Breed { first: first.to_string(), second: second.to_string() })
    }

    /// Purchase an animal.
    pub fn buy_animal(&mut self, kind: &str, name: &str) -> Result<Vec<ClientAction>, ClientError> {
        self.handle(ClientEvent::BuyAnimal { kind: kind.to_string(), name: name.to_string() })
    }

    /// Feed every animal.
    pub fn feed_animals(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        self.handle(ClientEvent::FeedAnimals)
    }

    /// Force a new connection now.
    pub fn reconnect(&mut self) -> Vec<ClientAction> {
        self.handle(ClientEvent::Reconnect).unwrap_or_default()
    }

    /// Tear down without reconnecting.
    pub fn shutdown(&mut self) -> Vec<ClientAction> {
        self.handle(ClientEvent::Shutdown).unwrap_or_default()
    }

    /// Current snapshot, or the empty default before the first one arrives.
    pub fn read(&self) -> &Snapshot {
        self.store.read()
    }

    /// Accepted snapshots since construction or the last reset.
    pub fn revision(&self) -> u64 {
        self.store.revision()
    }

    /// Register a snapshot observer.
    pub fn subscribe<F>(&mut self, observer: F) -> SubscriptionId
    where
        F: FnMut(&Snapshot) + Send + 'static,
    {
        self.store.subscribe(observer)
    }

    /// Remove a snapshot observer.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    /// Connection status for display.
    pub fn connection_status(&self) -> ConnectionStatus {
        ConnectionStatus::from_session(
            self.session.status(),
            self.session.attempt(),
            self.session.next_deadline().is_some(),
        )
    }

    /// Connection status, last error and last notice together.
    pub fn report(&self) -> StatusReport {
        StatusReport {
            connection: self.connection_status(),
            last_error: self.last_error.clone(),
            last_notice: self.last_notice.clone(),
            attempt_limit: self.session.policy().max_attempts(),
        }
    }

    /// Most recent fault, until superseded or dismissed.
    pub fn last_error(&self) -> Option<&Fault> {
        self.last_error.as_ref()
    }

    /// Most recent success message from the authority.
    pub fn last_notice(&self) -> Option<&str> {
        self.last_notice.as_deref()
    }

    /// Clear the displayed error.
    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    /// When the caller must next send [`ClientEvent::Tick`].
    pub fn next_deadline(&self) -> Option<E::Instant> {
        self.session.next_deadline()
    }

    /// Underlying session, for inspection.
    pub fn session(&self) -> &Session<E::Instant> {
        &self.session
    }

    /// Environment this client runs in.
    pub fn env(&self) -> &E {
        &self.env
    }

    fn submit(
        &mut self,
        validated: Result<ValidatedCommand, ValidationError>,
    ) -> Result<Vec<SessionAction>, ClientError> {
        let command = validated.map_err(|err| self.reject(err.into()))?;
        let kind = command.kind();
        let actions = self.session.send(command).map_err(|err| self.reject(err.into()))?;
        tracing::debug!(kind, "command sent");
        Ok(actions)
    }

    fn reject(&mut self, err: ClientError) -> ClientError {
        tracing::debug!(error = %err, "intent rejected");
        self.last_error = Some(err.clone().into());
        err
    }

    fn execute(&mut self, session_actions: Vec<SessionAction>) -> Vec<ClientAction> {
        let mut actions = Vec::with_capacity(session_actions.len());

        for action in session_actions {
            match action {
                SessionAction::OpenTransport { id, endpoint } => {
                    actions.push(ClientAction::OpenTransport { id, endpoint });
                },
                SessionAction::SendText(text) => {
                    if let Some(id) = self.session.transport() {
                        actions.push(ClientAction::Send { id, text });
                    }
                },
                SessionAction::CloseTransport { id, reason } => {
                    actions.push(ClientAction::CloseTransport { id, reason });
                },
                SessionAction::ApplySnapshot(snapshot) => match self.store.apply(snapshot) {
                    Ok(()) => {
                        let revision = self.store.revision();
                        actions.push(ClientAction::StateChanged { revision });
                    },
                    Err(err) => {
                        tracing::warn!(error = %err, "rejecting snapshot");
                        let fault = Fault::from(err);
                        self.last_error = Some(fault.clone());
                        actions.push(ClientAction::Fault(fault));
                    },
                },
                SessionAction::ResetSnapshot => {
                    self.store.reset();
                    self.last_error = None;
                    self.last_notice = None;
                    actions.push(ClientAction::StateChanged { revision: 0 });
                },
                SessionAction::ReportFault(fault) => {
                    self.last_error = Some(fault.clone());
                    actions.push(ClientAction::Fault(fault));
                },
                SessionAction::Notice(text) => {
                    self.last_notice = Some(text.clone());
                    actions.push(ClientAction::Notice(text));
                },
                SessionAction::ReconnectScheduled { .. } => {},
            }
        }

        actions
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::{Duration, Instant},
    };

    use meadow_core::{ReconnectPolicy, SessionError, SessionStatus, TransportId};

    use super::*;

    /// System-time environment whose clock only moves when told to.
    #[derive(Clone)]
    struct ManualEnv {
        base: Instant,
        offset: Arc<Mutex<Duration>>,
    }

    impl ManualEnv {
        fn new() -> Self {
            Self { base: Instant::now(), offset: Arc::new(Mutex::new(Duration::ZERO)) }
        }

        fn advance(&self, by: Duration) {
            *self.offset.lock().unwrap() += by;
        }
    }

    impl Environment for ManualEnv {
        type Instant = Instant;

        fn now(&self) -> Instant {
            self.base + *self.offset.lock().unwrap()
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            async {}
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(7);
        }
    }

    const INITIAL: &str = r#"{"type":"initial_state","state":{"resources":{"eggs":5,"money":60},
        "animals":[{"name":"Clucky","type":"chicken","health":100,"hunger":0}],
        "weather":"sunny","total_days":1}}"#;

    fn connected() -> (Client<ManualEnv>, TransportId, ManualEnv) {
        connected_with(INITIAL)
    }

    fn connected_with(initial: &str) -> (Client<ManualEnv>, TransportId, ManualEnv) {
        let env = ManualEnv::new();
        let mut client = Client::new(env.clone(), ClientConfig::default());
        let actions = client.start();
        let Some(ClientAction::OpenTransport { id, .. }) = actions.first().cloned() else {
            panic!("expected OpenTransport, got {actions:?}");
        };

        let actions = client.handle(ClientEvent::TransportOpened { id }).unwrap();
        assert_eq!(actions[0], ClientAction::Send { id, text: "STATE".into() });

        client.handle(ClientEvent::TransportMessage { id, text: initial.into() }).unwrap();
        (client, id, env)
    }

    fn sent(actions: &[ClientAction]) -> Vec<&str> {
        actions
            .iter()
            .filter_map(|a| match a {
                ClientAction::Send { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn initial_state_populates_store() {
        let (client, _, _) = connected();

        assert_eq!(client.connection_status(), ConnectionStatus::Connected);
        assert_eq!(client.read().weather, "sunny");
        assert_eq!(client.read().animals.len(), 1);
        assert_eq!(client.revision(), 1);
    }

    #[test]
    fn buy_animal_transmits_exactly_one_command() {
        let (mut client, id, _) = connected();

        let actions = client.buy_animal("chicken", "Henrietta").unwrap();
        assert_eq!(actions, vec![ClientAction::Send {
            id,
            text: r#"{"action":"buy_animal","type":"chicken","name":"Henrietta"}"#.into()
        }]);
    }

    #[test]
    fn validation_failure_is_recorded_and_not_sent() {
        let (mut client, _, _) = connected();

        let err = client.sell("eggs", 6).unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::InsufficientHolding { .. })
        ));
        assert!(matches!(client.last_error(), Some(Fault::Validation(_))));

        client.handle(ClientEvent::DismissError).unwrap();
        assert_eq!(client.last_error(), None);

        let actions = client.sell("eggs", 5).unwrap();
        assert_eq!(sent(&actions), vec![r#"{"action":"sell","item":"eggs","quantity":5}"#]);
    }

    #[test]
    fn intents_while_disconnected_are_dropped() {
        let env = ManualEnv::new();
        let mut client = Client::new(env, ClientConfig::default());

        let err = client.feed_animals().unwrap_err();
        assert!(matches!(err, ClientError::Session(SessionError::NotOpen { .. })));
        assert!(matches!(client.last_error(), Some(Fault::Session(_))));
        assert!(client.handle(ClientEvent::RefreshState).is_err());
    }

    const TWO_HENS: &str = r#"{"type":"initial_state","state":{"resources":{"eggs":5,"money":60},
        "animals":[{"name":"Clucky","type":"chicken","health":100,"hunger":0},
        {"name":"Henny","type":"chicken","health":100,"hunger":0}],"total_days":1}}"#;

    /// One locally valid intent of every command kind against `TWO_HENS`.
    fn valid_intents() -> Vec<ClientEvent> {
        vec![
            ClientEvent::BuyFeed { amount: 10 },
            ClientEvent::Sell { item: "eggs".into(), quantity: 5 },
            ClientEvent::Breed { first: "Clucky".into(), second: "Henny".into() },
            ClientEvent::BuyAnimal { kind: "chicken".into(), name: "Henrietta".into() },
            ClientEvent::FeedAnimals,
        ]
    }

    fn assert_dropped(client: &mut Client<ManualEnv>, expected: SessionStatus) {
        assert_eq!(client.session().status(), expected);
        for event in valid_intents() {
            let err = client.handle(event.clone()).unwrap_err();
            let ClientError::Session(SessionError::NotOpen { status }) = err else {
                panic!("{event:?} gave {err:?}");
            };
            assert_eq!(status, expected);
            assert!(matches!(client.last_error(), Some(Fault::Session(_))));
        }
    }

    #[test]
    fn every_command_kind_is_sent_while_open() {
        let (mut client, _, _) = connected_with(TWO_HENS);

        for event in valid_intents() {
            let actions = client.handle(event.clone()).unwrap();
            assert_eq!(sent(&actions).len(), 1, "{event:?}");
        }
    }

    #[test]
    fn every_command_kind_is_dropped_unless_open() {
        let (mut client, id, _) = connected_with(TWO_HENS);
        client.handle(ClientEvent::TransportClosed { id, reason: "reset".into() }).unwrap();
        assert_dropped(&mut client, SessionStatus::Closed);

        client.reconnect();
        assert_dropped(&mut client, SessionStatus::Connecting);
        assert_eq!(client.read().animals.len(), 2, "snapshot survives the drop");
    }

    #[test]
    fn idle_client_drops_commands_that_pass_validation() {
        let mut client = Client::new(ManualEnv::new(), ClientConfig::default());

        for event in [
            ClientEvent::BuyFeed { amount: 10 },
            ClientEvent::BuyAnimal { kind: "chicken".into(), name: "Henrietta".into() },
            ClientEvent::FeedAnimals,
        ] {
            let err = client.handle(event).unwrap_err();
            assert!(matches!(
                err,
                ClientError::Session(SessionError::NotOpen { status: SessionStatus::Idle })
            ));
        }
    }

    #[test]
    fn status_changes_are_reported() {
        let (mut client, id, env) = connected();

        let actions = client
            .handle(ClientEvent::TransportClosed { id, reason: "going away".into() })
            .unwrap();
        assert_eq!(actions, vec![ClientAction::StatusChanged(ConnectionStatus::Reconnecting {
            attempt: 1
        })]);
        assert_eq!(client.read().weather, "sunny");

        env.advance(Duration::from_secs(3));
        let actions = client.handle(ClientEvent::Tick).unwrap();
        assert!(matches!(actions[0], ClientAction::OpenTransport { .. }));
        assert_eq!(
            actions.last(),
            Some(&ClientAction::StatusChanged(ConnectionStatus::Connecting { attempt: 1 }))
        );
    }

    #[test]
    fn action_result_outcomes_surface() {
        let (mut client, id, _) = connected();

        let text = INITIAL
            .replace("initial_state", "action_result")
            .replacen('{', r#"{"success":"Fed all animals","#, 1);
        let actions = client.handle(ClientEvent::TransportMessage { id, text }).unwrap();
        assert!(actions.contains(&ClientAction::Notice("Fed all animals".into())));
        assert_eq!(client.last_notice(), Some("Fed all animals"));

        let text = INITIAL
            .replace("initial_state", "action_result")
            .replacen('{', r#"{"error":"Not enough feed","#, 1);
        client.handle(ClientEvent::TransportMessage { id, text }).unwrap();
        assert_eq!(client.last_error(), Some(&Fault::Authority("Not enough feed".into())));
        assert_eq!(client.revision(), 3);
    }

    #[test]
    fn invalid_snapshot_keeps_previous_state() {
        let (mut client, id, _) = connected();
        let before = client.read().clone();

        let text = r#"{"type":"state_update","state":{"resources":{},
            "animals":[{"name":"","type":"cow","health":90,"hunger":1}],"total_days":2}}"#;
        let actions =
            client.handle(ClientEvent::TransportMessage { id, text: text.into() }).unwrap();

        assert!(matches!(actions.as_slice(), [ClientAction::Fault(Fault::Protocol(_))]));
        assert_eq!(client.read(), &before);
    }

    #[test]
    fn observers_follow_applied_snapshots() {
        let env = ManualEnv::new();
        let mut client = Client::new(env, ClientConfig::default());
        let days = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&days);
        client.subscribe(move |s| sink.lock().unwrap().push(s.total_days));

        let id = match client.start().first() {
            Some(ClientAction::OpenTransport { id, .. }) => *id,
            other => panic!("unexpected {other:?}"),
        };
        client.handle(ClientEvent::TransportOpened { id }).unwrap();
        client.handle(ClientEvent::TransportMessage { id, text: INITIAL.into() }).unwrap();
        client.handle(ClientEvent::Reset).unwrap();

        assert_eq!(*days.lock().unwrap(), vec![1, 0]);
        assert_eq!(client.connection_status(), ConnectionStatus::Idle);
    }

    #[test]
    fn second_start_is_ignored() {
        let (mut client, id, _) = connected();

        assert!(client.start().is_empty());
        assert_eq!(client.session().transport(), Some(id));
    }

    #[test]
    fn report_carries_the_attempt_limit() {
        let unbounded = Client::new(ManualEnv::new(), ClientConfig::default());
        assert_eq!(unbounded.report().attempt_limit, None);

        let mut reconnect = ReconnectPolicy::exponential();
        if let ReconnectPolicy::Exponential { max_attempts, .. } = &mut reconnect {
            *max_attempts = Some(5);
        }
        let config = ClientConfig {
            session: SessionConfig { reconnect, ..SessionConfig::default() },
            ..ClientConfig::default()
        };
        let mut client = Client::new(ManualEnv::new(), config);
        let id = match client.start().first() {
            Some(ClientAction::OpenTransport { id, .. }) => *id,
            other => panic!("unexpected {other:?}"),
        };
        client.handle(ClientEvent::TransportClosed { id, reason: "refused".into() }).unwrap();

        let report = client.report();
        assert_eq!(report.attempt_limit, Some(5));
        assert_eq!(report.headline(), "Disconnected. Reconnecting... (attempt 1 of 5)");
    }
}
