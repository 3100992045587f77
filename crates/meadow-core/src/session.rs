//! Session lifecycle state machine.
//!
//! Owns the single logical connection to the authority: which transport is
//! current, whether it is open, how many reconnects have been attempted and
//! when the next one is due. Uses the action pattern: methods take time as
//! input and return actions for the driver to execute. No sockets, no timers.
//!
//! # State Machine
//!
//! ```text
//!            start/reconnect          transport open
//! ┌──────┐ ───────────────> ┌────────────┐ ──────────> ┌──────┐
//! │ Idle │                  │ Connecting │             │ Open │
//! └──────┘       ┌────────> └────────────┘             └──────┘
//!                │ tick (deadline)    │ close                │ close
//!                │                    ↓                      ↓
//!                │               ┌────────┐ <────────────────┘
//!                └────────────── │ Closed │
//!                                └────────┘
//! ```
//!
//! `shutdown` moves a live session to `Closing`; the close that follows lands
//! in `Closed` without scheduling a reconnect.
//!
//! # Transport identity
//!
//! Every transport the session asks for gets a fresh [`TransportId`]. Events
//! carry the id of the transport that produced them, and events from anything
//! but the current transport are stale and ignored. This keeps exactly one
//! transport authoritative even when a torn-down transport reports its close
//! after its replacement has opened.

use std::{fmt, time::Duration};

use meadow_proto::{ActionOutcome, Inbound, Outbound, Snapshot};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    backoff::ReconnectPolicy,
    encoder::ValidatedCommand,
    env::Timestamp,
    error::{Fault, SessionError},
};

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8000/ws";

/// Identity of one transport instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransportId(u64);

impl TransportId {
    /// Raw id value.
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Session lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Constructed or hard-reset, never started
    Idle,
    /// Transport requested, waiting for it to open
    Connecting,
    /// Transport open, messages flow
    Open,
    /// Shutdown requested, waiting for the transport to close
    Closing,
    /// No transport; a reconnect may be scheduled
    Closed,
}

impl SessionStatus {
    /// Lowercase name used in logs and errors.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions returned by the session state machine.
///
/// The driver (client facade, runtime or test harness) executes these:
/// - `OpenTransport`: connect a new transport tagged with `id`
/// - `SendText`: write a text frame on the current transport
/// - `CloseTransport`: tear down the transport tagged with `id`
/// - `ApplySnapshot`/`ResetSnapshot`: update the state store
/// - `ReportFault`/`Notice`: surface to observers
/// - `ReconnectScheduled`: informational, the deadline is in
///   [`Session::next_deadline`]
#[derive(Debug, Clone, PartialEq)]
pub enum SessionAction {
    /// Connect a new transport
    OpenTransport {
        /// Identity the transport's events must carry
        id: TransportId,
        /// Where to connect
        endpoint: String,
    },

    /// Send this text frame on the current transport
    SendText(String),

    /// Tear down a transport
    CloseTransport {
        /// Transport to close
        id: TransportId,
        /// Reason for closing
        reason: String,
    },

    /// Replace the stored snapshot
    ApplySnapshot(Snapshot),

    /// Blank the stored snapshot
    ResetSnapshot,

    /// Surface a fault to observers
    ReportFault(Fault),

    /// Surface an informational message from the authority
    Notice(String),

    /// A reconnect is due after `delay`
    ReconnectScheduled {
        /// Attempt number, 1-based
        attempt: u32,
        /// Delay before the attempt
        delay: Duration,
    },
}

/// Session configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Authority endpoint (WebSocket URL)
    pub endpoint: String,
    /// Reconnection policy
    pub reconnect: ReconnectPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { endpoint: DEFAULT_ENDPOINT.to_string(), reconnect: ReconnectPolicy::default() }
    }
}

/// Session state machine
///
/// Pure state machine: no I/O and no environment storage. Time is passed to
/// the methods that need it, and reconnect jitter draws from an RNG seeded at
/// construction so simulated runs replay exactly.
///
/// Generic over the instant type to support both real time and virtual time.
#[derive(Debug, Clone)]
pub struct Session<I: Timestamp> {
    status: SessionStatus,
    config: SessionConfig,
    /// Reconnects since the last successful open
    attempt: u32,
    last_error: Option<String>,
    /// Transport whose events are authoritative
    current: Option<TransportId>,
    next_transport: u64,
    reconnect_at: Option<I>,
    status_since: Option<I>,
    rng: StdRng,
}

impl<I: Timestamp> Session<I> {
    /// Create a session in [`SessionStatus::Idle`].
    ///
    /// `seed` seeds the jitter RNG; production callers pass fresh entropy.
    pub fn new(config: SessionConfig, seed: u64) -> Self {
        Self {
            status: SessionStatus::Idle,
            config,
            attempt: 0,
            last_error: None,
            current: None,
            next_transport: 1,
            reconnect_at: None,
            status_since: None,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Current lifecycle status.
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Reconnects attempted since the last successful open.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Most recent transport failure. Cleared when a transport opens.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Transport whose events are currently accepted. `None` if none is live.
    pub fn transport(&self) -> Option<TransportId> {
        self.current
    }

    /// Configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// Configured reconnection policy.
    pub fn policy(&self) -> &ReconnectPolicy {
        &self.config.reconnect
    }

    /// When the session entered its current status. `None` while idle.
    pub fn status_since(&self) -> Option<I> {
        self.status_since
    }

    /// Pending reconnect deadline, if any. Drivers sleep until this and then
    /// call [`Session::tick`].
    pub fn next_deadline(&self) -> Option<I> {
        self.reconnect_at
    }

    /// Begin connecting.
    ///
    /// Cancels any pending reconnect and requests a new transport.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidState` unless `Idle` or `Closed`
    pub fn start(&mut self, now: I) -> Result<Vec<SessionAction>, SessionError> {
        if !matches!(self.status, SessionStatus::Idle | SessionStatus::Closed) {
            return Err(SessionError::InvalidState { status: self.status, operation: "start" });
        }

        self.reconnect_at = None;
        Ok(vec![self.open_transport(now)])
    }

    /// Transport `id` completed its handshake.
    ///
    /// Resets the attempt counter and requests a full snapshot.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidState` if `id` is current but the session is
    ///   not `Connecting`
    pub fn on_transport_open(
        &mut self,
        id: TransportId,
        now: I,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if self.is_stale(id, "open") {
            return Ok(Vec::new());
        }
        if self.status != SessionStatus::Connecting {
            return Err(SessionError::InvalidState { status: self.status, operation: "open" });
        }

        self.set_status(SessionStatus::Open, now);
        self.attempt = 0;
        self.last_error = None;
        tracing::info!(endpoint = %self.config.endpoint, transport_id = %id, "session open");

        Ok(vec![SessionAction::SendText(Outbound::StateRequest.encode()?)])
    }

    /// Transport `id` delivered a text frame.
    ///
    /// Undecodable frames produce a protocol fault and change nothing.
    ///
    /// # Errors
    ///
    /// - `SessionError::InvalidState` if `id` is current but the session is
    ///   not `Open`
    pub fn on_transport_message(
        &mut self,
        id: TransportId,
        raw: &str,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if self.is_stale(id, "message") {
            return Ok(Vec::new());
        }
        if self.status != SessionStatus::Open {
            return Err(SessionError::InvalidState { status: self.status, operation: "receive" });
        }

        let message = match Inbound::decode(raw) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(transport_id = %id, error = %err, "discarding inbound message");
                return Ok(vec![SessionAction::ReportFault(err.into())]);
            },
        };
        tracing::debug!(transport_id = %id, kind = message.kind().as_str(), "inbound message");

        let actions = match message {
            Inbound::InitialState { state } | Inbound::StateUpdate { state } => {
                vec![SessionAction::ApplySnapshot(state)]
            },
            Inbound::ActionResult { state, outcome } => {
                let mut actions = vec![SessionAction::ApplySnapshot(state)];
                match outcome {
                    Some(ActionOutcome::Success(text)) => actions.push(SessionAction::Notice(text)),
                    Some(ActionOutcome::Failure(text)) => {
                        actions.push(SessionAction::ReportFault(Fault::Authority(text)));
                    },
                    None => {},
                }
                actions
            },
            Inbound::Error { message, state } => {
                let mut actions: Vec<_> =
                    state.into_iter().map(SessionAction::ApplySnapshot).collect();
                actions.push(SessionAction::ReportFault(Fault::Authority(message)));
                actions
            },
        };

        Ok(actions)
    }

    /// Transport `id` closed.
    ///
    /// Unless the close was requested through [`Session::shutdown`], schedules
    /// a reconnect per the policy. The stored snapshot is left alone.
    pub fn on_transport_close(
        &mut self,
        id: TransportId,
        reason: &str,
        now: I,
    ) -> Vec<SessionAction> {
        if self.is_stale(id, "close") {
            return Vec::new();
        }

        let requested = self.status == SessionStatus::Closing;
        self.current = None;
        self.set_status(SessionStatus::Closed, now);

        if requested {
            tracing::info!(transport_id = %id, "session closed");
            return Vec::new();
        }

        self.last_error = Some(reason.to_string());
        self.attempt = self.attempt.saturating_add(1);

        let Some(delay) = self.config.reconnect.delay(self.attempt, &mut self.rng) else {
            let attempts = self.attempt - 1;
            tracing::warn!(attempts, reason, "reconnect attempts exhausted");
            return vec![SessionAction::ReportFault(Fault::ReconnectExhausted { attempts })];
        };

        self.reconnect_at = Some(now + delay);
        tracing::info!(
            transport_id = %id,
            attempt = self.attempt,
            delay_ms = delay.as_millis() as u64,
            reason,
            "connection lost, reconnect scheduled"
        );

        vec![SessionAction::ReconnectScheduled { attempt: self.attempt, delay }]
    }

    /// Transport `id` reported an error.
    ///
    /// No transition: a failing transport reports its close separately.
    pub fn on_transport_error(&mut self, id: TransportId, detail: &str) -> Vec<SessionAction> {
        if self.is_stale(id, "error") {
            return Vec::new();
        }

        tracing::warn!(transport_id = %id, status = %self.status, detail, "transport error");
        self.last_error = Some(detail.to_string());
        vec![SessionAction::ReportFault(Fault::Transport(detail.to_string()))]
    }

    /// Transmit a validated command.
    ///
    /// Commands are never queued: one submitted while the session is not open
    /// is dropped.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotOpen` unless `Open`
    /// - `SessionError::Protocol` if the command cannot be encoded
    pub fn send(&mut self, command: ValidatedCommand) -> Result<Vec<SessionAction>, SessionError> {
        if self.status != SessionStatus::Open {
            tracing::debug!(status = %self.status, kind = command.kind(), "dropping command");
            return Err(SessionError::NotOpen { status: self.status });
        }

        let text = Outbound::Command(command.into_command()).encode()?;
        Ok(vec![SessionAction::SendText(text)])
    }

    /// Ask the authority for a full snapshot outside the open handshake.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotOpen` unless `Open`
    pub fn request_state(&self) -> Result<Vec<SessionAction>, SessionError> {
        if self.status != SessionStatus::Open {
            return Err(SessionError::NotOpen { status: self.status });
        }
        Ok(vec![SessionAction::SendText(Outbound::StateRequest.encode()?)])
    }

    /// Fire the reconnect timer if its deadline has passed.
    pub fn tick(&mut self, now: I) -> Vec<SessionAction> {
        match self.reconnect_at {
            Some(deadline) if now >= deadline && self.status == SessionStatus::Closed => {
                self.reconnect_at = None;
                vec![self.open_transport(now)]
            },
            _ => Vec::new(),
        }
    }

    /// Force a new connection regardless of backoff timing.
    ///
    /// Tears down the live transport, if any. The attempt counter is kept.
    pub fn reconnect(&mut self, now: I) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        if let Some(id) = self.current.take() {
            actions.push(SessionAction::CloseTransport { id, reason: "manual reconnect".into() });
        }

        self.reconnect_at = None;
        tracing::info!(attempt = self.attempt, "manual reconnect");
        actions.push(self.open_transport(now));
        actions
    }

    /// Tear the session down without reconnecting.
    pub fn shutdown(&mut self, now: I) -> Vec<SessionAction> {
        self.reconnect_at = None;

        match (self.status, self.current) {
            (SessionStatus::Open | SessionStatus::Connecting, Some(id)) => {
                self.set_status(SessionStatus::Closing, now);
                vec![SessionAction::CloseTransport { id, reason: "shutdown".into() }]
            },
            (SessionStatus::Closing, _) => Vec::new(),
            _ => {
                self.current = None;
                self.set_status(SessionStatus::Closed, now);
                Vec::new()
            },
        }
    }

    /// Hard reset: tear down, forget history, return to `Idle` and blank the
    /// stored snapshot.
    pub fn reset(&mut self) -> Vec<SessionAction> {
        let mut actions = Vec::new();
        if let Some(id) = self.current.take() {
            actions.push(SessionAction::CloseTransport { id, reason: "reset".into() });
        }

        self.status = SessionStatus::Idle;
        self.status_since = None;
        self.attempt = 0;
        self.last_error = None;
        self.reconnect_at = None;
        tracing::info!("session reset");

        actions.push(SessionAction::ResetSnapshot);
        actions
    }

    fn open_transport(&mut self, now: I) -> SessionAction {
        let id = TransportId(self.next_transport);
        self.next_transport += 1;
        self.current = Some(id);
        self.set_status(SessionStatus::Connecting, now);

        tracing::info!(
            endpoint = %self.config.endpoint,
            transport_id = %id,
            attempt = self.attempt,
            "connecting"
        );

        SessionAction::OpenTransport { id, endpoint: self.config.endpoint.clone() }
    }

    fn is_stale(&self, id: TransportId, event: &'static str) -> bool {
        if self.current == Some(id) {
            return false;
        }
        tracing::debug!(
            transport_id = %id,
            current = ?self.current,
            event,
            "ignoring stale transport event"
        );
        true
    }

    fn set_status(&mut self, status: SessionStatus, now: I) {
        if self.status != status {
            tracing::debug!(from = %self.status, to = %status, "session status");
            self.status = status;
            self.status_since = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use meadow_proto::Command;

    use super::*;

    const SNAPSHOT: &str = r#"{"resources":{"eggs":5,"money":100},"animals":[
        {"name":"Clucky","type":"chicken","health":100,"hunger":0}],
        "weather":"sunny","total_days":1}"#;

    fn session() -> Session<Instant> {
        Session::new(SessionConfig::default(), 0)
    }

    fn opened(t0: Instant) -> (Session<Instant>, TransportId) {
        let mut session = session();
        let actions = session.start(t0).unwrap();
        let SessionAction::OpenTransport { id, .. } = actions[0] else {
            panic!("expected OpenTransport, got {actions:?}");
        };
        session.on_transport_open(id, t0).unwrap();
        (session, id)
    }

    fn message(kind: &str, extra: &str) -> String {
        format!(r#"{{"type":"{kind}"{extra},"state":{SNAPSHOT}}}"#)
    }

    #[test]
    fn session_lifecycle() {
        let t0 = Instant::now();
        let mut session = session();
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.status_since(), None);

        let actions = session.start(t0).unwrap();
        assert_eq!(session.status(), SessionStatus::Connecting);
        let id = session.transport().unwrap();
        assert_eq!(actions, vec![SessionAction::OpenTransport {
            id,
            endpoint: DEFAULT_ENDPOINT.to_string()
        }]);

        let actions = session.on_transport_open(id, t0).unwrap();
        assert_eq!(session.status(), SessionStatus::Open);
        assert_eq!(actions, vec![SessionAction::SendText("STATE".into())]);
        assert_eq!(session.status_since(), Some(t0));
    }

    #[test]
    fn start_while_live_fails_fast() {
        let t0 = Instant::now();
        let mut session = session();
        session.start(t0).unwrap();

        let result = session.start(t0);
        assert_eq!(
            result,
            Err(SessionError::InvalidState {
                status: SessionStatus::Connecting,
                operation: "start",
            })
        );

        let (mut session, _) = opened(t0);
        assert!(session.start(t0).is_err());
    }

    #[test]
    fn snapshots_are_applied() {
        let t0 = Instant::now();
        let (mut session, id) = opened(t0);

        for kind in ["initial_state", "state_update"] {
            let actions = session.on_transport_message(id, &message(kind, "")).unwrap();
            assert_eq!(actions.len(), 1);
            assert!(matches!(
                &actions[0],
                SessionAction::ApplySnapshot(s) if s.holding("eggs") == 5.0
            ));
        }
    }

    #[test]
    fn action_result_outcome_is_surfaced() {
        let t0 = Instant::now();
        let (mut session, id) = opened(t0);

        let raw = message("action_result", r#","success":"Sold 5 eggs for $12.50""#);
        let actions = session.on_transport_message(id, &raw).unwrap();
        assert!(matches!(actions[0], SessionAction::ApplySnapshot(_)));
        assert_eq!(actions[1], SessionAction::Notice("Sold 5 eggs for $12.50".into()));

        let raw = message("action_result", r#","error":"Not enough eggs""#);
        let actions = session.on_transport_message(id, &raw).unwrap();
        assert!(matches!(actions[0], SessionAction::ApplySnapshot(_)));
        assert_eq!(
            actions[1],
            SessionAction::ReportFault(Fault::Authority("Not enough eggs".into()))
        );

        let actions = session.on_transport_message(id, &message("action_result", "")).unwrap();
        assert_eq!(actions.len(), 1);
    }

    #[test]
    fn authority_error_keeps_session_open() {
        let t0 = Instant::now();
        let (mut session, id) = opened(t0);

        let actions = session
            .on_transport_message(id, r#"{"type":"error","error":"Unknown action: dance"}"#)
            .unwrap();
        assert_eq!(actions, vec![SessionAction::ReportFault(Fault::Authority(
            "Unknown action: dance".into()
        ))]);
        assert_eq!(session.status(), SessionStatus::Open);

        let late = message("error", r#","error":"late""#);
        let actions = session.on_transport_message(id, &late).unwrap();
        assert!(matches!(actions[0], SessionAction::ApplySnapshot(_)));
        assert!(matches!(actions[1], SessionAction::ReportFault(Fault::Authority(_))));
    }

    #[test]
    fn malformed_message_reports_protocol_fault() {
        let t0 = Instant::now();
        let (mut session, id) = opened(t0);

        for raw in ["{", r#"{"type":"chat"}"#, r#"{"type":"state_update"}"#, "[]"] {
            let actions = session.on_transport_message(id, raw).unwrap();
            assert!(
                matches!(actions.as_slice(), [SessionAction::ReportFault(Fault::Protocol(_))]),
                "{raw}: {actions:?}"
            );
        }
        assert_eq!(session.status(), SessionStatus::Open);
    }

    #[test]
    fn messages_before_open_are_rejected() {
        let t0 = Instant::now();
        let mut session = session();
        session.start(t0).unwrap();
        let id = session.transport().unwrap();

        let result = session.on_transport_message(id, &message("state_update", ""));
        assert!(matches!(result, Err(SessionError::InvalidState { operation: "receive", .. })));
    }

    #[test]
    fn close_schedules_reconnect_after_delay() {
        let t0 = Instant::now();
        let (mut session, id) = opened(t0);

        let actions = session.on_transport_close(id, "connection reset", t0);
        assert_eq!(session.status(), SessionStatus::Closed);
        assert_eq!(session.attempt(), 1);
        assert_eq!(session.last_error(), Some("connection reset"));
        assert_eq!(actions, vec![SessionAction::ReconnectScheduled {
            attempt: 1,
            delay: Duration::from_secs(3)
        }]);
        assert_eq!(session.next_deadline(), Some(t0 + Duration::from_secs(3)));

        assert!(session.tick(t0 + Duration::from_millis(2999)).is_empty());
        assert_eq!(session.status(), SessionStatus::Closed);

        let actions = session.tick(t0 + Duration::from_secs(3));
        assert!(matches!(actions.as_slice(), [SessionAction::OpenTransport { .. }]));
        assert_eq!(session.status(), SessionStatus::Connecting);
        assert_eq!(session.next_deadline(), None);
        assert_ne!(session.transport(), Some(id));
    }

    #[test]
    fn attempt_counts_failed_connects_and_resets_on_open() {
        let t0 = Instant::now();
        let (mut session, id) = opened(t0);
        session.on_transport_close(id, "gone", t0);

        let mut now = t0;
        for expected in 2..=4 {
            now += Duration::from_secs(3);
            session.tick(now);
            let id = session.transport().unwrap();
            session.on_transport_close(id, "refused", now);
            assert_eq!(session.attempt(), expected);
        }

        now += Duration::from_secs(3);
        session.tick(now);
        let id = session.transport().unwrap();
        session.on_transport_open(id, now).unwrap();
        assert_eq!(session.attempt(), 0);
        assert_eq!(session.last_error(), None);
    }

    #[test]
    fn stale_transport_events_are_ignored() {
        let t0 = Instant::now();
        let (mut session, old) = opened(t0);

        let actions = session.reconnect(t0);
        assert_eq!(actions[0], SessionAction::CloseTransport {
            id: old,
            reason: "manual reconnect".into()
        });
        let new = session.transport().unwrap();
        assert_ne!(new, old);

        assert!(session.on_transport_close(old, "closed by peer", t0).is_empty());
        assert!(session.on_transport_error(old, "broken pipe").is_empty());
        assert!(session.on_transport_open(old, t0).unwrap().is_empty());
        let update = message("state_update", "");
        assert!(session.on_transport_message(old, &update).unwrap().is_empty());
        assert_eq!(session.status(), SessionStatus::Connecting);
        assert_eq!(session.next_deadline(), None);
    }

    #[test]
    fn manual_reconnect_cancels_timer_and_keeps_attempt() {
        let t0 = Instant::now();
        let (mut session, id) = opened(t0);
        session.on_transport_close(id, "gone", t0);
        assert!(session.next_deadline().is_some());

        let actions = session.reconnect(t0 + Duration::from_millis(10));
        assert!(matches!(actions.as_slice(), [SessionAction::OpenTransport { .. }]));
        assert_eq!(session.next_deadline(), None);
        assert_eq!(session.attempt(), 1);
    }

    #[test]
    fn shutdown_does_not_reconnect() {
        let t0 = Instant::now();
        let (mut session, id) = opened(t0);

        let actions = session.shutdown(t0);
        assert_eq!(actions, vec![SessionAction::CloseTransport { id, reason: "shutdown".into() }]);
        assert_eq!(session.status(), SessionStatus::Closing);

        assert!(session.on_transport_close(id, "shutdown", t0).is_empty());
        assert_eq!(session.status(), SessionStatus::Closed);
        assert_eq!(session.attempt(), 0);
        assert_eq!(session.next_deadline(), None);
        assert!(session.tick(t0 + Duration::from_secs(60)).is_empty());
    }

    #[test]
    fn shutdown_cancels_pending_reconnect() {
        let t0 = Instant::now();
        let (mut session, id) = opened(t0);
        session.on_transport_close(id, "gone", t0);

        assert!(session.shutdown(t0).is_empty());
        assert_eq!(session.status(), SessionStatus::Closed);
        assert!(session.tick(t0 + Duration::from_secs(3)).is_empty());
    }

    #[test]
    fn send_requires_open_session() {
        let t0 = Instant::now();
        let mut session = session();
        let cmd = ValidatedCommand::new(Command::FeedAnimals);

        assert_eq!(
            session.send(cmd.clone()),
            Err(SessionError::NotOpen { status: SessionStatus::Idle })
        );

        let (mut session, _) = opened(t0);
        let actions = session.send(cmd).unwrap();
        assert_eq!(actions, vec![SessionAction::SendText(r#"{"action":"feed_animals"}"#.into())]);
    }

    #[test]
    fn exhausted_policy_stays_closed() {
        let t0 = Instant::now();
        let config = SessionConfig {
            reconnect: ReconnectPolicy::Exponential {
                initial: Duration::from_secs(1),
                multiplier: 2.0,
                max_delay: Duration::from_secs(8),
                jitter: 0.0,
                max_attempts: Some(1),
            },
            ..SessionConfig::default()
        };
        let mut session = Session::new(config, 0);
        session.start(t0).unwrap();
        let id = session.transport().unwrap();
        session.on_transport_close(id, "refused", t0);

        session.tick(t0 + Duration::from_secs(1));
        let id = session.transport().unwrap();
        let actions = session.on_transport_close(id, "refused", t0 + Duration::from_secs(1));
        assert_eq!(actions, vec![SessionAction::ReportFault(Fault::ReconnectExhausted {
            attempts: 1
        })]);
        assert_eq!(session.next_deadline(), None);

        let actions = session.reconnect(t0 + Duration::from_secs(2));
        assert!(matches!(actions.as_slice(), [SessionAction::OpenTransport { .. }]));
    }

    #[test]
    fn reset_returns_to_idle() {
        let t0 = Instant::now();
        let (mut session, id) = opened(t0);

        let actions = session.reset();
        assert_eq!(actions, vec![
            SessionAction::CloseTransport { id, reason: "reset".into() },
            SessionAction::ResetSnapshot,
        ]);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.transport(), None);
        assert!(session.start(t0).is_ok());
    }
}
