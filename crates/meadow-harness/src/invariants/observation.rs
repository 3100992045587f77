//! Observable state captured for invariant checking.
//!
//! Invariants operate on observations rather than live state so that every
//! check sees one consistent moment.

use meadow_core::{SessionStatus, TransportId};
use meadow_proto::Snapshot;

/// Client and network state at one point in a simulation.
#[derive(Debug, Clone)]
pub struct Observation {
    /// Session status.
    pub status: SessionStatus,
    /// Reconnect attempt counter.
    pub attempt: u32,
    /// Transport the session considers current.
    pub transport: Option<TransportId>,
    /// Transports the simulated network holds open.
    pub live_transports: Vec<TransportId>,
    /// Store revision after each processed event, oldest first.
    pub revisions: Vec<u64>,
    /// Store resets observed, in the same timeline as `revisions`.
    pub resets: Vec<usize>,
    /// Current stored snapshot.
    pub snapshot: Snapshot,
}

impl Observation {
    /// Observation of a client that has never started.
    pub fn idle() -> Self {
        Self {
            status: SessionStatus::Idle,
            attempt: 0,
            transport: None,
            live_transports: Vec::new(),
            revisions: Vec::new(),
            resets: Vec::new(),
            snapshot: Snapshot::default(),
        }
    }
}
