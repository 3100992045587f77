//! Standard invariant checks.

use meadow_core::SessionStatus;

use super::{Invariant, InvariantResult, Observation};

/// An open session must name its transport.
pub struct OpenHasTransport;

impl Invariant for OpenHasTransport {
    fn name(&self) -> &'static str {
        "open_has_transport"
    }

    fn check(&self, state: &Observation) -> InvariantResult {
        if state.status == SessionStatus::Open && state.transport.is_none() {
            return Err(self.violation("session is open without a transport".to_string()));
        }
        Ok(())
    }
}

/// A successful open resets the reconnect counter.
pub struct AttemptResetWhileOpen;

impl Invariant for AttemptResetWhileOpen {
    fn name(&self) -> &'static str {
        "attempt_reset_while_open"
    }

    fn check(&self, state: &Observation) -> InvariantResult {
        if state.status == SessionStatus::Open && state.attempt != 0 {
            return Err(self.violation(format!("open with attempt {}", state.attempt)));
        }
        Ok(())
    }
}

/// At most one transport is live, and it is the one the session tracks.
///
/// Events from any other transport would be stale.
pub struct SingleLiveTransport;

impl Invariant for SingleLiveTransport {
    fn name(&self) -> &'static str {
        "single_live_transport"
    }

    fn check(&self, state: &Observation) -> InvariantResult {
        match state.live_transports.as_slice() {
            [] => Ok(()),
            [live] if state.transport == Some(*live) => Ok(()),
            [live] => Err(self.violation(format!(
                "transport {live} is live but the session tracks {:?}",
                state.transport
            ))),
            many => Err(self.violation(format!("{} live transports: {many:?}", many.len()))),
        }
    }
}

/// Store revisions never decrease, except to zero on a reset.
pub struct RevisionMonotonic;

impl Invariant for RevisionMonotonic {
    fn name(&self) -> &'static str {
        "revision_monotonic"
    }

    fn check(&self, state: &Observation) -> InvariantResult {
        for (i, window) in state.revisions.windows(2).enumerate() {
            let reset = state.resets.contains(&(i + 1)) && window[1] == 0;
            if window[1] < window[0] && !reset {
                return Err(
                    self.violation(format!("revision went {} → {}", window[0], window[1]))
                );
            }
        }
        Ok(())
    }
}

/// Every stored animal can be addressed by a command.
///
/// Names may repeat, but an empty name never makes it into the store.
pub struct AnimalsNamed;

impl Invariant for AnimalsNamed {
    fn name(&self) -> &'static str {
        "animals_named"
    }

    fn check(&self, state: &Observation) -> InvariantResult {
        match state.snapshot.animals.iter().position(|a| a.name.is_empty()) {
            Some(index) => Err(self.violation(format!("animal {index} has no name"))),
            None => Ok(()),
        }
    }
}
