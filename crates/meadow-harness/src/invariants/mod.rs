//! Invariant checking for deterministic simulation testing.
//!
//! Invariants are properties that must always hold during system execution.
//! Unlike example-based tests that check specific scenarios, invariants
//! verify behavioral properties across all possible execution paths.
//!
//! # Architecture
//!
//! The driver extracts observable state from the client and its simulated
//! network into an [`Observation`], then runs registered [`Invariant`] checks
//! against it after every event.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let observation = driver.observe();
//! registry.check_all(&observation)?;
//! ```

mod checks;
mod observation;

pub use checks::{
    AnimalsNamed, AttemptResetWhileOpen, OpenHasTransport, RevisionMonotonic, SingleLiveTransport,
};
pub use observation::Observation;

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Name of the violated invariant.
    pub invariant: &'static str,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against observed state.
pub trait Invariant: Send + Sync {
    /// Invariant name for error reporting.
    fn name(&self) -> &'static str;

    /// Check the invariant against the current observation.
    fn check(&self, state: &Observation) -> InvariantResult;

    /// Build a violation of this invariant.
    fn violation(&self, message: String) -> Violation {
        Violation { invariant: self.name(), message }
    }
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with the standard client invariants.
    ///
    /// Includes:
    /// - [`OpenHasTransport`]: an open session names its transport
    /// - [`AttemptResetWhileOpen`]: the attempt counter is 0 while open
    /// - [`SingleLiveTransport`]: at most one transport is live, and it is
    ///   the session's
    /// - [`RevisionMonotonic`]: the store revision only moves forward, except
    ///   on reset
    /// - [`AnimalsNamed`]: every stored animal has a name
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(OpenHasTransport);
        registry.add(AttemptResetWhileOpen);
        registry.add(SingleLiveTransport);
        registry.add(RevisionMonotonic);
        registry.add(AnimalsNamed);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &Observation) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}
