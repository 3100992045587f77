//! Deterministic simulation harness for Meadow client testing.
//!
//! Runs the Sans-IO client against an in-memory authority on virtual time,
//! so reconnect timing, dropped connections and command round trips are
//! reproducible without sockets.
//!
//! # Model-Based Testing
//!
//! The `operation` module defines every externally triggered [`Operation`]
//! (intents, lifecycle calls, time, network faults). Property tests and the
//! fuzzer generate sequences of them and apply each through
//! [`SimDriver::apply`].
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the common
//! session and store invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod operation;
pub mod sim_authority;
pub mod sim_driver;
pub mod sim_env;

pub use invariants::{
    AnimalsNamed, AttemptResetWhileOpen, Invariant, InvariantRegistry, InvariantResult,
    Observation, OpenHasTransport, RevisionMonotonic, SingleLiveTransport, Violation,
};
pub use operation::{Item, NameSlot, Operation, Species};
pub use sim_authority::{ScriptedAuthority, starter_farm};
pub use sim_driver::SimDriver;
pub use sim_env::{SimEnv, SimInstant};
