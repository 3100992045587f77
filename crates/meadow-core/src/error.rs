//! Error types for the Meadow core.
//!
//! Strongly-typed errors per layer: session lifecycle misuse, rejected
//! snapshots, local command validation, and the [`Fault`] taxonomy the client
//! surfaces to observers.

use meadow_proto::ProtocolError;
use thiserror::Error;

use crate::session::SessionStatus;

/// Errors from session state machine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Invalid state transition attempted
    #[error("invalid state transition: cannot {operation} while {status}")]
    InvalidState {
        /// Current status when the error occurred
        status: SessionStatus,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Command submitted while the session is not open
    #[error("not connected ({status}): command dropped")]
    NotOpen {
        /// Current status when the command was submitted
        status: SessionStatus,
    },

    /// Outbound message could not be encoded
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// A snapshot that decoded but violates the minimal shape.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// Resource quantity is NaN or infinite
    #[error("resource `{item}` is not a finite number")]
    NonFiniteResource {
        /// Resource key
        item: String,
    },

    /// Animal without a name
    #[error("animal at index {index} has an empty name")]
    EmptyAnimalName {
        /// Position in the animal list
        index: usize,
    },

    /// Health or hunger is NaN or infinite
    #[error("animal `{animal}` has a non-finite {field}")]
    NonFiniteVital {
        /// Animal name
        animal: String,
        /// `health` or `hunger`
        field: &'static str,
    },
}

/// Why a breed request was refused locally.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CombinationFault {
    /// No animal with this name in the snapshot
    #[error("no animal named `{0}`")]
    NotFound(String),

    /// Both parents are the same animal
    #[error("an animal cannot breed with itself")]
    Identical,

    /// Parents are different species
    #[error("cannot breed a {first} with a {second}")]
    TypeMismatch {
        /// First parent's species
        first: String,
        /// Second parent's species
        second: String,
    },
}

/// Why a new animal's name was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameFault {
    /// Name is empty after trimming
    #[error("name is empty")]
    Empty,

    /// Name exceeds the configured length
    #[error("name is {len} characters, at most {max} allowed")]
    TooLong {
        /// Length in characters after trimming
        len: usize,
        /// Configured maximum
        max: usize,
    },
}

/// A user intent failed a local precondition. Never transmitted.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Purchase amount outside `1..=max`
    #[error("amount must be between 1 and {max}, got {amount}")]
    InvalidAmount {
        /// Requested amount
        amount: u32,
        /// Configured maximum
        max: u32,
    },

    /// Sale of zero units
    #[error("quantity of {item} to sell must be at least 1")]
    ZeroQuantity {
        /// Resource key
        item: String,
    },

    /// Sale exceeds the held quantity
    #[error("cannot sell {requested} {item}, only {held} held")]
    InsufficientHolding {
        /// Resource key
        item: String,
        /// Requested quantity
        requested: u32,
        /// Held quantity
        held: f64,
    },

    /// Breed pair is not valid
    #[error("invalid breeding pair: {0}")]
    InvalidCombination(#[from] CombinationFault),

    /// New animal's name is not valid
    #[error("invalid name: {0}")]
    InvalidName(#[from] NameFault),

    /// Species not in the catalog
    #[error("unknown animal type `{0}`")]
    UnknownAnimalType(String),

    /// Funds below the catalog price
    #[error("need ${required:.2}, have ${available:.2}")]
    InsufficientFunds {
        /// Catalog price
        required: f64,
        /// Reported funds
        available: f64,
    },
}

/// Observer-visible fault.
///
/// No fault terminates the client. Transport faults lead to a reconnect,
/// protocol faults discard the offending message, validation and session
/// faults drop the command, and authority faults leave the session up.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Fault {
    /// Connection-level failure
    #[error("connection error: {0}")]
    Transport(String),

    /// Malformed or out-of-schema inbound message
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Local precondition failure
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Lifecycle misuse, e.g. sending while disconnected
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Error reported by the authority
    #[error("{0}")]
    Authority(String),

    /// Reconnect policy gave up
    #[error("gave up reconnecting after {attempts} attempts")]
    ReconnectExhausted {
        /// Attempts made
        attempts: u32,
    },
}

impl Fault {
    /// Returns true if the condition is expected to clear on its own.
    ///
    /// Transport failures are retried by the reconnect policy and authority
    /// errors concern a single command. Everything else needs the user or a
    /// fixed peer.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Authority(_))
    }
}

impl From<ProtocolError> for Fault {
    fn from(err: ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}

impl From<StoreError> for Fault {
    fn from(err: StoreError) -> Self {
        Self::Protocol(err.to_string())
    }
}
