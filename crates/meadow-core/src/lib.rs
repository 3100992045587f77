//! Meadow core
//!
//! Sans-IO building blocks for keeping a live mirror of a remote farm
//! simulation: the session lifecycle, the snapshot store and the command
//! encoder.
//!
//! # Architecture
//!
//! Nothing here performs I/O. The [`Session`] consumes transport events and
//! returns [`SessionAction`]s for a driver to execute; time is passed in, so
//! the same logic runs against real sockets or a simulated network.
//!
//! ```text
//! transport text ─> Session ─> ApplySnapshot ─> StateStore ─> observers
//! user intent ─> CommandEncoder ─> ValidatedCommand ─> Session::send ─> SendText
//! ```
//!
//! # Components
//!
//! - [`Session`]: Lifecycle state machine and message classification
//! - [`ReconnectPolicy`]: Delay between a drop and the next attempt
//! - [`StateStore`]: Last-known-good snapshot with observers
//! - [`CommandEncoder`]: Local validation of user intents
//! - [`Environment`]: Time and randomness abstraction for drivers

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod backoff;
pub mod encoder;
pub mod env;
pub mod error;
pub mod session;
pub mod store;

pub use backoff::ReconnectPolicy;
pub use encoder::{Catalog, CommandEncoder, EncoderConfig, ValidatedCommand};
pub use env::{Environment, Timestamp};
pub use error::{CombinationFault, Fault, NameFault, SessionError, StoreError, ValidationError};
pub use session::{Session, SessionAction, SessionConfig, SessionStatus, TransportId};
pub use store::{Observer, StateStore, SubscriptionId};
