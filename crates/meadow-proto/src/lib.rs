//! Meadow wire protocol
//!
//! Text-framed JSON messages exchanged between a Meadow client and the farm
//! simulation authority over a duplex connection.
//!
//! # Messages
//!
//! - Client → server: the literal [`STATE_REQUEST`] token, or a
//!   [`Command`] object tagged by `action`.
//! - Server → client: an [`Inbound`] object tagged by `type`, carrying a full
//!   replacement [`Snapshot`] and/or an error string.
//!
//! Every inbound message is untrusted. [`Inbound::decode`] checks the
//! discriminant and the shape of every field it uses and rejects anything
//! outside the closed schema with a [`ProtocolError`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod errors;
pub mod inbound;
pub mod outbound;
pub mod snapshot;

pub use errors::{ProtocolError, Result};
pub use inbound::{ActionOutcome, Inbound, InboundKind};
pub use outbound::{Command, Outbound, STATE_REQUEST};
pub use snapshot::{Animal, Disease, Snapshot};
