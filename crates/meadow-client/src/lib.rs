//! Client
//!
//! Action-based client for a remote farm simulation. Keeps a live mirror of
//! the farm, reconnects when the connection drops, and turns user intents
//! into validated commands.
//!
//! # Architecture
//!
//! The client follows the same Sans-IO and Action-Based patterns as
//! [`meadow_core`]. It receives events ([`ClientEvent`]), processes them
//! through pure state machine logic, and returns actions ([`ClientAction`]) for
//! the caller to execute.
//!
//! # Components
//!
//! - [`Client`]: Session, store and encoder behind one interface
//! - [`ConnectionStatus`]: What the user sees of the connection
//! - [`commands`]: Line command parsing for the `meadow` binary
//! - [`render`]: Plain-text farm summary
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::spawn`]: WebSocket transport task
//! - [`runtime::Runtime`]: Tokio event loop driving a [`Client`]
//! - [`SystemEnv`]: Production environment

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod error;
mod event;
mod status;

pub mod commands;
pub mod render;

#[cfg(feature = "transport")]
pub mod runtime;
#[cfg(feature = "transport")]
mod system_env;
#[cfg(feature = "transport")]
pub mod transport;

pub use client::{Client, ClientConfig};
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent};
pub use meadow_core::{Environment, TransportId};
pub use status::{ConnectionStatus, StatusReport};
#[cfg(feature = "transport")]
pub use system_env::SystemEnv;
