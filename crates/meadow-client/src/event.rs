//! Client events and actions.

use meadow_core::{Fault, TransportId};

use crate::status::ConnectionStatus;

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Reporting what its transports do, tagged with the transport's id
/// - Driving time forward via ticks
/// - Forwarding user intents
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Begin connecting.
    Start,

    /// A transport completed its handshake.
    TransportOpened {
        /// Transport that opened.
        id: TransportId,
    },

    /// A transport delivered a text frame.
    TransportMessage {
        /// Transport that received the frame.
        id: TransportId,
        /// Frame text.
        text: String,
    },

    /// A transport closed, for any reason.
    TransportClosed {
        /// Transport that closed.
        id: TransportId,
        /// Close reason, possibly empty.
        reason: String,
    },

    /// A transport failed.
    TransportError {
        /// Transport that failed.
        id: TransportId,
        /// Failure description.
        detail: String,
    },

    /// Time tick for the reconnect timer.
    ///
    /// The caller should tick at least at [`Client::next_deadline`](crate::Client::next_deadline).
    Tick,

    /// Purchase feed.
    BuyFeed {
        /// Units of feed.
        amount: u32,
    },

    /// Sell a held resource.
    Sell {
        /// Resource key.
        item: String,
        /// Units to sell.
        quantity: u32,
    },

    /// Breed two animals.
    Breed {
        /// First parent's name.
        first: String,
        /// Second parent's name.
        second: String,
    },

    /// Purchase an animal.
    BuyAnimal {
        /// Species tag.
        kind: String,
        /// Name for the new animal.
        name: String,
    },

    /// Feed every animal.
    FeedAnimals,

    /// Ask the authority for a fresh snapshot.
    RefreshState,

    /// Force a new connection now.
    Reconnect,

    /// Clear the displayed error.
    DismissError,

    /// Tear down without reconnecting.
    Shutdown,

    /// Tear down, forget everything, return to idle.
    Reset,
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientAction {
    /// Connect a new transport.
    OpenTransport {
        /// Identity its events must carry.
        id: TransportId,
        /// Where to connect.
        endpoint: String,
    },

    /// Write a text frame.
    Send {
        /// Transport to write on.
        id: TransportId,
        /// Frame text.
        text: String,
    },

    /// Tear down a transport.
    ///
    /// The caller reports the resulting close back as
    /// [`ClientEvent::TransportClosed`].
    CloseTransport {
        /// Transport to close.
        id: TransportId,
        /// Reason for closing.
        reason: String,
    },

    /// The stored snapshot changed.
    StateChanged {
        /// Store revision after the change.
        revision: u64,
    },

    /// The connection status changed.
    StatusChanged(ConnectionStatus),

    /// Informational message from the authority.
    Notice(String),

    /// A fault was recorded.
    Fault(Fault),
}
