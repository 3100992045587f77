//! Client → server messages.
//!
//! The client either requests a fresh snapshot with the bare [`STATE_REQUEST`]
//! token or sends a [`Command`] object tagged by `action`.

use serde::{Deserialize, Serialize};

use crate::errors::{ProtocolError, Result};

/// Literal text frame requesting the current snapshot.
pub const STATE_REQUEST: &str = "STATE";

/// A user intent in wire form.
///
/// Field names follow the authority's schema, so `serde_json` produces the
/// exact object the authority expects:
///
/// ```
/// # use meadow_proto::Command;
/// let cmd = Command::BuyFeed { amount: 10 };
/// assert_eq!(serde_json::to_string(&cmd).unwrap(), r#"{"action":"buy_feed","amount":10}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Command {
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
    /// Breed two animals of the same species.
    Breed {
        /// First parent's name.
        animal1: String,
        /// Second parent's name.
        animal2: String,
    },
    /// Purchase a new animal.
    BuyAnimal {
        /// Species tag.
        #[serde(rename = "type")]
        kind: String,
        /// Name for the new animal.
        name: String,
    },
    /// Feed every animal from the feed stock.
    FeedAnimals,
}

impl Command {
    /// Wire name of the `action` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BuyFeed { .. } => "buy_feed",
            Self::Sell { .. } => "sell",
            Self::Breed { .. } => "breed",
            Self::BuyAnimal { .. } => "buy_animal",
            Self::FeedAnimals => "feed_animals",
        }
    }
}

/// A client → server text frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// The bare `STATE` token.
    StateRequest,
    /// A JSON command object.
    Command(Command),
}

impl Outbound {
    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String> {
        match self {
            Self::StateRequest => Ok(STATE_REQUEST.to_string()),
            Self::Command(cmd) => Ok(serde_json::to_string(cmd)?),
        }
    }

    /// Decode a text frame. Used by authorities and test fixtures.
    ///
    /// # Errors
    ///
    /// `ProtocolError::InvalidCommand` if the frame is neither the state token
    /// nor a well-formed command object.
    pub fn decode(raw: &str) -> Result<Self> {
        if raw == STATE_REQUEST {
            return Ok(Self::StateRequest);
        }
        serde_json::from_str(raw)
            .map(Self::Command)
            .map_err(|e| ProtocolError::InvalidCommand(e.to_string()))
    }
}

impl From<Command> for Outbound {
    fn from(cmd: Command) -> Self {
        Self::Command(cmd)
    }
}
