//! Operations for model-based testing.
//!
//! Operations represent everything that can happen to a client: user
//! intents, lifecycle calls, time passing and network trouble. They are
//! generated randomly (by proptest or a fuzzer) and applied through
//! [`SimDriver::apply`](crate::SimDriver::apply).

use arbitrary::Arbitrary;
use meadow_client::ClientEvent;

/// Animal names operations draw from. The first two exist on the starter
/// farm.
pub const NAMES: [&str; 6] = ["Clucky", "Bessie", "Henrietta", "Daisy", "Nugget", "Buttercup"];

/// Index into [`NAMES`] (wraps).
#[derive(Debug, Clone, Copy, Arbitrary)]
pub struct NameSlot(pub u8);

impl NameSlot {
    /// The name this slot selects.
    pub fn name(self) -> &'static str {
        NAMES[usize::from(self.0) % NAMES.len()]
    }
}

/// Sellable item, including one the authority does not trade.
#[derive(Debug, Clone, Copy, Arbitrary)]
pub enum Item {
    /// Laid by chickens.
    Eggs,
    /// Produced by cows.
    Milk,
    /// Bought with money.
    Feed,
    /// Not traded.
    Wool,
}

impl Item {
    /// Resource key.
    pub fn key(self) -> &'static str {
        match self {
            Self::Eggs => "eggs",
            Self::Milk => "milk",
            Self::Feed => "feed",
            Self::Wool => "wool",
        }
    }
}

/// Species tag, including one the catalog does not sell.
#[derive(Debug, Clone, Copy, Arbitrary)]
pub enum Species {
    /// Costs 50.
    Chicken,
    /// Costs 200.
    Cow,
    /// Not sold.
    Pig,
}

impl Species {
    /// Wire tag.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Chicken => "chicken",
            Self::Cow => "cow",
            Self::Pig => "pig",
        }
    }
}

/// Operations that can be applied to a simulated client.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Begin connecting.
    Start,
    /// Purchase feed. Zero and values above the limit are invalid.
    BuyFeed {
        /// Units requested.
        amount: u8,
    },
    /// Sell a resource.
    Sell {
        /// Item to sell.
        item: Item,
        /// Units to sell.
        quantity: u8,
    },
    /// Breed two animals.
    Breed {
        /// First parent.
        first: NameSlot,
        /// Second parent.
        second: NameSlot,
    },
    /// Purchase an animal.
    BuyAnimal {
        /// Species to buy.
        species: Species,
        /// Name to give it.
        name: NameSlot,
    },
    /// Feed every animal.
    FeedAnimals,
    /// Ask for a fresh snapshot.
    Refresh,
    /// Force a reconnect.
    Reconnect,
    /// Clear the displayed error.
    DismissError,
    /// Tear down without reconnecting.
    Shutdown,
    /// Hard reset.
    Reset,
    /// The authority advances a day and pushes a `state_update`.
    AdvanceDay,
    /// Advance simulation time.
    AdvanceTime {
        /// Milliseconds to advance.
        millis: u16,
    },
    /// The authority pushes a frame that is not valid JSON.
    InjectGarbage,
    /// The live connection breaks.
    DropConnection,
    /// Every later connection attempt fails until restored.
    NetworkDown,
    /// Connection attempts succeed again.
    NetworkUp,
}

impl Operation {
    /// The client event this operation submits, if it is a direct client
    /// call.
    pub fn client_event(&self) -> Option<ClientEvent> {
        let event = match *self {
            Self::Start => ClientEvent::Start,
            Self::BuyFeed { amount } => ClientEvent::BuyFeed { amount: u32::from(amount) },
            Self::Sell { item, quantity } => {
                ClientEvent::Sell { item: item.key().to_string(), quantity: u32::from(quantity) }
            },
            Self::Breed { first, second } => ClientEvent::Breed {
                first: first.name().to_string(),
                second: second.name().to_string(),
            },
            Self::BuyAnimal { species, name } => ClientEvent::BuyAnimal {
                kind: species.tag().to_string(),
                name: name.name().to_string(),
            },
            Self::FeedAnimals => ClientEvent::FeedAnimals,
            Self::Refresh => ClientEvent::RefreshState,
            Self::Reconnect => ClientEvent::Reconnect,
            Self::DismissError => ClientEvent::DismissError,
            Self::Shutdown => ClientEvent::Shutdown,
            Self::Reset => ClientEvent::Reset,
            Self::AdvanceDay
            | Self::AdvanceTime { .. }
            | Self::InjectGarbage
            | Self::DropConnection
            | Self::NetworkDown
            | Self::NetworkUp => return None,
        };
        Some(event)
    }
}
