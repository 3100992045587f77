//! In-memory farm authority for simulation tests.
//!
//! `ScriptedAuthority` answers client frames the way the reference farm
//! server does: `STATE` yields the current snapshot, every command yields an
//! `action_result` carrying a `success` or `error` message together with the
//! full state, and anything unparseable yields an `error` message. It runs a
//! small subset of the farm rules (prices, feeding, breeding cooldowns) so
//! commands have observable effects, but no simulation of its own.

use std::collections::BTreeMap;

use meadow_proto::{
    ActionOutcome, Animal, Command, Inbound, Outbound, ProtocolError, Snapshot,
    snapshot::MONEY,
};

/// Price of each purchasable species.
const ANIMAL_COSTS: [(&str, f64); 2] = [("chicken", 50.0), ("cow", 200.0)];

/// Days a parent rests after breeding.
const BREEDING_COOLDOWN: u32 = 5;

/// Hunger above which an animal will not breed.
const MAX_BREEDING_HUNGER: f64 = 3.0;

/// Starting farm of the reference authority.
pub fn starter_farm() -> Snapshot {
    let prices: BTreeMap<String, f64> =
        [("eggs", 1.5), ("milk", 3.0), ("feed", 0.75)].map(|(k, v)| (k.to_string(), v)).into();

    Snapshot {
        resources: [("eggs", 5.0), ("milk", 2.0), ("feed", 100.0), (MONEY, 200.0)]
            .map(|(k, v)| (k.to_string(), v))
            .into(),
        animals: vec![
            Animal::new("Clucky", "chicken", 100.0, 0.0),
            Animal::new("Bessie", "cow", 100.0, 0.0),
        ],
        weather: "sunny".to_string(),
        market_history: vec![prices.clone()],
        market_prices: prices,
        total_days: 0,
        ..Snapshot::default()
    }
}

/// Fake authority driven frame by frame.
#[derive(Debug, Clone)]
pub struct ScriptedAuthority {
    farm: Snapshot,
    cooldowns: BTreeMap<String, u32>,
    greet_on_connect: bool,
    received: Vec<Outbound>,
}

impl Default for ScriptedAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedAuthority {
    /// Authority holding [`starter_farm`].
    pub fn new() -> Self {
        Self::with_farm(starter_farm())
    }

    /// Authority holding `farm`.
    pub fn with_farm(farm: Snapshot) -> Self {
        Self { farm, cooldowns: BTreeMap::new(), greet_on_connect: false, received: Vec::new() }
    }

    /// Push `initial_state` as soon as a connection is accepted, before the
    /// client asks.
    #[must_use]
    pub fn greeting(mut self, enabled: bool) -> Self {
        self.greet_on_connect = enabled;
        self
    }

    /// Current authoritative state.
    pub fn farm(&self) -> &Snapshot {
        &self.farm
    }

    /// Replace the authoritative state.
    pub fn set_farm(&mut self, farm: Snapshot) {
        self.farm = farm;
    }

    /// Every well-formed frame received so far, in order.
    pub fn received(&self) -> &[Outbound] {
        &self.received
    }

    /// Commands received so far, without state requests.
    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.received.iter().filter_map(|frame| match frame {
            Outbound::Command(cmd) => Some(cmd),
            Outbound::StateRequest => None,
        })
    }

    /// Frames to send when a connection is accepted.
    pub fn on_connect(&self) -> Result<Vec<String>, ProtocolError> {
        if self.greet_on_connect {
            Ok(vec![Inbound::InitialState { state: self.farm.clone() }.encode()?])
        } else {
            Ok(Vec::new())
        }
    }

    /// Answer one client frame.
    ///
    /// # Errors
    ///
    /// `ProtocolError` only if a response fails to encode.
    pub fn handle(&mut self, text: &str) -> Result<Vec<String>, ProtocolError> {
        let reply = match Outbound::decode(text) {
            Ok(Outbound::StateRequest) => {
                self.received.push(Outbound::StateRequest);
                Inbound::InitialState { state: self.farm.clone() }
            },
            Ok(Outbound::Command(cmd)) => {
                let outcome = self.apply(&cmd);
                tracing::debug!(kind = cmd.kind(), ?outcome, "authority applied command");
                self.received.push(Outbound::Command(cmd));
                Inbound::ActionResult { state: self.farm.clone(), outcome: Some(outcome) }
            },
            Err(e) => {
                tracing::debug!(error = %e, "authority rejected frame");
                Inbound::Error {
                    message: "Invalid JSON".to_string(),
                    state: Some(self.farm.clone()),
                }
            },
        };

        Ok(vec![reply.encode()?])
    }

    /// Advance one simulated day and return the resulting `state_update`.
    ///
    /// Animals get hungrier and breeding cooldowns tick down.
    pub fn advance_day(&mut self) -> Result<String, ProtocolError> {
        self.farm.total_days += 1;
        for animal in &mut self.farm.animals {
            animal.hunger = (animal.hunger + 1.0).min(10.0);
        }
        for days in self.cooldowns.values_mut() {
            *days = days.saturating_sub(1);
        }
        self.cooldowns.retain(|_, days| *days > 0);

        Inbound::StateUpdate { state: self.farm.clone() }.encode()
    }

    /// Frame the authority sends for an error without a command.
    pub fn fault(&self, message: &str) -> Result<String, ProtocolError> {
        Inbound::Error { message: message.to_string(), state: None }.encode()
    }

    fn apply(&mut self, cmd: &Command) -> ActionOutcome {
        match cmd {
            Command::BuyFeed { amount } => self.buy_feed(*amount),
            Command::FeedAnimals => self.feed_animals(),
            Command::Sell { item, quantity } => self.sell(item, *quantity),
            Command::Breed { animal1, animal2 } => self.breed(animal1, animal2),
            Command::BuyAnimal { kind, name } => self.buy_animal(kind, name),
        }
    }

    fn resource(&mut self, key: &str) -> &mut f64 {
        self.farm.resources.entry(key.to_string()).or_insert(0.0)
    }

    fn buy_feed(&mut self, amount: u32) -> ActionOutcome {
        let price = self.farm.market_prices.get("feed").copied().unwrap_or(0.75);
        let cost = f64::from(amount) * price;
        if self.farm.holding(MONEY) < cost {
            return ActionOutcome::Failure(format!("Need ${cost:.2} to buy feed"));
        }

        *self.resource(MONEY) -= cost;
        *self.resource("feed") += f64::from(amount);
        ActionOutcome::Success(format!("Bought {amount} feed for ${cost:.2}"))
    }

    fn feed_animals(&mut self) -> ActionOutcome {
        let mut feed = self.farm.holding("feed");
        if feed <= 0.0 {
            return ActionOutcome::Failure("No feed available".to_string());
        }

        let mut fed = Vec::new();
        for animal in &mut self.farm.animals {
            if animal.hunger > 0.0 && feed > 0.0 {
                let portion = animal.hunger.min(feed);
                feed -= portion;
                animal.hunger -= portion;
                animal.health = (animal.health + portion * 2.0).min(100.0);
                fed.push(animal.name.clone());
            }
        }
        *self.resource("feed") = feed;

        if fed.is_empty() {
            ActionOutcome::Failure("No hungry animals to feed".to_string())
        } else {
            ActionOutcome::Success(format!("Fed animals: {}", fed.join(", ")))
        }
    }

    fn sell(&mut self, item: &str, quantity: u32) -> ActionOutcome {
        let Some(price) = self.farm.market_prices.get(item).copied() else {
            return ActionOutcome::Failure(format!("Invalid item: {item}"));
        };
        let quantity = f64::from(quantity);
        if self.farm.holding(item) < quantity {
            return ActionOutcome::Failure(format!("Not enough {item}"));
        }

        let earnings = quantity * price;
        *self.resource(item) -= quantity;
        *self.resource(MONEY) += earnings;
        ActionOutcome::Success(format!("Sold {quantity} {item} for ${earnings:.2}"))
    }

    fn breed(&mut self, first: &str, second: &str) -> ActionOutcome {
        let (Some(a), Some(b)) = (self.farm.animal(first), self.farm.animal(second)) else {
            return ActionOutcome::Failure("One or both animals not found".to_string());
        };
        if a.kind != b.kind {
            return ActionOutcome::Failure("Different species can't breed".to_string());
        }
        if a.hunger > MAX_BREEDING_HUNGER || b.hunger > MAX_BREEDING_HUNGER {
            return ActionOutcome::Failure("Animals too hungry to breed".to_string());
        }
        if self.cooldowns.contains_key(first) {
            return ActionOutcome::Failure(format!("{first} needs rest"));
        }

        let kind = a.kind.clone();
        let name = format!("Baby_{kind}_{}", self.farm.animals.len() + 1);
        self.farm.animals.push(Animal::new(name.clone(), kind.clone(), 100.0, 0.0));
        self.cooldowns.insert(first.to_string(), BREEDING_COOLDOWN);
        self.cooldowns.insert(second.to_string(), BREEDING_COOLDOWN);
        ActionOutcome::Success(format!("New {kind} born: {name}"))
    }

    fn buy_animal(&mut self, kind: &str, name: &str) -> ActionOutcome {
        let Some(cost) = ANIMAL_COSTS.iter().find(|(k, _)| *k == kind).map(|(_, c)| *c) else {
            return ActionOutcome::Failure(format!("Invalid animal type: {kind}"));
        };
        if self.farm.holding(MONEY) < cost {
            return ActionOutcome::Failure(format!("Not enough money. Need ${cost}"));
        }
        if self.farm.animal(name).is_some() {
            return ActionOutcome::Failure(format!("An animal named {name} already exists"));
        }

        self.farm.animals.push(Animal::new(name, kind, 100.0, 0.0));
        *self.resource(MONEY) -= cost;
        ActionOutcome::Success(format!("Bought {kind} named {name} for ${cost}"))
    }
}
