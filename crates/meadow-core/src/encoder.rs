//! User intent validation.
//!
//! Turns intents into [`ValidatedCommand`]s after checking them against the
//! current snapshot. A `ValidatedCommand` can only be built here, and
//! [`Session::send`](crate::Session::send) only accepts a `ValidatedCommand`,
//! so nothing that fails these checks can reach the transport.
//!
//! The checks mirror the authority's rules closely enough to catch obvious
//! mistakes early. The authority stays the source of truth and may still
//! refuse a command that passed here.

use std::collections::BTreeMap;

use meadow_proto::{Command, Snapshot};

use crate::error::{CombinationFault, NameFault, ValidationError};

/// Largest feed purchase accepted in one command.
pub const DEFAULT_MAX_FEED_PURCHASE: u32 = 100;

/// Longest animal name accepted, in characters.
pub const DEFAULT_MAX_NAME_LEN: usize = 20;

/// A command that passed local validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCommand(Command);

impl ValidatedCommand {
    pub(crate) fn new(command: Command) -> Self {
        Self(command)
    }

    /// The wire command.
    pub fn command(&self) -> &Command {
        &self.0
    }

    /// Wire name of the command.
    pub fn kind(&self) -> &'static str {
        self.0.kind()
    }

    /// Consume into the wire command.
    pub fn into_command(self) -> Command {
        self.0
    }
}

/// Animal species the authority sells, with prices.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    prices: BTreeMap<String, f64>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new([("chicken", 50.0), ("cow", 200.0)])
    }
}

impl Catalog {
    /// Catalog from `(species, price)` pairs.
    pub fn new<K: Into<String>>(entries: impl IntoIterator<Item = (K, f64)>) -> Self {
        Self { prices: entries.into_iter().map(|(k, p)| (k.into(), p)).collect() }
    }

    /// Price of a species. `None` if not sold.
    pub fn price(&self, kind: &str) -> Option<f64> {
        self.prices.get(kind).copied()
    }

    /// Species on sale, sorted.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.prices.keys().map(String::as_str)
    }
}

/// Encoder configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    /// Upper bound for `buy_feed`
    pub max_feed_purchase: u32,
    /// Upper bound for new animal names, in characters
    pub max_name_len: usize,
    /// Purchasable species
    pub catalog: Catalog,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            max_feed_purchase: DEFAULT_MAX_FEED_PURCHASE,
            max_name_len: DEFAULT_MAX_NAME_LEN,
            catalog: Catalog::default(),
        }
    }
}

/// Validates intents against a snapshot.
#[derive(Debug, Clone, Default)]
pub struct CommandEncoder {
    config: EncoderConfig,
}

impl CommandEncoder {
    /// Create an encoder.
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Purchase `amount` units of feed. Funds are left to the authority.
    ///
    /// # Errors
    ///
    /// - `ValidationError::InvalidAmount` unless `1 <= amount <= max_feed_purchase`
    pub fn buy_feed(&self, amount: u32) -> Result<ValidatedCommand, ValidationError> {
        let max = self.config.max_feed_purchase;
        if !(1..=max).contains(&amount) {
            return Err(ValidationError::InvalidAmount { amount, max });
        }
        Ok(ValidatedCommand::new(Command::BuyFeed { amount }))
    }

    /// Sell `quantity` units of `item`.
    ///
    /// # Errors
    ///
    /// - `ValidationError::ZeroQuantity` if `quantity` is zero
    /// - `ValidationError::InsufficientHolding` if more than held
    pub fn sell(
        &self,
        snapshot: &Snapshot,
        item: &str,
        quantity: u32,
    ) -> Result<ValidatedCommand, ValidationError> {
        if quantity == 0 {
            return Err(ValidationError::ZeroQuantity { item: item.to_string() });
        }

        let held = snapshot.holding(item);
        if f64::from(quantity) > held {
            return Err(ValidationError::InsufficientHolding {
                item: item.to_string(),
                requested: quantity,
                held,
            });
        }

        Ok(ValidatedCommand::new(Command::Sell { item: item.to_string(), quantity }))
    }

    /// Breed two animals.
    ///
    /// # Errors
    ///
    /// - `ValidationError::InvalidCombination` with `Identical` if both names
    ///   are the same, `NotFound` if either is absent, `TypeMismatch` if the
    ///   species differ
    pub fn breed(
        &self,
        snapshot: &Snapshot,
        first: &str,
        second: &str,
    ) -> Result<ValidatedCommand, ValidationError> {
        if first == second {
            return Err(CombinationFault::Identical.into());
        }

        let lookup = |name: &str| {
            snapshot.animal(name).ok_or_else(|| CombinationFault::NotFound(name.to_string()))
        };
        let a = lookup(first)?;
        let b = lookup(second)?;

        if a.kind != b.kind {
            let fault =
                CombinationFault::TypeMismatch { first: a.kind.clone(), second: b.kind.clone() };
            return Err(fault.into());
        }

        Ok(ValidatedCommand::new(Command::Breed {
            animal1: first.to_string(),
            animal2: second.to_string(),
        }))
    }

    /// Purchase a new animal. The name is trimmed before it is checked and
    /// sent.
    ///
    /// # Errors
    ///
    /// - `ValidationError::InvalidName` if empty or too long
    /// - `ValidationError::UnknownAnimalType` if `kind` is not in the catalog
    /// - `ValidationError::InsufficientFunds` if the snapshot reports funds
    ///   below the price
    pub fn buy_animal(
        &self,
        snapshot: &Snapshot,
        kind: &str,
        name: &str,
    ) -> Result<ValidatedCommand, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(NameFault::Empty.into());
        }
        let len = name.chars().count();
        if len > self.config.max_name_len {
            return Err(NameFault::TooLong { len, max: self.config.max_name_len }.into());
        }

        let price = self
            .config
            .catalog
            .price(kind)
            .ok_or_else(|| ValidationError::UnknownAnimalType(kind.to_string()))?;

        match snapshot.funds() {
            Some(available) if available < price => {
                Err(ValidationError::InsufficientFunds { required: price, available })
            },
            _ => Ok(ValidatedCommand::new(Command::BuyAnimal {
                kind: kind.to_string(),
                name: name.to_string(),
            })),
        }
    }

    /// Feed every animal. Always valid; the authority decides what happens
    /// when feed runs short.
    pub fn feed_animals(&self) -> ValidatedCommand {
        ValidatedCommand::new(Command::FeedAnimals)
    }
}

#[cfg(test)]
mod tests {
    use meadow_proto::Animal;

    use super::*;

    fn farm() -> Snapshot {
        Snapshot {
            resources: [("eggs".to_string(), 5.0), ("money".to_string(), 120.0)].into(),
            animals: vec![
                Animal::new("Clucky", "chicken", 100.0, 0.0),
                Animal::new("Henny", "chicken", 90.0, 10.0),
                Animal::new("Bessie", "cow", 100.0, 0.0),
            ],
            total_days: 3,
            ..Snapshot::default()
        }
    }

    #[test]
    fn buy_feed_bounds() {
        let encoder = CommandEncoder::default();

        assert_eq!(encoder.buy_feed(1).unwrap().into_command(), Command::BuyFeed { amount: 1 });
        assert!(encoder.buy_feed(100).is_ok());
        assert_eq!(
            encoder.buy_feed(0),
            Err(ValidationError::InvalidAmount { amount: 0, max: 100 })
        );
        assert_eq!(
            encoder.buy_feed(101),
            Err(ValidationError::InvalidAmount { amount: 101, max: 100 })
        );
    }

    #[test]
    fn sell_boundary_at_holding() {
        let encoder = CommandEncoder::default();
        let snapshot = farm();

        let cmd = encoder.sell(&snapshot, "eggs", 5).unwrap();
        assert_eq!(cmd.command(), &Command::Sell { item: "eggs".into(), quantity: 5 });

        assert_eq!(
            encoder.sell(&snapshot, "eggs", 6),
            Err(ValidationError::InsufficientHolding {
                item: "eggs".into(),
                requested: 6,
                held: 5.0,
            })
        );
        assert_eq!(
            encoder.sell(&snapshot, "milk", 1),
            Err(ValidationError::InsufficientHolding {
                item: "milk".into(),
                requested: 1,
                held: 0.0,
            })
        );
        assert_eq!(
            encoder.sell(&snapshot, "eggs", 0),
            Err(ValidationError::ZeroQuantity { item: "eggs".into() })
        );
    }

    #[test]
    fn breed_reasons_are_distinct() {
        let encoder = CommandEncoder::default();
        let snapshot = farm();

        assert_eq!(
            encoder.breed(&snapshot, "Clucky", "Clucky"),
            Err(ValidationError::InvalidCombination(CombinationFault::Identical))
        );
        assert_eq!(
            encoder.breed(&snapshot, "Clucky", "Bessie"),
            Err(ValidationError::InvalidCombination(CombinationFault::TypeMismatch {
                first: "chicken".into(),
                second: "cow".into(),
            }))
        );
        assert_eq!(
            encoder.breed(&snapshot, "Clucky", "Daisy"),
            Err(ValidationError::InvalidCombination(CombinationFault::NotFound("Daisy".into())))
        );

        let cmd = encoder.breed(&snapshot, "Clucky", "Henny").unwrap();
        assert_eq!(cmd.into_command(), Command::Breed {
            animal1: "Clucky".into(),
            animal2: "Henny".into()
        });
    }

    #[test]
    fn buy_animal_trims_and_checks_name() {
        let encoder = CommandEncoder::default();
        let snapshot = farm();

        let cmd = encoder.buy_animal(&snapshot, "chicken", "  Henrietta ").unwrap();
        assert_eq!(cmd.into_command(), Command::BuyAnimal {
            kind: "chicken".into(),
            name: "Henrietta".into()
        });

        assert_eq!(
            encoder.buy_animal(&snapshot, "chicken", "   "),
            Err(ValidationError::InvalidName(NameFault::Empty))
        );
        assert!(encoder.buy_animal(&snapshot, "chicken", &"a".repeat(20)).is_ok());
        assert_eq!(
            encoder.buy_animal(&snapshot, "chicken", &"a".repeat(21)),
            Err(ValidationError::InvalidName(NameFault::TooLong { len: 21, max: 20 }))
        );
    }

    #[test]
    fn buy_animal_checks_catalog_and_funds() {
        let encoder = CommandEncoder::default();
        let snapshot = farm();

        assert_eq!(
            encoder.buy_animal(&snapshot, "pig", "Wilbur"),
            Err(ValidationError::UnknownAnimalType("pig".into()))
        );
        assert_eq!(
            encoder.buy_animal(&snapshot, "cow", "Daisy"),
            Err(ValidationError::InsufficientFunds { required: 200.0, available: 120.0 })
        );

        // Without reported funds the authority decides.
        let mut broke = snapshot.clone();
        broke.resources.remove("money");
        assert!(encoder.buy_animal(&broke, "cow", "Daisy").is_ok());
    }

    #[test]
    fn custom_catalog() {
        let encoder = CommandEncoder::new(EncoderConfig {
            catalog: Catalog::new([("goat", 80.0)]),
            ..EncoderConfig::default()
        });

        assert!(encoder.buy_animal(&farm(), "goat", "Billy").is_ok());
        assert!(encoder.buy_animal(&farm(), "chicken", "Clucky II").is_err());
        assert_eq!(encoder.config().catalog.kinds().collect::<Vec<_>>(), vec!["goat"]);
    }
}
