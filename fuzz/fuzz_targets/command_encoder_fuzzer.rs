//! Fuzz target for CommandEncoder
//!
//! # Strategy
//!
//! - Snapshot: a small farm with arbitrary holdings and funds
//! - Intents: arbitrary amounts, quantities, names (including whitespace and
//!   oversized names) and species tags
//!
//! # Invariants
//!
//! - A validated sale never exceeds the held quantity
//! - A validated purchase never exceeds known funds
//! - Validated names are trimmed, non-empty and within the length limit
//! - Every validated command encodes

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use meadow_core::{CommandEncoder, EncoderConfig};
use meadow_proto::{Animal, Command, Outbound, Snapshot};

#[derive(Debug, Arbitrary)]
struct Farm {
    eggs: u16,
    money: Option<u16>,
    animals: Vec<(String, bool)>,
}

#[derive(Debug, Arbitrary)]
enum Intent {
    BuyFeed(u32),
    Sell { eggs: bool, quantity: u32 },
    Breed(String, String),
    BuyAnimal { kind: String, name: String },
}

fuzz_target!(|input: (Farm, Vec<Intent>)| {
    let (farm, intents) = input;

    let mut snapshot = Snapshot::default();
    snapshot.resources.insert("eggs".into(), f64::from(farm.eggs));
    if let Some(money) = farm.money {
        snapshot.resources.insert("money".into(), f64::from(money));
    }
    for (name, chicken) in farm.animals.into_iter().take(8) {
        let kind = if chicken { "chicken" } else { "cow" };
        snapshot.animals.push(Animal::new(name, kind, 100.0, 0.0));
    }

    let encoder = CommandEncoder::new(EncoderConfig::default());
    let max_name_len = encoder.config().max_name_len;

    for intent in intents {
        let result = match &intent {
            Intent::BuyFeed(amount) => encoder.buy_feed(*amount),
            Intent::Sell { eggs, quantity } => {
                let item = if *eggs { "eggs" } else { "milk" };
                encoder.sell(&snapshot, item, *quantity)
            },
            Intent::Breed(first, second) => encoder.breed(&snapshot, first, second),
            Intent::BuyAnimal { kind, name } => encoder.buy_animal(&snapshot, kind, name),
        };
        let Ok(validated) = result else {
            continue;
        };

        match validated.command() {
            Command::Sell { item, quantity } => {
                assert!(*quantity > 0);
                assert!(f64::from(*quantity) <= snapshot.holding(item));
            },
            Command::BuyAnimal { kind, name } => {
                assert_eq!(name.trim(), name);
                assert!(!name.is_empty());
                assert!(name.chars().count() <= max_name_len);
                let price = encoder.config().catalog.price(kind).expect("catalog kind");
                if let Some(funds) = snapshot.funds() {
                    assert!(price <= funds);
                }
            },
            Command::Breed { animal1, animal2 } => {
                assert_ne!(animal1, animal2);
                let a = snapshot.animal(animal1).expect("first parent exists");
                let b = snapshot.animal(animal2).expect("second parent exists");
                assert_eq!(a.kind, b.kind);
            },
            Command::BuyFeed { amount } => assert!(*amount > 0),
            Command::FeedAnimals => {},
        }

        Outbound::Command(validated.into_command()).encode().expect("validated command encodes");
    }
});
