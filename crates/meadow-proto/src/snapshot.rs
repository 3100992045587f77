//! Remote state snapshot.
//!
//! A [`Snapshot`] is the full replacement representation of the simulation at
//! one point in time. The client never merges snapshots; each accepted one
//! replaces the previous wholesale.
//!
//! Only `resources`, `animals` and `total_days` are required. The remaining
//! well-known fields default when absent, and any field this crate does not
//! model is kept in `extra` so that a decoded snapshot re-encodes to the same
//! JSON object.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Resource key holding the farm's funds.
pub const MONEY: &str = "money";

/// Full replacement snapshot of remote simulation state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Resource counters (`eggs`, `milk`, `slop`, `feed`, `money`, ...).
    pub resources: BTreeMap<String, f64>,
    /// Animals in authority order.
    pub animals: Vec<Animal>,
    /// Current weather tag.
    #[serde(default)]
    pub weather: String,
    /// Current market price per sellable item.
    #[serde(default)]
    pub market_prices: BTreeMap<String, f64>,
    /// Earned achievement identifiers.
    #[serde(default)]
    pub achievements: Vec<String>,
    /// Active disease outbreaks.
    #[serde(default)]
    pub diseases: Vec<Disease>,
    /// Past market prices, oldest first.
    #[serde(default)]
    pub market_history: Vec<BTreeMap<String, f64>>,
    /// Simulated day counter.
    pub total_days: u64,
    /// Fields not modelled above, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Snapshot {
    /// Held quantity of a resource. Absent resources hold zero.
    pub fn holding(&self, item: &str) -> f64 {
        self.resources.get(item).copied().unwrap_or(0.0)
    }

    /// Funds, if the authority reported them.
    pub fn funds(&self) -> Option<f64> {
        self.resources.get(MONEY).copied()
    }

    /// Animal with the given name. `None` if absent.
    pub fn animal(&self, name: &str) -> Option<&Animal> {
        self.animals.iter().find(|a| a.name == name)
    }
}

/// A single animal record.
///
/// Animals are addressed by `name`. Names are not guaranteed unique: the
/// authority names offspring after the herd size, so a lookup resolves to
/// the first match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    /// Name used to address the animal in commands.
    pub name: String,
    /// Species tag (`chicken`, `cow`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Health, 0-100 in the reference authority.
    pub health: f64,
    /// Hunger, 0 is fully fed.
    pub hunger: f64,
    /// Extra per-animal fields (`age`, `last_breeding_day`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Animal {
    /// Create an animal record with no extra fields.
    pub fn new(name: impl Into<String>, kind: impl Into<String>, health: f64, hunger: f64) -> Self {
        Self { name: name.into(), kind: kind.into(), health, hunger, extra: Map::new() }
    }
}

/// A disease outbreak record.
///
/// Authorities disagree on the field naming (`animal` vs `animal_name`), so
/// everything except the disease type is kept verbatim and read through
/// accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disease {
    /// Disease tag (`avian_flu`, `hoof_rot`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Disease {
    /// Name of the infected animal, if reported.
    pub fn animal_name(&self) -> Option<&str> {
        self.extra.get("animal_name").or_else(|| self.extra.get("animal")).and_then(Value::as_str)
    }

    /// Severity, if reported.
    pub fn severity(&self) -> Option<f64> {
        self.extra.get("severity").and_then(Value::as_f64)
    }
}
