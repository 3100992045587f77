//! Plain-text rendering of a snapshot.

use std::fmt::Write as _;

use meadow_proto::Snapshot;

/// Multi-line farm summary: day and weather, resources, then one line per
/// animal.
pub fn farm(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    let weather = if snapshot.weather.is_empty() { "unknown" } else { &snapshot.weather };
    let _ = writeln!(out, "day {} ({weather})", snapshot.total_days);

    let resources: Vec<String> =
        snapshot.resources.iter().map(|(name, value)| format!("{name}={value}")).collect();
    let _ = writeln!(out, "resources: {}", resources.join(" "));

    if !snapshot.market_prices.is_empty() {
        let prices: Vec<String> = snapshot
            .market_prices
            .iter()
            .map(|(item, price)| format!("{item}=${price:.2}"))
            .collect();
        let _ = writeln!(out, "market: {}", prices.join(" "));
    }

    if snapshot.animals.is_empty() {
        out.push_str("no animals\n");
    }
    for animal in &snapshot.animals {
        let sick = snapshot.diseases.iter().any(|d| d.animal_name() == Some(animal.name.as_str()));
        let _ = writeln!(
            out,
            "  {:<20} {:<8} health {:>5.1} hunger {:>5.1}{}",
            animal.name,
            animal.kind,
            animal.health,
            animal.hunger,
            if sick { "  (sick)" } else { "" }
        );
    }

    if !snapshot.achievements.is_empty() {
        let _ = writeln!(out, "achievements: {}", snapshot.achievements.join(", "));
    }

    out
}
