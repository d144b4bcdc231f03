use doubloon_core::{spin_once, SeededRolls, SymbolTable};

fn main() {
    // Example seeded spin at a stake of 1
    let table = SymbolTable::pirate_default();
    let mut rolls = SeededRolls::new("example-server-seed", "example-client-seed", 1);
    let outcome = spin_once(&table, &mut rolls, 1.0);
    for row in outcome.grid.names(&table) {
        println!("{}", row.join(" "));
    }
    println!(
        "gold={} xp={} lines={:?}",
        outcome.gold,
        outcome.xp,
        outcome.lines.iter().map(|w| w.line).collect::<Vec<_>>()
    );
}
