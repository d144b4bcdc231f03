use serde::{Deserialize, Serialize};

use crate::{
    paylines::{evaluate, LineWin},
    rng::RollSource,
    symbols::{SymbolId, SymbolTable},
};

pub const GRID_SIDE: usize = 3;
pub const GRID_CELLS: usize = GRID_SIDE * GRID_SIDE;

/// Nine drawn cells, row-major: positions 0..3 are the top row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Grid(pub [SymbolId; GRID_CELLS]);

impl Grid {
    pub fn cell(&self, pos: usize) -> SymbolId {
        self.0[pos]
    }

    pub fn rows(&self) -> [[SymbolId; GRID_SIDE]; GRID_SIDE] {
        let mut rows = [[SymbolId(0); GRID_SIDE]; GRID_SIDE];
        for (pos, id) in self.0.iter().enumerate() {
            rows[pos / GRID_SIDE][pos % GRID_SIDE] = *id;
        }
        rows
    }

    pub fn contains_wild(&self, table: &SymbolTable) -> bool {
        self.0.iter().any(|&id| table.is_wild(id))
    }

    /// Build a grid from symbol names, `None` if a name is unknown.
    pub fn from_names(table: &SymbolTable, names: [&str; GRID_CELLS]) -> Option<Self> {
        let mut cells = [SymbolId(0); GRID_CELLS];
        for (cell, name) in cells.iter_mut().zip(names) {
            *cell = table.id_of(name)?;
        }
        Some(Self(cells))
    }

    pub fn names<'a>(&self, table: &'a SymbolTable) -> Vec<Vec<&'a str>> {
        self.rows()
            .iter()
            .map(|row| row.iter().map(|&id| table.name(id)).collect())
            .collect()
    }
}

/// Raw, pre-boost result of one grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpinOutcome {
    pub grid: Grid,
    pub gold: f64,
    pub xp: u64,
    pub lines: Vec<LineWin>,
}

/// Draw every cell independently from the table's distribution.
pub fn spin_grid<R: RollSource + ?Sized>(table: &SymbolTable, rolls: &mut R) -> Grid {
    let mut cells = [SymbolId(0); GRID_CELLS];
    for cell in cells.iter_mut() {
        *cell = table.draw(rolls.next_roll());
    }
    Grid(cells)
}

pub fn spin_once<R: RollSource + ?Sized>(
    table: &SymbolTable,
    rolls: &mut R,
    multiplier: f64,
) -> SpinOutcome {
    let grid = spin_grid(table, rolls);
    let payout = evaluate(&grid, table, multiplier);
    SpinOutcome {
        grid,
        gold: payout.gold,
        xp: payout.xp,
        lines: payout.lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::{CycleRolls, SeededRolls};

    #[test]
    fn test_spin_deterministic() {
        let table = SymbolTable::pirate_default();
        let out1 = spin_once(&table, &mut SeededRolls::new("server", "client", 1), 1.0);
        let out2 = spin_once(&table, &mut SeededRolls::new("server", "client", 1), 1.0);
        assert_eq!(out1, out2);
    }

    #[test]
    fn spin_consumes_one_roll_per_cell() {
        let table = SymbolTable::pirate_default();
        let rolls: Vec<f64> = vec![0.0, 0.5, 0.7, 0.9, 0.99, 0.0, 0.5, 0.7, 0.9];
        let grid = spin_grid(&table, &mut CycleRolls::new(rolls));
        assert_eq!(
            grid.names(&table),
            vec![
                vec!["rumtankard", "rumbottle", "rumbarrel"],
                vec!["chest", "nigel", "rumtankard"],
                vec!["rumbottle", "rumbarrel", "chest"],
            ]
        );
        assert!(grid.contains_wild(&table));
    }

    #[test]
    fn from_names_rejects_unknown_symbols() {
        let table = SymbolTable::pirate_default();
        assert!(Grid::from_names(&table, ["chest"; GRID_CELLS]).is_some());
        assert!(Grid::from_names(&table, ["parrot"; GRID_CELLS]).is_none());
    }
}
