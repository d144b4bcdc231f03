use crate::{
    engine::Grid,
    symbols::{SymbolId, SymbolTable},
};
use serde::{Deserialize, Serialize};

pub type Payline = [usize; 3];

/// Three rows, then both diagonals.
pub const PAYLINES: [Payline; 5] = [[0, 1, 2], [3, 4, 5], [6, 7, 8], [0, 4, 8], [2, 4, 6]];

/// XP granted for every spin, win or lose.
pub const BASE_SPIN_XP: u64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineWin {
    /// Index into [`PAYLINES`].
    pub line: usize,
    pub symbol: SymbolId,
    pub gold: f64,
    pub xp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payout {
    pub gold: f64,
    pub xp: u64,
    pub lines: Vec<LineWin>,
}

/// The symbol a payline pays for, if any.
///
/// Three wilds pay as the wild itself. Otherwise every non-wild cell must
/// carry the same symbol, with wilds filling the remaining cells.
pub fn line_symbol(cells: [SymbolId; 3], table: &SymbolTable) -> Option<SymbolId> {
    let mut paying: Option<SymbolId> = None;
    for id in cells {
        if table.is_wild(id) {
            continue;
        }
        match paying {
            None => paying = Some(id),
            Some(p) if p == id => {}
            Some(_) => return None,
        }
    }
    paying.or_else(|| table.wild())
}

/// Score a grid. `multiplier` scales gold only, never XP.
pub fn evaluate(grid: &Grid, table: &SymbolTable, multiplier: f64) -> Payout {
    let mut payout = Payout {
        gold: 0.0,
        xp: BASE_SPIN_XP,
        lines: Vec::new(),
    };
    for (line, positions) in PAYLINES.iter().enumerate() {
        let cells = positions.map(|pos| grid.cell(pos));
        let Some(symbol) = line_symbol(cells, table) else {
            continue;
        };
        let base = table.get(symbol);
        let win = LineWin {
            line,
            symbol,
            gold: base.gold * multiplier,
            xp: base.xp,
        };
        payout.gold += win.gold;
        payout.xp += win.xp;
        payout.lines.push(win);
    }
    payout
}
