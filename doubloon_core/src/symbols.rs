use serde::{Deserialize, Serialize};

/// Tolerance allowed when checking that draw chances add up to one.
const CHANCE_SUM_TOLERANCE: f64 = 1e-6;

/// Position of a symbol inside its [`SymbolTable`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u8);

impl SymbolId {
    pub fn to_index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Symbol {
    pub name: String,
    pub chance: f64,
    pub gold: f64,
    pub xp: u64,
    #[serde(default)]
    pub is_wild: bool,
}

impl Symbol {
    pub fn new(name: impl Into<String>, chance: f64, gold: f64, xp: u64) -> Self {
        Self {
            name: name.into(),
            chance,
            gold,
            xp,
            is_wild: false,
        }
    }

    pub fn wild(mut self) -> Self {
        self.is_wild = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TableError {
    #[error("symbol table is empty")]
    Empty,
    #[error("symbol table holds {0} symbols, at most 256 are supported")]
    TooManySymbols(usize),
    #[error("symbol `{name}` has draw chance {chance}, expected a value in (0, 1]")]
    InvalidChance { name: String, chance: f64 },
    #[error("draw chances sum to {0}, expected 1.0")]
    ChanceSum(f64),
    #[error("symbol `{0}` is declared more than once")]
    DuplicateName(String),
    #[error("symbol table declares more than one wild (`{0}` and `{1}`)")]
    MultipleWilds(String, String),
}

/// Immutable symbol catalog with its precomputed cumulative draw bounds.
///
/// The declaration order is the draw order: symbol `i` owns the slice of
/// `[0, 1)` between the bounds of symbols `i - 1` and `i`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<Symbol>", into = "Vec<Symbol>")]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    bounds: Vec<f64>,
    wild: Option<SymbolId>,
}

impl SymbolTable {
    pub fn new(symbols: Vec<Symbol>) -> Result<Self, TableError> {
        if symbols.is_empty() {
            return Err(TableError::Empty);
        }
        if symbols.len() > u8::MAX as usize + 1 {
            return Err(TableError::TooManySymbols(symbols.len()));
        }
        let mut wild: Option<&Symbol> = None;
        for (i, s) in symbols.iter().enumerate() {
            if !(s.chance > 0.0 && s.chance <= 1.0) {
                return Err(TableError::InvalidChance {
                    name: s.name.clone(),
                    chance: s.chance,
                });
            }
            if symbols[..i].iter().any(|other| other.name == s.name) {
                return Err(TableError::DuplicateName(s.name.clone()));
            }
            if s.is_wild {
                if let Some(first) = wild {
                    return Err(TableError::MultipleWilds(first.name.clone(), s.name.clone()));
                }
                wild = Some(s);
            }
        }
        let sum: f64 = symbols.iter().map(|s| s.chance).sum();
        if (sum - 1.0).abs() > CHANCE_SUM_TOLERANCE {
            return Err(TableError::ChanceSum(sum));
        }
        Ok(Self::assemble(symbols))
    }

    fn assemble(symbols: Vec<Symbol>) -> Self {
        let mut acc = 0.0;
        let bounds = symbols
            .iter()
            .map(|s| {
                acc += s.chance;
                acc
            })
            .collect();
        let wild = symbols
            .iter()
            .position(|s| s.is_wild)
            .map(|i| SymbolId(i as u8));
        Self {
            symbols,
            bounds,
            wild,
        }
    }

    /// The pirate table used by the live game. Nigel is the wild.
    pub fn pirate_default() -> Self {
        Self::assemble(vec![
            Symbol::new("rumtankard", 0.38, 4.0, 2),
            Symbol::new("rumbottle", 0.27, 7.0, 3),
            Symbol::new("rumbarrel", 0.20, 12.0, 5),
            Symbol::new("chest", 0.12, 18.0, 7),
            Symbol::new("nigel", 0.03, 35.0, 10).wild(),
        ])
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.to_index()]
    }

    pub fn name(&self, id: SymbolId) -> &str {
        &self.get(id).name
    }

    pub fn id_of(&self, name: &str) -> Option<SymbolId> {
        self.symbols
            .iter()
            .position(|s| s.name == name)
            .map(|i| SymbolId(i as u8))
    }

    pub fn wild(&self) -> Option<SymbolId> {
        self.wild
    }

    pub fn is_wild(&self, id: SymbolId) -> bool {
        self.wild == Some(id)
    }

    /// Map a uniform roll in `[0, 1)` to a symbol.
    ///
    /// Returns the first symbol whose cumulative bound is `>= roll`. Rolls
    /// past the last bound (float drift) fall back to the last symbol.
    pub fn draw(&self, roll: f64) -> SymbolId {
        let idx = self
            .bounds
            .iter()
            .position(|&upper| roll <= upper)
            .unwrap_or(self.symbols.len() - 1);
        SymbolId(idx as u8)
    }
}

impl TryFrom<Vec<Symbol>> for SymbolTable {
    type Error = TableError;

    fn try_from(symbols: Vec<Symbol>) -> Result<Self, Self::Error> {
        Self::new(symbols)
    }
}

impl From<SymbolTable> for Vec<Symbol> {
    fn from(table: SymbolTable) -> Self {
        table.symbols
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::pirate_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pirate_table_is_valid() {
        let table = SymbolTable::pirate_default();
        let rebuilt = SymbolTable::new(table.symbols().to_vec()).expect("valid table");
        assert_eq!(rebuilt.wild(), table.wild());
        assert_eq!(table.name(table.wild().unwrap()), "nigel");
    }

    #[test]
    fn draw_follows_cumulative_bounds() {
        let table = SymbolTable::pirate_default();
        assert_eq!(table.name(table.draw(0.0)), "rumtankard");
        assert_eq!(table.name(table.draw(0.38)), "rumtankard");
        assert_eq!(table.name(table.draw(0.3801)), "rumbottle");
        assert_eq!(table.name(table.draw(0.84)), "rumbarrel");
        assert_eq!(table.name(table.draw(0.90)), "chest");
        assert_eq!(table.name(table.draw(0.98)), "nigel");
    }

    #[test]
    fn draw_past_last_bound_falls_back_to_last_symbol() {
        let table = SymbolTable::new(vec![
            Symbol::new("a", 0.5, 1.0, 1),
            Symbol::new("b", 0.4999999, 1.0, 1),
        ])
        .unwrap();
        assert_eq!(table.name(table.draw(0.9999999999)), "b");
    }

    #[test]
    fn rejects_bad_tables() {
        assert_eq!(SymbolTable::new(vec![]).unwrap_err(), TableError::Empty);
        assert!(matches!(
            SymbolTable::new(vec![Symbol::new("a", 0.0, 1.0, 1), Symbol::new("b", 1.0, 1.0, 1)]),
            Err(TableError::InvalidChance { .. })
        ));
        assert!(matches!(
            SymbolTable::new(vec![Symbol::new("a", 0.5, 1.0, 1)]),
            Err(TableError::ChanceSum(_))
        ));
        assert_eq!(
            SymbolTable::new(vec![Symbol::new("a", 0.5, 1.0, 1), Symbol::new("a", 0.5, 1.0, 1)])
                .unwrap_err(),
            TableError::DuplicateName("a".into())
        );
        assert_eq!(
            SymbolTable::new(vec![
                Symbol::new("a", 0.5, 1.0, 1).wild(),
                Symbol::new("b", 0.5, 1.0, 1).wild()
            ])
            .unwrap_err(),
            TableError::MultipleWilds("a".into(), "b".into())
        );
    }

    #[test]
    fn deserializes_through_validation() {
        let json = r#"[
            {"name": "coin", "chance": 0.75, "gold": 1.0, "xp": 1},
            {"name": "parrot", "chance": 0.25, "gold": 9.0, "xp": 4, "is_wild": true}
        ]"#;
        let table: SymbolTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.is_wild(table.id_of("parrot").unwrap()));

        let bad = r#"[{"name": "coin", "chance": 0.5, "gold": 1.0, "xp": 1}]"#;
        assert!(serde_json::from_str::<SymbolTable>(bad).is_err());
    }
}
