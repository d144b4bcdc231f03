pub mod config;
pub mod engine;
pub mod paylines;
pub mod progression;
pub mod rng;
pub mod store;
pub mod symbols;
pub mod wager;

pub use crate::config::GameConfig;
pub use crate::engine::{spin_grid, spin_once, Grid, SpinOutcome, GRID_CELLS, GRID_SIDE};
pub use crate::paylines::{evaluate, LineWin, Payout, BASE_SPIN_XP, PAYLINES};
pub use crate::progression::{
    apply_boost, apply_xp, gold_boost_percent, progress_bar, title, xp_for_level,
    ProgressionSummary,
};
pub use crate::rng::{derive_floats, CycleRolls, EntropyRolls, RollSource, SeededRolls};
pub use crate::store::{LeaderboardEntry, MemoryProfileStore, Profile, ProfileStore, StoreError};
pub use crate::symbols::{Symbol, SymbolId, SymbolTable, TableError};
pub use crate::wager::{
    BonusResult, GameError, PendingBonus, SpinRecord, SpinResult, WagerEngine, WagerResult,
};
