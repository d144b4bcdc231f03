use serde::{Deserialize, Serialize};

use crate::progression::DEFAULT_BOOST_CAP_PERCENT;

/// Wager limits and bonus-chain policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Largest stake accepted for a single spin.
    pub max_stake: u64,
    pub max_spins_per_wager: u32,
    /// Bonus spins armed or added whenever a wild lands.
    pub bonus_spins_per_wild: u32,
    /// Hard ceiling on the spins one bonus chain may run.
    pub max_chain_spins: u32,
    pub boost_cap_percent: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_stake: 1_000,
            max_spins_per_wager: 5,
            bonus_spins_per_wild: 3,
            max_chain_spins: 100,
            boost_cap_percent: DEFAULT_BOOST_CAP_PERCENT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg: GameConfig = serde_json::from_str(r#"{"max_stake": 50}"#).unwrap();
        assert_eq!(cfg.max_stake, 50);
        assert_eq!(cfg.max_spins_per_wager, 5);
        assert_eq!(cfg.max_chain_spins, 100);
    }
}
