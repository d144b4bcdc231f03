//! Priced spins, multi-spin wagers and the bonus-spin chain.
//!
//! Every trigger for a user runs under that user's session lock, from the
//! balance check through the final credit. The pending bonus lives in the
//! session, so arming and redeeming it never interleave.

use std::{collections::HashMap, sync::Arc};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as SessionLock;
use tracing::{debug, info, warn};

use crate::{
    config::GameConfig,
    engine::{spin_once, Grid},
    paylines::LineWin,
    progression::{apply_boost, gold_boost_percent, ProgressionSummary},
    rng::RollSource,
    store::{LeaderboardEntry, ProfileStore, StoreError},
    symbols::SymbolTable,
};

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("insufficient funds: {required} gold required, {available} available")]
    InsufficientFunds { required: i64, available: i64 },
    #[error("stake of {stake} exceeds the limit of {max} per spin")]
    WagerTooLarge { stake: u64, max: u64 },
    #[error("{count} spins requested, at most {max} allowed per wager")]
    TooManySpins { count: u32, max: u32 },
    #[error("no bonus spins available")]
    NoBonusAvailable,
    #[error("stake must be greater than zero")]
    InvalidStake,
    #[error("a wager needs at least one spin")]
    InvalidSpinCount,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Free spins waiting to be redeemed by one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingBonus {
    pub remaining_spins: u32,
    pub wager_per_spin: u64,
}

/// One settled grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpinRecord {
    pub grid: Grid,
    /// Payline gold before the level boost.
    pub raw_gold: f64,
    pub gold: i64,
    pub xp: u64,
    pub lines: Vec<LineWin>,
    pub wild: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WagerResult {
    pub user_id: String,
    pub stake: u64,
    pub cost: i64,
    pub boost_percent: f64,
    pub spins: Vec<SpinRecord>,
    pub total_gold: i64,
    pub total_xp: u64,
    /// The user's bonus chain after this wager, if one is armed.
    pub bonus: Option<PendingBonus>,
}

/// A single spin settles as a one-spin wager.
pub type SpinResult = WagerResult;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BonusResult {
    pub user_id: String,
    pub wager_per_spin: u64,
    pub boost_percent: f64,
    pub spins: Vec<SpinRecord>,
    pub total_gold: i64,
    pub total_xp: u64,
    /// Set when the chain ceiling swallowed at least one extension.
    pub capped: bool,
}

impl BonusResult {
    pub fn spins_executed(&self) -> usize {
        self.spins.len()
    }
}

#[derive(Debug, Default)]
struct Session {
    pending: Option<PendingBonus>,
}

pub struct WagerEngine<S, R> {
    store: S,
    table: SymbolTable,
    config: GameConfig,
    rolls: Mutex<R>,
    sessions: Mutex<HashMap<String, Arc<SessionLock<Session>>>>,
}

impl<S, R> WagerEngine<S, R>
where
    S: ProfileStore,
    R: RollSource + Send,
{
    pub fn new(store: S, table: SymbolTable, config: GameConfig, rolls: R) -> Self {
        Self {
            store,
            table,
            config,
            rolls: Mutex::new(rolls),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn table(&self) -> &SymbolTable {
        &self.table
    }

    pub async fn spin(&self, user_id: &str, stake: u64) -> Result<SpinResult, GameError> {
        self.check_stake(stake)?;
        self.settle(user_id, stake, 1).await
    }

    pub async fn wager(
        &self,
        user_id: &str,
        stake: u64,
        count: u32,
    ) -> Result<WagerResult, GameError> {
        self.check_stake(stake)?;
        if count == 0 {
            return Err(GameError::InvalidSpinCount);
        }
        if count > self.config.max_spins_per_wager {
            return Err(GameError::TooManySpins {
                count,
                max: self.config.max_spins_per_wager,
            });
        }
        self.settle(user_id, stake, count).await
    }

    /// Run the user's whole bonus chain and pay it out in one credit.
    pub async fn redeem_bonus(&self, user_id: &str) -> Result<BonusResult, GameError> {
        let handle = self.session(user_id);
        let result = {
            let mut session = handle.lock().await;
            self.redeem_locked(&mut session, user_id).await
        };
        self.retire(user_id, handle);
        result
    }

    pub async fn pending_bonus(&self, user_id: &str) -> Option<PendingBonus> {
        let handle = self.session(user_id);
        let pending = handle.lock().await.pending;
        self.retire(user_id, handle);
        pending
    }

    pub async fn progression_summary(&self, user_id: &str) -> Result<ProgressionSummary, GameError> {
        let profile = self.store.get_or_create_profile(user_id).await?;
        Ok(ProgressionSummary::of(&profile, self.config.boost_cap_percent))
    }

    pub async fn leaderboard(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, GameError> {
        Ok(self.store.top_by_gold(limit).await?)
    }

    fn check_stake(&self, stake: u64) -> Result<(), GameError> {
        if stake == 0 {
            return Err(GameError::InvalidStake);
        }
        if stake > self.config.max_stake {
            warn!(stake, max = self.config.max_stake, "stake above limit");
            return Err(GameError::WagerTooLarge {
                stake,
                max: self.config.max_stake,
            });
        }
        Ok(())
    }

    async fn settle(&self, user_id: &str, stake: u64, count: u32) -> Result<WagerResult, GameError> {
        let handle = self.session(user_id);
        let result = {
            let mut session = handle.lock().await;
            self.settle_locked(&mut session, user_id, stake, count).await
        };
        self.retire(user_id, handle);
        result
    }

    async fn settle_locked(
        &self,
        session: &mut Session,
        user_id: &str,
        stake: u64,
        count: u32,
    ) -> Result<WagerResult, GameError> {
        let profile = self.store.get_or_create_profile(user_id).await?;
        let cost = i64::try_from(stake)
            .ok()
            .and_then(|s| s.checked_mul(i64::from(count)))
            .ok_or(GameError::WagerTooLarge {
                stake,
                max: self.config.max_stake,
            })?;
        if profile.gold < cost {
            warn!(user_id, cost, gold = profile.gold, "insufficient funds for wager");
            return Err(GameError::InsufficientFunds {
                required: cost,
                available: profile.gold,
            });
        }
        let boost_percent = gold_boost_percent(profile.level, self.config.boost_cap_percent);

        self.store.apply_gold_delta(user_id, -cost).await?;

        let spins: Vec<SpinRecord> = {
            let mut rolls = self.rolls.lock();
            (0..count)
                .map(|_| self.play(&mut *rolls, stake, boost_percent))
                .collect()
        };
        let total_gold: i64 = spins.iter().map(|s| s.gold).sum();
        let total_xp: u64 = spins.iter().map(|s| s.xp).sum();

        self.credit_gold(user_id, total_gold).await?;
        // Paid spins keep their wilds even if the XP credit fails.
        if spins.iter().any(|s| s.wild) {
            session.pending = Some(self.arm(session.pending, stake));
        }
        self.credit_xp(user_id, total_xp).await?;
        info!(
            user_id,
            stake,
            count,
            cost,
            total_gold,
            total_xp,
            bonus = session.pending.map(|b| b.remaining_spins),
            "wager settled"
        );
        Ok(WagerResult {
            user_id: user_id.to_string(),
            stake,
            cost,
            boost_percent,
            spins,
            total_gold,
            total_xp,
            bonus: session.pending,
        })
    }

    async fn redeem_locked(
        &self,
        session: &mut Session,
        user_id: &str,
    ) -> Result<BonusResult, GameError> {
        let bonus = session.pending.ok_or(GameError::NoBonusAvailable)?;
        let profile = self.store.get_or_create_profile(user_id).await?;
        let boost_percent = gold_boost_percent(profile.level, self.config.boost_cap_percent);

        let (spins, capped) = {
            let mut rolls = self.rolls.lock();
            self.run_chain(&mut *rolls, bonus, boost_percent)
        };
        let total_gold: i64 = spins.iter().map(|s| s.gold).sum();
        let total_xp: u64 = spins.iter().map(|s| s.xp).sum();
        if capped {
            warn!(user_id, spins = spins.len(), "bonus chain hit its ceiling");
        }

        // Once gold is paid the chain is spent, whatever happens to the XP.
        self.credit_gold(user_id, total_gold).await?;
        session.pending = None;
        self.credit_xp(user_id, total_xp).await?;

        info!(
            user_id,
            spins = spins.len(),
            total_gold,
            total_xp,
            "bonus chain redeemed"
        );
        Ok(BonusResult {
            user_id: user_id.to_string(),
            wager_per_spin: bonus.wager_per_spin,
            boost_percent,
            spins,
            total_gold,
            total_xp,
            capped,
        })
    }

    /// Spins executed plus spins remaining never exceed `max_chain_spins`.
    fn run_chain(
        &self,
        rolls: &mut R,
        bonus: PendingBonus,
        boost_percent: f64,
    ) -> (Vec<SpinRecord>, bool) {
        let ceiling = self.config.max_chain_spins;
        let per_wild = self.config.bonus_spins_per_wild;
        let mut remaining = bonus.remaining_spins.min(ceiling);
        let mut executed = 0u32;
        let mut capped = false;
        let mut spins = Vec::with_capacity(remaining as usize);
        while remaining > 0 {
            remaining -= 1;
            executed += 1;
            let record = self.play(rolls, bonus.wager_per_spin, boost_percent);
            if record.wild {
                let room = ceiling - executed - remaining;
                let extra = per_wild.min(room);
                capped |= extra < per_wild;
                remaining += extra;
            }
            spins.push(record);
        }
        (spins, capped)
    }

    fn play(&self, rolls: &mut R, stake: u64, boost_percent: f64) -> SpinRecord {
        let outcome = spin_once(&self.table, rolls, stake as f64);
        let wild = outcome.grid.contains_wild(&self.table);
        debug!(grid = ?outcome.grid.names(&self.table), raw_gold = outcome.gold, xp = outcome.xp, wild, "grid drawn");
        SpinRecord {
            grid: outcome.grid,
            raw_gold: outcome.gold,
            gold: apply_boost(outcome.gold, boost_percent),
            xp: outcome.xp,
            lines: outcome.lines,
            wild,
        }
    }

    fn arm(&self, pending: Option<PendingBonus>, stake: u64) -> PendingBonus {
        let ceiling = self.config.max_chain_spins;
        let per_wild = self.config.bonus_spins_per_wild;
        match pending {
            Some(mut bonus) => {
                bonus.remaining_spins = bonus.remaining_spins.saturating_add(per_wild).min(ceiling);
                bonus
            }
            None => PendingBonus {
                remaining_spins: per_wild.min(ceiling),
                wager_per_spin: stake,
            },
        }
    }

    async fn credit_gold(&self, user_id: &str, gold: i64) -> Result<(), StoreError> {
        if gold != 0 {
            self.store.apply_gold_delta(user_id, gold).await?;
        }
        Ok(())
    }

    async fn credit_xp(&self, user_id: &str, xp: u64) -> Result<(), StoreError> {
        if xp > 0 {
            self.store.apply_xp_delta(user_id, xp).await?;
        }
        Ok(())
    }

    fn session(&self, user_id: &str) -> Arc<SessionLock<Session>> {
        self.sessions
            .lock()
            .entry(user_id.to_string())
            .or_default()
            .clone()
    }

    /// Drop an idle session: no armed bonus and nobody else holding it.
    fn retire(&self, user_id: &str, handle: Arc<SessionLock<Session>>) {
        let mut sessions = self.sessions.lock();
        let idle = Arc::strong_count(&handle) == 2
            && handle
                .try_lock()
                .map(|s| s.pending.is_none())
                .unwrap_or(false);
        if idle {
            sessions.remove(user_id);
        }
    }
}
