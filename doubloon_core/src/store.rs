//! Profile persistence contract.
//!
//! The engine never writes a [`Profile`] directly. It asks the store for
//! deltas, and each delta must be applied atomically with respect to other
//! deltas for the same user.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::progression::apply_xp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub gold: i64,
    pub xp: u64,
    pub level: u32,
}

impl Profile {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            gold: 0,
            xp: 0,
            level: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub gold: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("profile store unavailable: {0}")]
    Unavailable(String),
    #[error("profile store rejected update for {user_id}: {reason}")]
    Rejected { user_id: String, reason: String },
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_or_create_profile(&self, user_id: &str) -> Result<Profile, StoreError>;

    /// Add `delta` (possibly negative) to the user's gold.
    async fn apply_gold_delta(&self, user_id: &str, delta: i64) -> Result<(), StoreError>;

    /// Add XP and resolve any level-ups it pays for.
    async fn apply_xp_delta(&self, user_id: &str, delta: u64) -> Result<(), StoreError>;

    /// Richest users first.
    async fn top_by_gold(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError>;
}

/// Process-local store, used by tests and offline simulation.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<String, Profile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a profile wholesale.
    pub fn insert(&self, profile: Profile) {
        self.profiles.lock().insert(profile.user_id.clone(), profile);
    }

    pub fn profile(&self, user_id: &str) -> Option<Profile> {
        self.profiles.lock().get(user_id).cloned()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_or_create_profile(&self, user_id: &str) -> Result<Profile, StoreError> {
        let mut profiles = self.profiles.lock();
        Ok(profiles
            .entry(user_id.to_string())
            .or_insert_with(|| Profile::new(user_id))
            .clone())
    }

    async fn apply_gold_delta(&self, user_id: &str, delta: i64) -> Result<(), StoreError> {
        let mut profiles = self.profiles.lock();
        let profile = profiles
            .entry(user_id.to_string())
            .or_insert_with(|| Profile::new(user_id));
        profile.gold = profile
            .gold
            .checked_add(delta)
            .ok_or_else(|| StoreError::Rejected {
                user_id: user_id.to_string(),
                reason: format!("gold overflow applying {delta}"),
            })?;
        Ok(())
    }

    async fn apply_xp_delta(&self, user_id: &str, delta: u64) -> Result<(), StoreError> {
        let mut profiles = self.profiles.lock();
        let profile = profiles
            .entry(user_id.to_string())
            .or_insert_with(|| Profile::new(user_id));
        let (xp, level) = apply_xp(profile.xp, profile.level, delta);
        profile.xp = xp;
        profile.level = level;
        Ok(())
    }

    async fn top_by_gold(&self, limit: usize) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let profiles = self.profiles.lock();
        let mut entries: Vec<LeaderboardEntry> = profiles
            .values()
            .map(|p| LeaderboardEntry {
                user_id: p.user_id.clone(),
                gold: p.gold,
            })
            .collect();
        entries.sort_by(|a, b| b.gold.cmp(&a.gold).then_with(|| a.user_id.cmp(&b.user_id)));
        entries.truncate(limit);
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_fresh_profiles() {
        let store = MemoryProfileStore::new();
        let p = store.get_or_create_profile("anne").await.unwrap();
        assert_eq!(p, Profile::new("anne"));
        assert_eq!(store.profile("anne"), Some(Profile::new("anne")));
    }

    #[tokio::test]
    async fn deltas_accumulate_and_level_up() {
        let store = MemoryProfileStore::new();
        store.apply_gold_delta("anne", 100).await.unwrap();
        store.apply_gold_delta("anne", -30).await.unwrap();
        store.apply_xp_delta("anne", 20).await.unwrap();
        let p = store.get_or_create_profile("anne").await.unwrap();
        assert_eq!(p.gold, 70);
        assert_eq!((p.xp, p.level), (3, 2));
    }

    #[tokio::test]
    async fn gold_overflow_is_rejected() {
        let store = MemoryProfileStore::new();
        store.apply_gold_delta("anne", i64::MAX).await.unwrap();
        let err = store.apply_gold_delta("anne", 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected { .. }));
        assert_eq!(store.profile("anne").unwrap().gold, i64::MAX);
    }

    #[tokio::test]
    async fn leaderboard_orders_by_gold() {
        let store = MemoryProfileStore::new();
        for (id, gold) in [("anne", 50), ("bart", 500), ("cali", 5), ("dirk", 500)] {
            store.apply_gold_delta(id, gold).await.unwrap();
        }
        let top = store.top_by_gold(3).await.unwrap();
        let ids: Vec<&str> = top.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(ids, vec!["bart", "dirk", "anne"]);
    }
}
