//! Experience curve, titles and the level-based gold boost.

use serde::{Deserialize, Serialize};

use crate::store::Profile;

/// Boost ceiling used when no configuration overrides it.
pub const DEFAULT_BOOST_CAP_PERCENT: f64 = 20.0;

const BAR_CELLS: usize = 10;

/// Titles ordered by the level at which they unlock.
const TITLES: [(u32, &str); 11] = [
    (1, "Swabby"),
    (10, "Lucky Deckhand"),
    (20, "Roulette Raider"),
    (30, "First Mate of Fortune"),
    (40, "Captain of the Cards"),
    (50, "Jackpot Admiral"),
    (60, "The Kraken Gambler"),
    (70, "High Roller Buccaneer"),
    (80, "Slot Machine Siren"),
    (90, "Dice Dreadnought"),
    (100, "Legendary Gambler"),
];

/// XP needed to advance from `level` to `level + 1`: `15 + 1.5 * level^2`,
/// rounded up. Levels below 1 are treated as level 1.
pub fn xp_for_level(level: u32) -> u64 {
    let l = level.max(1) as u64;
    15 + l.saturating_mul(l).saturating_mul(3).saturating_add(1) / 2
}

/// Add `delta` XP and roll over as many levels as it pays for.
pub fn apply_xp(xp: u64, level: u32, delta: u64) -> (u64, u32) {
    let mut xp = xp.saturating_add(delta);
    let mut level = level.max(1);
    loop {
        let needed = xp_for_level(level);
        if xp < needed || level == u32::MAX {
            return (xp, level);
        }
        xp -= needed;
        level += 1;
    }
}

/// Permanent gold bonus: 2% per ten levels, capped at `cap_percent`.
pub fn gold_boost_percent(level: u32, cap_percent: f64) -> f64 {
    let steps = (level / 10) as f64;
    (steps * 2.0).min(cap_percent.max(0.0))
}

/// Scale raw gold by a boost percentage and round to whole gold.
pub fn apply_boost(gold: f64, boost_percent: f64) -> i64 {
    (gold * (1.0 + boost_percent / 100.0)).round() as i64
}

pub fn title(level: u32) -> &'static str {
    TITLES
        .iter()
        .rev()
        .find(|(threshold, _)| level >= *threshold)
        .map(|(_, name)| *name)
        .unwrap_or(TITLES[0].1)
}

/// Ten-cell bar such as `▰▰▰▱▱▱▱▱▱▱ (5/17 XP)`.
pub fn progress_bar(xp: u64, level: u32) -> String {
    let needed = xp_for_level(level);
    let ratio = (xp as f64 / needed as f64).min(1.0);
    let filled = ((ratio * BAR_CELLS as f64).round() as usize).min(BAR_CELLS);
    format!(
        "{}{} ({}/{} XP)",
        "▰".repeat(filled),
        "▱".repeat(BAR_CELLS - filled),
        xp,
        needed
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressionSummary {
    pub user_id: String,
    pub title: String,
    pub level: u32,
    pub xp: u64,
    pub xp_needed: u64,
    pub gold: i64,
    pub boost_percent: f64,
    pub progress_bar: String,
}

impl ProgressionSummary {
    pub fn of(profile: &Profile, boost_cap_percent: f64) -> Self {
        Self {
            user_id: profile.user_id.clone(),
            title: title(profile.level).to_string(),
            level: profile.level,
            xp: profile.xp,
            xp_needed: xp_for_level(profile.level),
            gold: profile.gold,
            boost_percent: gold_boost_percent(profile.level, boost_cap_percent),
            progress_bar: progress_bar(profile.xp, profile.level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn curve_matches_known_points() {
        assert_eq!(xp_for_level(0), 17);
        assert_eq!(xp_for_level(1), 17);
        assert_eq!(xp_for_level(2), 21);
        assert_eq!(xp_for_level(10), 165);
    }

    #[test]
    fn apply_xp_rolls_over_levels() {
        assert_eq!(apply_xp(0, 1, 16), (16, 1));
        assert_eq!(apply_xp(0, 1, 17), (0, 2));
        // 17 for level 1, 21 for level 2, then 5 left over at level 3.
        assert_eq!(apply_xp(10, 1, 33), (5, 3));
    }

    #[test]
    fn boost_steps_every_ten_levels() {
        assert_eq!(gold_boost_percent(1, DEFAULT_BOOST_CAP_PERCENT), 0.0);
        assert_eq!(gold_boost_percent(19, DEFAULT_BOOST_CAP_PERCENT), 2.0);
        assert_eq!(gold_boost_percent(55, DEFAULT_BOOST_CAP_PERCENT), 10.0);
        assert_eq!(gold_boost_percent(100, DEFAULT_BOOST_CAP_PERCENT), 20.0);
        assert_eq!(gold_boost_percent(500, DEFAULT_BOOST_CAP_PERCENT), 20.0);
        assert_eq!(gold_boost_percent(500, 7.5), 7.5);
    }

    #[test]
    fn boost_rounds_to_whole_gold() {
        assert_eq!(apply_boost(57.0, 0.0), 57);
        assert_eq!(apply_boost(57.0, 10.0), 63);
        assert_eq!(apply_boost(0.0, 20.0), 0);
    }

    #[test]
    fn titles_cover_every_level() {
        assert_eq!(title(0), "Swabby");
        assert_eq!(title(1), "Swabby");
        assert_eq!(title(9), "Swabby");
        assert_eq!(title(10), "Lucky Deckhand");
        assert_eq!(title(59), "Jackpot Admiral");
        assert_eq!(title(100), "Legendary Gambler");
        assert_eq!(title(u32::MAX), "Legendary Gambler");
    }

    #[test]
    fn progress_bar_renders_and_clamps() {
        assert_eq!(progress_bar(0, 1), "▱▱▱▱▱▱▱▱▱▱ (0/17 XP)");
        assert_eq!(progress_bar(6, 1), "▰▰▰▰▱▱▱▱▱▱ (6/17 XP)");
        assert_eq!(progress_bar(500, 1), "▰▰▰▰▰▰▰▰▰▰ (500/17 XP)");
    }

    proptest! {
        #[test]
        fn curve_is_positive_and_non_decreasing(level in 1u32..1_000_000) {
            prop_assert!(xp_for_level(level) > 0);
            prop_assert!(xp_for_level(level + 1) >= xp_for_level(level));
        }

        #[test]
        fn apply_xp_never_leaves_a_full_level(xp in 0u64..10_000, level in 1u32..500, delta in 0u64..1_000_000) {
            let start_xp = xp.min(xp_for_level(level) - 1);
            let (new_xp, new_level) = apply_xp(start_xp, level, delta);
            prop_assert!(new_xp < xp_for_level(new_level));
            prop_assert!(new_level >= level);
        }

        #[test]
        fn boost_is_monotonic_and_capped(level in 1u32..100_000) {
            let here = gold_boost_percent(level, DEFAULT_BOOST_CAP_PERCENT);
            let next = gold_boost_percent(level + 1, DEFAULT_BOOST_CAP_PERCENT);
            prop_assert!(next >= here);
            prop_assert!(here <= DEFAULT_BOOST_CAP_PERCENT);
        }
    }
}
