//! Target catalog and difficulty sequencer
//!
//! The catalog is a static table of target values bucketed into tiers; the
//! sequencer decides which tier the next target is drawn from. "How hard"
//! (score-gated tier patterns) is decoupled from "which number" (uniform
//! within the tier), so the difficulty curve is tunable without enumerating
//! values.

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::*;

/// A target the player must synthesize, drawn from the static catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetData {
    /// The value a synthesis result must equal
    pub value: i64,
    /// Difficulty tier (0 = easy .. 4 = master)
    pub tier: u8,
    /// Drives both score payout and timer duration
    pub weight: u32,
}

const fn t(value: i64, tier: u8, weight: u32) -> TargetData {
    TargetData { value, tier, weight }
}

/// The level table. Tier weights: 2 / 5 / 6 / 8 / 10.
pub const TARGET_CATALOG: &[TargetData] = &[
    // Easy (tier 0)
    t(24, 0, 2),
    t(26, 0, 2),
    t(48, 0, 2),
    t(60, 0, 2),
    t(72, 0, 2),
    t(12, 0, 2),
    t(20, 0, 2),
    // Normal (tier 1)
    t(25, 1, 5),
    t(49, 1, 5),
    t(64, 1, 5),
    t(81, 1, 5),
    t(11, 1, 5),
    t(29, 1, 5),
    t(23, 1, 5),
    t(17, 1, 5),
    t(27, 1, 5),
    // Hard (tier 2)
    t(47, 2, 6),
    t(53, 2, 6),
    t(91, 2, 6),
    t(58, 2, 6),
    t(62, 2, 6),
    // Expert (tier 3)
    t(61, 3, 8),
    t(71, 3, 8),
    t(79, 3, 8),
    t(94, 3, 8),
    t(98, 3, 8),
    // Master (tier 4)
    t(67, 4, 10),
    t(83, 4, 10),
    t(89, 4, 10),
    t(97, 4, 10),
];

/// Highest tier present in the catalog
pub const MAX_TIER: u8 = 4;

/// Named tier-draw patterns, cycled positionally by the sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternKind {
    Normal,
    Hard,
}

impl PatternKind {
    /// The ordered tier draws making up one run of this pattern
    pub fn tiers(&self) -> &'static [u8] {
        match self {
            PatternKind::Normal => &[0, 0, 1, 0, 1, 2],
            PatternKind::Hard => &[1, 1, 2, 1, 3, 4],
        }
    }
}

/// Pattern rotation for a given cumulative score
fn order_for_score(score: u64) -> Vec<PatternKind> {
    if score < 2_000 {
        vec![PatternKind::Normal]
    } else if score < 10_000 {
        vec![PatternKind::Normal, PatternKind::Normal, PatternKind::Hard]
    } else {
        vec![PatternKind::Normal, PatternKind::Hard]
    }
}

/// Uniform draw from a tier. Falls back to tier 0 if the tier is empty
/// (cannot happen with the shipped catalog).
pub fn random_target_in_tier(tier: u8, rng: &mut Pcg32) -> TargetData {
    let pool: Vec<TargetData> = TARGET_CATALOG
        .iter()
        .copied()
        .filter(|entry| entry.tier == tier)
        .collect();
    if pool.is_empty() {
        return TARGET_CATALOG[0];
    }
    pool[rng.random_range(0..pool.len())]
}

/// Uniform draw from the easy tier (used by target refresh)
pub fn random_easy_target(rng: &mut Pcg32) -> TargetData {
    random_target_in_tier(0, rng)
}

/// Coarse difficulty level derived from cumulative score
pub fn difficulty_level(score: u64) -> u32 {
    (score / DIFFICULTY_LEVEL_STEP) as u32
}

/// Countdown scale for a difficulty level (tighter timers as levels climb)
pub fn difficulty_time_multiplier(level: u32) -> f32 {
    (1.0 - 0.05 * level as f32).max(0.7)
}

/// Sequencer progression state, threaded through every draw.
///
/// The active pattern order is re-evaluated from the cumulative score only
/// when the cycle position wraps to zero, so a score threshold crossing never
/// causes a mid-cycle difficulty jump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencerState {
    /// Absolute count of targets handed out so far
    presented: u32,
    /// Pattern rotation chosen at the last cycle boundary
    order: Vec<PatternKind>,
    /// Position within the concatenated tier list of `order`
    cycle_pos: usize,
}

impl SequencerState {
    pub fn new() -> Self {
        Self {
            presented: 0,
            order: order_for_score(0),
            cycle_pos: 0,
        }
    }

    fn cycle_len(&self) -> usize {
        self.order.iter().map(|p| p.tiers().len()).sum()
    }

    fn tier_at(&self, pos: usize) -> u8 {
        let mut offset = pos;
        for pattern in &self.order {
            let tiers = pattern.tiers();
            if offset < tiers.len() {
                return tiers[offset];
            }
            offset -= tiers.len();
        }
        0
    }

    /// Draw the next target. The first `WARMUP_TARGETS` draws of a session
    /// come uniformly from tier 0 regardless of score.
    pub fn next(&mut self, score: u64, rng: &mut Pcg32) -> TargetData {
        let index = self.presented;
        self.presented += 1;

        if index < WARMUP_TARGETS {
            return random_target_in_tier(0, rng);
        }

        if self.cycle_pos == 0 {
            self.order = order_for_score(score);
        }
        let tier = self.tier_at(self.cycle_pos);
        self.cycle_pos = (self.cycle_pos + 1) % self.cycle_len();

        random_target_in_tier(tier, rng)
    }
}

impl Default for SequencerState {
    fn default() -> Self {
        Self::new()
    }
}
