//! Numfuse - a number-synthesis puzzle game core
//!
//! Core modules:
//! - `sim`: Deterministic simulation (grid, synthesis, targets, rewards, timer)
//! - `session`: Umbrella session state machine (home/playing/paused/game over)
//! - `services`: External collaborator seams (leaderboard, analytics, persistence)
//! - `settings`: Feature toggles and gameplay variants

pub mod services;
pub mod session;
pub mod settings;
pub mod sim;

pub use services::{AnalyticsService, LeaderboardService, PersistenceStore};
pub use session::Session;
pub use settings::Settings;

/// Game balance constants
pub mod consts {
    /// Fixed simulation timestep in seconds (10 Hz, matches the timer granularity)
    pub const TICK_DT: f32 = 0.1;

    /// Cells per numeric column when fully stocked
    pub const NUM_COLUMN_HEIGHT: usize = 3;
    /// The operator column is always fully populated with the four operators
    pub const OP_COLUMN_HEIGHT: usize = 4;
    /// Item slots in the storage bar
    pub const STORAGE_SLOTS: usize = 4;
    /// Freshly generated digits are drawn from this inclusive range
    pub const DIGIT_MIN: i64 = 1;
    pub const DIGIT_MAX: i64 = 9;

    /// Points per unit of target weight on a match
    pub const BASE_SCORE_MULTIPLIER: u64 = 50;
    /// Points per combo step
    pub const COMBO_SCORE_BONUS: u64 = 20;
    /// Cap on the combo contribution (8 steps worth; the raw counter is uncapped)
    pub const COMBO_BONUS_CAP: u64 = 160;
    /// Cumulative score per coarse difficulty level
    pub const DIFFICULTY_LEVEL_STEP: u64 = 10_000;

    /// Warm-up targets drawn from the easy tier before the sequencer kicks in
    pub const WARMUP_TARGETS: u32 = 3;

    /// Ticks the synthesis lock holds before the result commits (400 ms)
    pub const SETTLE_TICKS: u32 = 4;

    /// Targets cleared between reward draws (canonical trigger metric)
    pub const GACHA_TARGETS_THRESHOLD: u32 = 6;
    /// Numbers-used variant of the trigger threshold
    pub const GACHA_NUMBERS_THRESHOLD: u32 = 30;
    /// Delay between a latched trigger and the modal opening (600 ms)
    pub const GACHA_OPEN_DELAY_TICKS: u32 = 6;
    /// Duration of the drawing animation beat (800 ms)
    pub const GACHA_DRAW_TICKS: u32 = 8;
    /// Base probability of the item branch at difficulty level 0
    pub const ITEM_CHANCE_BASE: f64 = 0.70;
    /// Item-branch probability lost per difficulty level
    pub const ITEM_CHANCE_STEP: f64 = 0.05;
    /// Floor for the item-branch probability
    pub const ITEM_CHANCE_MIN: f64 = 0.40;
    /// Matches affected by the halve-timer event
    pub const TIME_PENALTY_MATCHES: u8 = 2;
    /// Matches affected by the double-score event
    pub const DOUBLE_SCORE_MATCHES: u8 = 2;

    /// Seconds of countdown per unit of target weight
    pub const TIMER_SECONDS_PER_WEIGHT: f32 = 18.0;
    /// Global ceiling for the countdown regardless of top-ups
    pub const TIMER_CEILING_SECONDS: f32 = 150.0;
    /// Seconds granted by a timer-boost item
    pub const TIMER_BOOST_SECONDS: f32 = 15.0;
    /// Fixed countdown while the tutorial board is shown
    pub const TUTORIAL_TIMER_SECONDS: f32 = 100.0;

    /// Points granted by a score-pack item (applied immediately, never stored)
    pub const SCORE_PACK_POINTS: u64 = 500;
}
