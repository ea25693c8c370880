//! Countdown controller
//!
//! The countdown is a persisted value in the game state, not a derived one,
//! so pause/background/resume keep the exact remaining time. Expiry fires
//! exactly once; the tick loop decides when the timer is active.

use serde::{Deserialize, Serialize};

use super::catalog::{TargetData, difficulty_time_multiplier};
use super::state::StatusEffects;
use crate::consts::*;

/// Countdown duration for a target under the given status effects and level
pub fn duration_for(target: &TargetData, status: &StatusEffects, level: u32) -> f32 {
    let penalty = if status.time_penalty_matches > 0 {
        0.5
    } else {
        1.0
    };
    target.weight as f32 * TIMER_SECONDS_PER_WEIGHT * penalty * difficulty_time_multiplier(level)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimerState {
    /// Seconds left; never below zero
    pub remaining: f32,
    /// Full duration of the current target (for progress display)
    pub duration: f32,
    /// Latched once the countdown reaches zero
    expired: bool,
}

impl TimerState {
    /// Fresh countdown for a newly presented target
    pub fn for_target(target: &TargetData, status: &StatusEffects, level: u32) -> Self {
        let duration = duration_for(target, status, level);
        Self {
            remaining: duration,
            duration,
            expired: false,
        }
    }

    /// Fixed countdown (tutorial)
    pub fn fixed(seconds: f32) -> Self {
        Self {
            remaining: seconds,
            duration: seconds,
            expired: false,
        }
    }

    /// Advance by `dt` seconds. Returns true exactly once, on the tick the
    /// countdown crosses zero.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.expired {
            return false;
        }
        self.remaining = (self.remaining - dt).max(0.0);
        if self.remaining <= 0.0 {
            self.expired = true;
            return true;
        }
        false
    }

    /// Top up the countdown, clamped to the global ceiling
    pub fn add_time(&mut self, seconds: f32) {
        if self.expired {
            return;
        }
        self.remaining = (self.remaining + seconds).min(TIMER_CEILING_SECONDS);
    }

    /// Restart for a new target (only done on a successful match)
    pub fn reset_for(&mut self, target: &TargetData, status: &StatusEffects, level: u32) {
        let duration = duration_for(target, status, level);
        self.remaining = duration;
        self.duration = duration;
        self.expired = false;
    }

    /// Remaining time as a 0..=100 percentage for progress bars
    pub fn progress(&self) -> f32 {
        if self.duration > 0.0 {
            (self.remaining / self.duration * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        }
    }
}
