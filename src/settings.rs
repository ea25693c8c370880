//! Feature toggles and preferences
//!
//! Persisted separately from run snapshots. Toggles are read at the moment
//! the feature would fire, never cached, so flipping one mid-run takes
//! effect immediately.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{GACHA_NUMBERS_THRESHOLD, GACHA_TARGETS_THRESHOLD};

/// Which counter drives the reward trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GachaMetric {
    /// Every N targets cleared
    #[default]
    TargetsCleared,
    /// Every N number tiles consumed
    NumbersUsed,
}

/// Feature toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Reward draws on threshold crossings
    pub gacha: bool,
    /// Which counter the reward trigger watches
    pub gacha_metric: GachaMetric,
    /// Scripted first-run walkthrough
    pub tutorial: bool,
    /// Score submission at game over
    pub leaderboard: bool,
    /// Per-target countdown
    pub timer: bool,
    /// Item storage slots
    pub storage: bool,
    /// Consecutive-match score bonus
    pub combo: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gacha: true,
            gacha_metric: GachaMetric::TargetsCleared,
            tutorial: true,
            leaderboard: true,
            timer: true,
            storage: true,
            combo: true,
        }
    }
}

impl Settings {
    /// Reward trigger threshold for the configured metric
    pub fn gacha_threshold(&self) -> u32 {
        match self.gacha_metric {
            GachaMetric::TargetsCleared => GACHA_TARGETS_THRESHOLD,
            GachaMetric::NumbersUsed => GACHA_NUMBERS_THRESHOLD,
        }
    }

    /// Load from a JSON file; missing or corrupt files fall back to defaults
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(settings) => {
                    log::info!("loaded settings from {}", path.display());
                    settings
                }
                Err(err) => {
                    log::warn!("corrupt settings file {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("using default settings");
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}
