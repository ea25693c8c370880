//! External collaborator seams: leaderboard, analytics, run persistence
//!
//! The session talks to these through traits so a shell can plug in real
//! backends. Every default implementation here is local (in-memory or a
//! JSON file); failures are surfaced as `ServiceError` and the session
//! logs them rather than aborting play.

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sim::{EndReason, GameState};

/// Maximum leaderboard entries kept
pub const MAX_LEADERBOARD_ENTRIES: usize = 10;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// Unix timestamp in milliseconds
pub fn now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as f64)
        .unwrap_or(0.0)
}

/// End-of-run statistics reported to analytics and the leaderboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    pub username: String,
    pub score: u64,
    pub highest_combo: u32,
    pub targets_cleared: u32,
    pub numbers_used: u32,
    pub total_draws: u32,
    pub highest_tier: u8,
    /// Occupied storage slots at the moment the run ended
    pub items_held: u32,
    pub end_reason: EndReason,
}

impl SessionStats {
    pub fn from_state(state: &GameState, reason: EndReason, username: &str) -> Self {
        Self {
            username: username.to_string(),
            score: state.score,
            highest_combo: state.highest_combo,
            targets_cleared: state.targets_cleared,
            numbers_used: state.numbers_used,
            total_draws: state.total_draws,
            highest_tier: state.highest_tier,
            items_held: state.storage.iter().flatten().count() as u32,
            end_reason: reason,
        }
    }
}

/// A single leaderboard entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub username: String,
    pub score: u64,
    pub highest_combo: u32,
    pub targets_cleared: u32,
    /// Unix timestamp (ms) when achieved
    pub timestamp: f64,
}

/// Score ranking backend
pub trait LeaderboardService {
    /// Submit a finished run. Returns the 1-indexed rank achieved, or None
    /// if the score did not qualify.
    fn submit(&mut self, entry: ScoreEntry) -> Result<Option<usize>, ServiceError>;

    /// Best score on record
    fn top_score(&self) -> Result<Option<u64>, ServiceError>;

    /// Current standings, best first
    fn entries(&self) -> Result<Vec<ScoreEntry>, ServiceError>;
}

/// Run-event sink
pub trait AnalyticsService {
    fn game_started(&mut self, seed: u64);
    fn game_over(&mut self, stats: &SessionStats);
}

/// Saved-run storage. A run snapshot is the full serialized game state;
/// corrupt payloads are treated as absent.
pub trait PersistenceStore {
    fn save_run(&mut self, state: &GameState) -> Result<(), ServiceError>;
    fn load_run(&self) -> Result<Option<GameState>, ServiceError>;
    fn clear_run(&mut self) -> Result<(), ServiceError>;
}

/// In-memory leaderboard, kept sorted descending and capped
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryLeaderboard {
    entries: Vec<ScoreEntry>,
}

impl MemoryLeaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a score would make the board
    pub fn qualifies(&self, score: u64) -> bool {
        if score == 0 {
            return false;
        }
        if self.entries.len() < MAX_LEADERBOARD_ENTRIES {
            return true;
        }
        self.entries.last().map(|e| score > e.score).unwrap_or(true)
    }
}

impl LeaderboardService for MemoryLeaderboard {
    fn submit(&mut self, entry: ScoreEntry) -> Result<Option<usize>, ServiceError> {
        if !self.qualifies(entry.score) {
            return Ok(None);
        }
        let score = entry.score;
        let pos = self.entries.iter().position(|e| score > e.score);
        let rank = match pos {
            Some(i) => {
                self.entries.insert(i, entry);
                i + 1
            }
            None => {
                self.entries.push(entry);
                self.entries.len()
            }
        };
        self.entries.truncate(MAX_LEADERBOARD_ENTRIES);
        Ok(Some(rank))
    }

    fn top_score(&self) -> Result<Option<u64>, ServiceError> {
        Ok(self.entries.first().map(|e| e.score))
    }

    fn entries(&self) -> Result<Vec<ScoreEntry>, ServiceError> {
        Ok(self.entries.clone())
    }
}

/// Analytics sink that records events to the structured log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAnalytics;

impl AnalyticsService for LogAnalytics {
    fn game_started(&mut self, seed: u64) {
        log::info!("game started, seed={seed}");
    }

    fn game_over(&mut self, stats: &SessionStats) {
        log::info!(
            "game over: user={} reason={} score={} combo={} targets={} numbers={} draws={} held={}",
            stats.username,
            stats.end_reason.as_str(),
            stats.score,
            stats.highest_combo,
            stats.targets_cleared,
            stats.numbers_used,
            stats.total_draws,
            stats.items_held,
        );
    }
}

/// JSON-file run store
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl PersistenceStore for FileStore {
    fn save_run(&mut self, state: &GameState) -> Result<(), ServiceError> {
        let json = serde_json::to_string(state)?;
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn load_run(&self) -> Result<Option<GameState>, ServiceError> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_str(&json) {
            Ok(state) => Ok(Some(state)),
            Err(err) => {
                log::warn!("corrupt run snapshot at {}: {err}", self.path.display());
                Ok(None)
            }
        }
    }

    fn clear_run(&mut self) -> Result<(), ServiceError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

/// In-memory run store (tests, ephemeral shells)
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    snapshot: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceStore for MemoryStore {
    fn save_run(&mut self, state: &GameState) -> Result<(), ServiceError> {
        self.snapshot = Some(serde_json::to_string(state)?);
        Ok(())
    }

    fn load_run(&self) -> Result<Option<GameState>, ServiceError> {
        let Some(json) = &self.snapshot else {
            return Ok(None);
        };
        match serde_json::from_str(json) {
            Ok(state) => Ok(Some(state)),
            Err(err) => {
                log::warn!("corrupt run snapshot: {err}");
                Ok(None)
            }
        }
    }

    fn clear_run(&mut self) -> Result<(), ServiceError> {
        self.snapshot = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn entry(score: u64) -> ScoreEntry {
        ScoreEntry {
            username: "tester".into(),
            score,
            highest_combo: 3,
            targets_cleared: 7,
            timestamp: 0.0,
        }
    }

    #[test]
    fn test_stats_carry_username_and_held_items() {
        use crate::sim::{CellId, EndReason, ItemKind, StorageItem};

        let mut state = GameState::new(5, Settings::default());
        state.storage[0] = Some(StorageItem {
            id: CellId(900),
            kind: ItemKind::TimerBoost,
        });
        state.storage[2] = Some(StorageItem {
            id: CellId(901),
            kind: ItemKind::NumberToken(4),
        });
        let stats = SessionStats::from_state(&state, EndReason::Settled, "nia");
        assert_eq!(stats.username, "nia");
        assert_eq!(stats.items_held, 2);
    }

    #[test]
    fn test_leaderboard_ranks_descending() {
        let mut board = MemoryLeaderboard::new();
        assert_eq!(board.submit(entry(100)).unwrap(), Some(1));
        assert_eq!(board.submit(entry(300)).unwrap(), Some(1));
        assert_eq!(board.submit(entry(200)).unwrap(), Some(2));
        assert_eq!(board.top_score().unwrap(), Some(300));
    }

    #[test]
    fn test_zero_score_never_qualifies() {
        let mut board = MemoryLeaderboard::new();
        assert_eq!(board.submit(entry(0)).unwrap(), None);
        assert!(board.entries().unwrap().is_empty());
    }

    #[test]
    fn test_leaderboard_caps_entries() {
        let mut board = MemoryLeaderboard::new();
        for score in 1..=15 {
            board.submit(entry(score * 10)).unwrap();
        }
        let entries = board.entries().unwrap();
        assert_eq!(entries.len(), MAX_LEADERBOARD_ENTRIES);
        assert_eq!(entries[0].score, 150);
        // 10 no longer beats the lowest surviving entry
        assert_eq!(board.submit(entry(10)).unwrap(), None);
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let mut store = MemoryStore::new();
        assert!(store.load_run().unwrap().is_none());

        let state = GameState::new(5, Settings::default());
        store.save_run(&state).unwrap();
        let loaded = store.load_run().unwrap().unwrap();
        assert_eq!(loaded, state);

        store.clear_run().unwrap();
        assert!(store.load_run().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_snapshot_treated_as_absent() {
        let mut store = MemoryStore::new();
        store.snapshot = Some("{not json".into());
        assert!(store.load_run().unwrap().is_none());
    }

    #[test]
    fn test_file_store_missing_file_is_absent() {
        let store = FileStore::new(PathBuf::from("/nonexistent/numfuse/run.json"));
        assert!(store.load_run().unwrap().is_none());
    }
}
