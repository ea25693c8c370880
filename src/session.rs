//! Umbrella session state machine
//!
//! Owns the active run and routes it to the external services. The session
//! never lets a service failure interrupt play: submission and persistence
//! errors are logged and swallowed. Abandoning a run drops the game state,
//! which cancels any in-flight settle lock or reward draw with it.

use crate::services::{
    AnalyticsService, LeaderboardService, PersistenceStore, ScoreEntry, SessionStats, now_ms,
};
use crate::settings::Settings;
use crate::sim::{self, Effect, GameState, Input};

/// Which screen the shell should render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    InGame,
}

pub struct Session<L, A, P> {
    pub settings: Settings,
    /// Display name attached to submissions and session stats
    username: String,
    screen: Screen,
    game: Option<GameState>,
    /// Latched once any tutorial run completes, so the first-visit gate
    /// fires at most once per session
    tutorial_done: bool,
    /// Rank achieved by the most recent finished run
    pub last_rank: Option<usize>,
    leaderboard: L,
    analytics: A,
    store: P,
}

impl<L, A, P> Session<L, A, P>
where
    L: LeaderboardService,
    A: AnalyticsService,
    P: PersistenceStore,
{
    pub fn new(settings: Settings, leaderboard: L, analytics: A, store: P) -> Self {
        Self {
            settings,
            username: "player".to_string(),
            screen: Screen::Home,
            game: None,
            tutorial_done: false,
            last_rank: None,
            leaderboard,
            analytics,
            store,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn game(&self) -> Option<&GameState> {
        self.game.as_ref()
    }

    pub fn set_username(&mut self, name: impl Into<String>) {
        self.username = name.into();
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Mark the tutorial as already seen (e.g. restored by the shell)
    pub fn set_tutorial_done(&mut self, done: bool) {
        self.tutorial_done = done;
    }

    /// Start a run. First visits get the scripted tutorial when enabled.
    pub fn start_game(&mut self, seed: u64) -> &GameState {
        if self.settings.tutorial && !self.tutorial_done {
            return self.start_tutorial(seed);
        }
        self.begin(GameState::new(seed, self.settings))
    }

    /// Start the scripted walkthrough explicitly
    pub fn start_tutorial(&mut self, seed: u64) -> &GameState {
        self.begin(GameState::new_tutorial(seed, self.settings))
    }

    fn begin(&mut self, state: GameState) -> &GameState {
        self.analytics.game_started(state.seed);
        self.last_rank = None;
        self.screen = Screen::InGame;
        self.game.insert(state)
    }

    /// Route one input to the active run
    pub fn handle_input(&mut self, input: Input) -> Vec<Effect> {
        let Some(game) = &mut self.game else {
            return Vec::new();
        };
        let effects = sim::handle_input(game, input);
        self.process_effects(&effects);
        effects
    }

    /// Advance the active run by one timestep
    pub fn tick(&mut self, dt: f32) -> Vec<Effect> {
        let Some(game) = &mut self.game else {
            return Vec::new();
        };
        let effects = sim::tick(game, dt);
        self.process_effects(&effects);
        effects
    }

    fn process_effects(&mut self, effects: &[Effect]) {
        for effect in effects {
            match effect {
                Effect::TutorialComplete => self.tutorial_done = true,
                Effect::GameOver(reason) => {
                    if let Some(game) = &self.game {
                        let stats = SessionStats::from_state(game, *reason, &self.username);
                        self.finish_run(&stats);
                    }
                }
                _ => {}
            }
        }
    }

    /// Report a finished run. Never fatal: every service error is logged
    /// and the results screen proceeds regardless.
    fn finish_run(&mut self, stats: &SessionStats) {
        self.analytics.game_over(stats);
        if self.settings.leaderboard {
            let entry = ScoreEntry {
                username: stats.username.clone(),
                score: stats.score,
                highest_combo: stats.highest_combo,
                targets_cleared: stats.targets_cleared,
                timestamp: now_ms(),
            };
            match self.leaderboard.submit(entry) {
                Ok(rank) => self.last_rank = rank,
                Err(err) => log::warn!("leaderboard submission failed: {err}"),
            }
        }
        if let Err(err) = self.store.clear_run() {
            log::warn!("failed to clear saved run: {err}");
        }
    }

    /// Abandon the run and return home. The dropped state takes any pending
    /// synthesis or reward draw with it.
    pub fn back_to_home(&mut self) {
        if self.game.take().is_some() {
            if let Err(err) = self.store.clear_run() {
                log::warn!("failed to clear saved run: {err}");
            }
        }
        self.screen = Screen::Home;
    }

    /// Snapshot the live run (app backgrounded, shell shutdown)
    pub fn save(&mut self) {
        let Some(game) = &self.game else {
            return;
        };
        if game.is_game_over() || game.in_tutorial() {
            return;
        }
        if let Err(err) = self.store.save_run(game) {
            log::warn!("failed to save run: {err}");
        }
    }

    /// Restore a previously saved run, if one exists and parses
    pub fn try_resume(&mut self) -> bool {
        match self.store.load_run() {
            Ok(Some(mut state)) => {
                state.paused = false;
                self.last_rank = None;
                self.game = Some(state);
                self.screen = Screen::InGame;
                true
            }
            Ok(None) => false,
            Err(err) => {
                log::warn!("failed to load saved run: {err}");
                false
            }
        }
    }

    pub fn personal_best(&self) -> Option<u64> {
        self.leaderboard.top_score().ok().flatten()
    }

    pub fn leaderboard(&self) -> &L {
        &self.leaderboard
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::services::{LogAnalytics, MemoryLeaderboard, MemoryStore, ServiceError};
    use crate::sim::EndReason;

    type TestSession = Session<MemoryLeaderboard, LogAnalytics, MemoryStore>;

    fn session() -> TestSession {
        let settings = Settings {
            tutorial: false,
            ..Default::default()
        };
        Session::new(settings, MemoryLeaderboard::new(), LogAnalytics, MemoryStore::new())
    }

    #[test]
    fn test_starts_on_home() {
        let session = session();
        assert_eq!(session.screen(), Screen::Home);
        assert!(session.game().is_none());
    }

    #[test]
    fn test_first_visit_gets_tutorial_once() {
        let mut session = TestSession::new(
            Settings::default(),
            MemoryLeaderboard::new(),
            LogAnalytics,
            MemoryStore::new(),
        );
        assert!(session.start_game(1).in_tutorial());

        session.set_tutorial_done(true);
        session.back_to_home();
        assert!(!session.start_game(2).in_tutorial());
    }

    #[test]
    fn test_settled_run_reaches_leaderboard() {
        let mut session = session();
        session.start_game(42);
        if let Some(g) = session.game.as_mut() {
            g.score = 750;
        }
        session.handle_input(Input::Settle);
        assert_eq!(session.last_rank, Some(1));
        assert_eq!(session.personal_best(), Some(750));
    }

    #[test]
    fn test_submission_carries_username() {
        let mut session = session();
        session.set_username("ada");
        session.start_game(42);
        if let Some(g) = session.game.as_mut() {
            g.score = 750;
        }
        session.handle_input(Input::Settle);
        let entries = session.leaderboard().entries().unwrap();
        assert_eq!(entries[0].username, "ada");
    }

    #[test]
    fn test_zero_score_settle_reports_no_rank() {
        let mut session = session();
        session.start_game(42);
        session.handle_input(Input::Settle);
        assert_eq!(session.last_rank, None);
    }

    #[test]
    fn test_leaderboard_toggle_suppresses_submission() {
        let mut session = session();
        session.settings.leaderboard = false;
        session.start_game(42);
        if let Some(g) = session.game.as_mut() {
            g.score = 750;
        }
        session.handle_input(Input::Settle);
        assert_eq!(session.last_rank, None);
        assert_eq!(session.personal_best(), None);
    }

    #[test]
    fn test_save_and_resume_roundtrip() {
        let mut session = session();
        session.start_game(42);
        session.tick(TICK_DT);
        let score_before = session.game().unwrap().score;
        session.save();
        session.back_to_home();
        // back_to_home clears the snapshot, so save again via a fresh run
        assert!(!session.try_resume());

        session.start_game(43);
        session.save();
        let remaining = session.game().unwrap().timer.remaining;
        session.game = None;
        session.screen = Screen::Home;

        assert!(session.try_resume());
        assert_eq!(session.screen(), Screen::InGame);
        assert_eq!(session.game().unwrap().score, score_before);
        assert_eq!(session.game().unwrap().timer.remaining, remaining);
    }

    #[test]
    fn test_finished_run_is_not_saved() {
        let mut session = session();
        session.start_game(42);
        session.handle_input(Input::Settle);
        session.save();
        session.game = None;
        assert!(!session.try_resume());
    }

    #[test]
    fn test_abandon_cancels_pending_synthesis() {
        let mut session = session();
        session.start_game(42);
        // Force a pending synthesis by direct state surgery
        let game = session.game.as_mut().unwrap();
        game.grid = crate::sim::Grid::new_fixed(&[3, 1, 6], &[9, 3, 6], &mut game.ids);
        session.handle_input(Input::TapCell { col: 0, row: 0 });
        session.handle_input(Input::TapCell { col: 1, row: 0 });
        session.handle_input(Input::TapCell { col: 0, row: 1 });
        assert!(session.game().unwrap().is_synthesizing());

        session.back_to_home();
        assert!(session.game().is_none());
        // Ticks after abandonment are inert
        assert!(session.tick(TICK_DT).is_empty());
    }

    #[test]
    fn test_service_failure_never_interrupts_game_over() {
        struct FailingBoard;
        impl LeaderboardService for FailingBoard {
            fn submit(&mut self, _: ScoreEntry) -> Result<Option<usize>, ServiceError> {
                Err(ServiceError::Unavailable("offline".into()))
            }
            fn top_score(&self) -> Result<Option<u64>, ServiceError> {
                Err(ServiceError::Unavailable("offline".into()))
            }
            fn entries(&self) -> Result<Vec<ScoreEntry>, ServiceError> {
                Err(ServiceError::Unavailable("offline".into()))
            }
        }

        let settings = Settings {
            tutorial: false,
            ..Default::default()
        };
        let mut session =
            Session::new(settings, FailingBoard, LogAnalytics, MemoryStore::new());
        session.start_game(42);
        let effects = session.handle_input(Input::Settle);
        assert!(effects.contains(&Effect::GameOver(EndReason::Settled)));
        assert_eq!(session.last_rank, None);
        assert!(session.game().unwrap().is_game_over());
    }
}
