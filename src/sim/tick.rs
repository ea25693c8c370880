//! Fixed timestep simulation tick and input dispatch
//!
//! All mutation funnels through `handle_input` and `tick`. Both return the
//! effects the shell should execute (sounds, toasts, modal opens), so timing
//! correctness never depends on a UI framework's render cadence. Deferred
//! work (the synthesis settle lock, the reward draw beats) is counted down
//! in ticks rather than scheduled as callbacks; dropping the state cancels
//! everything in flight.

use super::gacha::{self, DrawResult, GachaPhase, GachaSignal};
use super::state::{EndReason, GameState, ItemKind, Position};
use super::synth::{self, Rejection};
use crate::consts::*;

/// One player input event. Board columns are addressed as rendered:
/// 0 = left numbers, 1 = the fixed operator column, 2 = right numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    TapCell { col: usize, row: usize },
    TapStorage { index: usize },
    /// Pull the lever on the open reward modal
    GachaDraw,
    /// Acknowledge the reward result
    GachaClaim,
    /// Restore the level-start board (combo forfeited, timer untouched)
    ResetLevel,
    /// Swap the current target for a random easy one
    RefreshTarget,
    Pause,
    Resume,
    /// Acknowledge a tutorial hint screen
    AdvanceTutorial,
    /// Bank the score and end the run
    Settle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    Fusion,
    Success,
    Error,
}

/// Side effects for the shell to execute after a committed transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Sound(Sound),
    /// Transient toast for a rejected attempt
    Rejected(Rejection),
    TimerAdded(u32),
    BoardRefreshed,
    ScorePopup(u64),
    /// Score crossed a difficulty threshold
    DifficultyBanner(u32),
    GachaOpened,
    GachaResolved(DrawResult),
    TutorialComplete,
    GameOver(EndReason),
}

/// Apply one input event
pub fn handle_input(state: &mut GameState, input: Input) -> Vec<Effect> {
    let mut effects = Vec::new();
    match input {
        Input::TapCell { col, row } => handle_cell_tap(state, col, row, &mut effects),
        Input::TapStorage { index } => handle_storage_tap(state, index, &mut effects),
        Input::GachaDraw => {
            gacha::begin_draw(state);
        }
        Input::GachaClaim => {
            gacha::claim(state);
        }
        Input::ResetLevel => {
            if !state.is_game_over() && !state.is_synthesizing() && !state.in_tutorial() {
                state.restore_level_snapshot();
            }
        }
        Input::RefreshTarget => {
            if !state.is_game_over() && !state.is_synthesizing() && !state.in_tutorial() {
                state.refresh_target();
            }
        }
        Input::Pause => {
            if !state.is_game_over() {
                state.paused = true;
            }
        }
        Input::Resume => {
            state.paused = false;
        }
        Input::AdvanceTutorial => {
            if let Some(tutorial) = &mut state.tutorial {
                tutorial.advance_hint();
            }
        }
        Input::Settle => {
            if !state.is_game_over() {
                state.game_over = Some(EndReason::Settled);
                effects.push(Effect::GameOver(EndReason::Settled));
            }
        }
    }
    effects
}

fn handle_cell_tap(state: &mut GameState, col: usize, row: usize, effects: &mut Vec<Effect>) {
    if state.is_game_over() || state.paused || state.is_synthesizing() {
        return;
    }
    if let Some(tutorial) = &mut state.tutorial {
        // Only the scripted taps get through
        if !tutorial.accept_tap(col, row) {
            return;
        }
    }

    if col == 1 {
        // Operator column: needs a pending number; re-tapping clears it
        if state.selected_num.is_none() {
            return;
        }
        if state.selected_op == Some(row) {
            state.selected_op = None;
            return;
        }
        if row < OP_COLUMN_HEIGHT {
            state.selected_op = Some(row);
        }
        return;
    }

    let grid_col = match col {
        0 => 0,
        2 => 1,
        _ => return,
    };
    let pos = Position::Grid { col: grid_col, row };
    if state.grid.number_at(grid_col, row).is_none() {
        return;
    }
    select_number(state, pos, effects);
}

fn handle_storage_tap(state: &mut GameState, index: usize, effects: &mut Vec<Effect>) {
    if state.is_game_over() || state.paused || state.is_synthesizing() || state.in_tutorial() {
        return;
    }
    if !state.settings.storage {
        return;
    }
    let Some(Some(item)) = state.storage.get(index) else {
        return;
    };
    match item.kind {
        ItemKind::NumberToken(_) => {
            select_number(state, Position::Storage { index }, effects);
        }
        ItemKind::TimerBoost => {
            state.timer.add_time(TIMER_BOOST_SECONDS);
            state.storage[index] = None;
            effects.push(Effect::TimerAdded(TIMER_BOOST_SECONDS as u32));
        }
        ItemKind::BoardRefresh => {
            state.storage[index] = None;
            state.clear_selection();
            state.grid.refresh_numbers(&mut state.rng, &mut state.ids);
            effects.push(Effect::BoardRefreshed);
        }
        ItemKind::ScorePack => {
            // Score packs apply at draw time; one in storage is a bug
            log::warn!("score pack found in storage slot {index}, ignoring");
        }
    }
}

/// Shared selection logic for grid cells and storage number tokens
fn select_number(state: &mut GameState, pos: Position, effects: &mut Vec<Effect>) {
    // Re-tapping the pending number clears the whole selection
    if state.selected_num == Some(pos) {
        state.clear_selection();
        return;
    }
    // Number + operator already pending: this tap is the second operand
    if let (Some(first), Some(op_row)) = (state.selected_num, state.selected_op) {
        if let Err(reason) = synth::attempt(state, first, op_row, pos) {
            effects.push(Effect::Sound(Sound::Error));
            effects.push(Effect::Rejected(reason));
        }
        return;
    }
    state.selected_num = Some(pos);
}

/// Advance the simulation by one fixed timestep
pub fn tick(state: &mut GameState, dt: f32) -> Vec<Effect> {
    let mut effects = Vec::new();
    if state.is_game_over() {
        return effects;
    }

    // Settle lock countdown and deferred commit
    let commit_now = match &mut state.pending {
        Some(pending) => {
            pending.ticks_left = pending.ticks_left.saturating_sub(1);
            pending.ticks_left == 0
        }
        None => false,
    };
    if commit_now {
        if let Some(outcome) = synth::commit_pending(state) {
            effects.push(Effect::Sound(Sound::Fusion));
            if outcome.tutorial_complete {
                effects.push(Effect::TutorialComplete);
            } else if outcome.matched {
                effects.push(Effect::Sound(Sound::Success));
                effects.push(Effect::ScorePopup(outcome.payout));
                if let Some(level) = outcome.level_up {
                    effects.push(Effect::DifficultyBanner(level));
                }
            }
            if outcome.exhausted {
                effects.push(Effect::GameOver(EndReason::Exhausted));
            }
            // Both counters may have moved; evaluate the reward trigger once
            // per committed transition.
            gacha::check_trigger(state);
        }
    }

    // Reward modal deferred phases
    match gacha::tick_phases(state) {
        Some(GachaSignal::ModalOpened) => effects.push(Effect::GachaOpened),
        Some(GachaSignal::ResultReady(result)) => {
            if result == DrawResult::Item(ItemKind::ScorePack) {
                effects.push(Effect::ScorePopup(SCORE_PACK_POINTS));
            }
            effects.push(Effect::GachaResolved(result));
        }
        None => {}
    }

    // Countdown
    if timer_active(state) && state.timer.tick(dt) {
        state.game_over = Some(EndReason::TimeUp);
        effects.push(Effect::GameOver(EndReason::TimeUp));
    }

    effects
}

/// The countdown only runs during undisturbed play
fn timer_active(state: &GameState) -> bool {
    state.settings.timer
        && !state.paused
        && !state.is_synthesizing()
        && !state.in_tutorial()
        && matches!(state.gacha.phase, GachaPhase::Closed | GachaPhase::Opening { .. })
}

#[cfg(test)]
mod tests {
    use super::super::grid::Grid;
    use super::super::state::CellValue;
    use super::*;
    use crate::settings::Settings;
    use crate::sim::catalog::TargetData;

    fn fixture(left: &[i64], right: &[i64], target: i64) -> GameState {
        let mut state = GameState::new(123, Settings::default());
        state.grid = Grid::new_fixed(left, right, &mut state.ids);
        state.current_target = TargetData {
            value: target,
            tier: 0,
            weight: 2,
        };
        state
    }

    fn run_ticks(state: &mut GameState, n: u32) -> Vec<Effect> {
        let mut effects = Vec::new();
        for _ in 0..n {
            effects.extend(tick(state, TICK_DT));
        }
        effects
    }

    #[test]
    fn test_tap_sequence_schedules_and_commits() {
        // Scenario: 3 at (0,0), '+' at (1,0), 1 at (0,1); target 4
        let mut state = fixture(&[3, 1, 6], &[9, 3, 6], 4);
        handle_input(&mut state, Input::TapCell { col: 0, row: 0 });
        assert_eq!(state.selected_num, Some(Position::Grid { col: 0, row: 0 }));
        handle_input(&mut state, Input::TapCell { col: 1, row: 0 });
        assert_eq!(state.selected_op, Some(0));
        handle_input(&mut state, Input::TapCell { col: 0, row: 1 });
        assert!(state.is_synthesizing());

        let effects = run_ticks(&mut state, SETTLE_TICKS);
        assert!(effects.contains(&Effect::Sound(Sound::Success)));
        assert!(effects.contains(&Effect::ScorePopup(100)));
        assert_eq!(state.score, 100);
        assert_eq!(state.combo, 1);
    }

    #[test]
    fn test_retap_number_toggles_selection_off() {
        let mut state = fixture(&[3, 1, 6], &[9, 3, 6], 4);
        handle_input(&mut state, Input::TapCell { col: 0, row: 0 });
        handle_input(&mut state, Input::TapCell { col: 1, row: 0 });
        handle_input(&mut state, Input::TapCell { col: 0, row: 0 });
        assert!(state.selected_num.is_none());
        assert!(state.selected_op.is_none());
    }

    #[test]
    fn test_retap_operator_clears_only_operator() {
        let mut state = fixture(&[3, 1, 6], &[9, 3, 6], 4);
        handle_input(&mut state, Input::TapCell { col: 0, row: 0 });
        handle_input(&mut state, Input::TapCell { col: 1, row: 2 });
        handle_input(&mut state, Input::TapCell { col: 1, row: 2 });
        assert!(state.selected_op.is_none());
        assert_eq!(state.selected_num, Some(Position::Grid { col: 0, row: 0 }));
    }

    #[test]
    fn test_out_of_range_column_ignored() {
        let mut state = fixture(&[3, 1, 6], &[9, 3, 6], 4);
        handle_input(&mut state, Input::TapCell { col: 7, row: 0 });
        assert!(state.selected_num.is_none());
        // Out-of-range rows are equally inert
        handle_input(&mut state, Input::TapCell { col: 0, row: 9 });
        assert!(state.selected_num.is_none());
    }

    #[test]
    fn test_operator_requires_pending_number() {
        let mut state = fixture(&[3, 1, 6], &[9, 3, 6], 4);
        handle_input(&mut state, Input::TapCell { col: 1, row: 0 });
        assert!(state.selected_op.is_none());
    }

    #[test]
    fn test_taps_ignored_while_synthesizing() {
        let mut state = fixture(&[3, 1, 6], &[9, 3, 6], 24);
        handle_input(&mut state, Input::TapCell { col: 0, row: 0 });
        handle_input(&mut state, Input::TapCell { col: 1, row: 0 });
        handle_input(&mut state, Input::TapCell { col: 0, row: 1 });
        assert!(state.is_synthesizing());

        // Rapid re-taps during the lock do nothing
        let before = state.clone();
        let effects = handle_input(&mut state, Input::TapCell { col: 2, row: 0 });
        assert!(effects.is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn test_rejection_surfaces_error_effect() {
        // 1 - 3 would be negative
        let mut state = fixture(&[3, 1, 6], &[9, 3, 6], 4);
        handle_input(&mut state, Input::TapCell { col: 0, row: 1 });
        handle_input(&mut state, Input::TapCell { col: 1, row: 1 });
        let effects = handle_input(&mut state, Input::TapCell { col: 0, row: 0 });
        assert!(effects.contains(&Effect::Sound(Sound::Error)));
        assert!(effects.contains(&Effect::Rejected(Rejection::NegativeResult)));
        assert!(!state.is_synthesizing());
        assert_eq!(state.score, 0);
    }

    #[test]
    fn test_timer_pauses_during_settle_lock_and_modal() {
        let mut state = fixture(&[3, 1, 6], &[9, 3, 6], 24);
        let before = state.timer.remaining;
        handle_input(&mut state, Input::TapCell { col: 0, row: 0 });
        handle_input(&mut state, Input::TapCell { col: 1, row: 0 });
        handle_input(&mut state, Input::TapCell { col: 0, row: 1 });
        // One tick inside the lock: countdown frozen
        tick(&mut state, TICK_DT);
        assert_eq!(state.timer.remaining, before);

        state.gacha.phase = GachaPhase::Open;
        run_ticks(&mut state, 10);
        assert_eq!(state.timer.remaining, before);
    }

    #[test]
    fn test_time_up_fires_once_and_ends_game() {
        let mut state = fixture(&[3, 1, 6], &[9, 3, 6], 4);
        state.timer = crate::sim::timer::TimerState::fixed(0.2);
        let effects = run_ticks(&mut state, 10);
        let fired = effects
            .iter()
            .filter(|e| matches!(e, Effect::GameOver(EndReason::TimeUp)))
            .count();
        assert_eq!(fired, 1);
        assert!(state.is_game_over());
    }

    #[test]
    fn test_settle_wins_over_pending_commit() {
        let mut state = fixture(&[3, 1, 6], &[9, 3, 6], 4);
        handle_input(&mut state, Input::TapCell { col: 0, row: 0 });
        handle_input(&mut state, Input::TapCell { col: 1, row: 0 });
        handle_input(&mut state, Input::TapCell { col: 0, row: 1 });
        let effects = handle_input(&mut state, Input::Settle);
        assert!(effects.contains(&Effect::GameOver(EndReason::Settled)));
        // The in-flight commit becomes a no-op
        run_ticks(&mut state, SETTLE_TICKS + 2);
        assert_eq!(state.score, 0);
        assert_eq!(state.targets_cleared, 0);
    }

    #[test]
    fn test_gacha_trigger_latches_once() {
        // Scenario 5: a single threshold crossing opens the modal exactly once
        let mut state = fixture(&[3, 1, 6], &[9, 3, 6], 4);
        state.targets_cleared = GACHA_TARGETS_THRESHOLD - 1;

        handle_input(&mut state, Input::TapCell { col: 0, row: 0 });
        handle_input(&mut state, Input::TapCell { col: 1, row: 0 });
        handle_input(&mut state, Input::TapCell { col: 0, row: 1 });
        let effects = run_ticks(&mut state, SETTLE_TICKS + GACHA_OPEN_DELAY_TICKS + 4);

        let opens = effects
            .iter()
            .filter(|e| matches!(e, Effect::GachaOpened))
            .count();
        assert_eq!(opens, 1);
        assert_eq!(state.gacha.phase, GachaPhase::Open);

        // Extra ticks (intervening renders) never reopen it
        handle_input(&mut state, Input::GachaDraw);
        let effects = run_ticks(&mut state, GACHA_DRAW_TICKS + 4);
        assert!(effects.iter().any(|e| matches!(e, Effect::GachaResolved(_))));
        handle_input(&mut state, Input::GachaClaim);
        let effects = run_ticks(&mut state, 20);
        assert!(!effects.contains(&Effect::GachaOpened));
    }

    #[test]
    fn test_timer_boost_item_consumed_on_use() {
        let mut state = fixture(&[3, 1, 6], &[9, 3, 6], 4);
        state.timer.remaining = 10.0;
        let id = state.ids.next();
        state.storage[0] = Some(super::super::state::StorageItem {
            id,
            kind: ItemKind::TimerBoost,
        });
        let effects = handle_input(&mut state, Input::TapStorage { index: 0 });
        assert!(effects.contains(&Effect::TimerAdded(TIMER_BOOST_SECONDS as u32)));
        assert_eq!(state.timer.remaining, 10.0 + TIMER_BOOST_SECONDS);
        assert!(state.storage[0].is_none());
    }

    #[test]
    fn test_board_refresh_item_regenerates_numbers() {
        let mut state = fixture(&[3, 1, 6], &[9, 3, 6], 4);
        let id = state.ids.next();
        state.storage[1] = Some(super::super::state::StorageItem {
            id,
            kind: ItemKind::BoardRefresh,
        });
        let score = state.score;
        let target = state.current_target;
        let effects = handle_input(&mut state, Input::TapStorage { index: 1 });
        assert!(effects.contains(&Effect::BoardRefreshed));
        assert!(state.storage[1].is_none());
        assert_eq!(state.grid.numeric_count(), 2 * NUM_COLUMN_HEIGHT);
        assert_eq!(state.score, score);
        assert_eq!(state.current_target, target);
    }

    #[test]
    fn test_tutorial_walkthrough_completes() {
        let mut state = GameState::new_tutorial(9, Settings::default());
        // Acknowledge the hint screens
        for _ in 0..crate::sim::tutorial::HINT_STEPS {
            handle_input(&mut state, Input::AdvanceTutorial);
        }
        // Off-script taps are ignored
        handle_input(&mut state, Input::TapCell { col: 2, row: 0 });
        assert!(state.selected_num.is_none());

        // Scripted: 3 + 1 merges into 4
        handle_input(&mut state, Input::TapCell { col: 0, row: 0 });
        handle_input(&mut state, Input::TapCell { col: 1, row: 0 });
        handle_input(&mut state, Input::TapCell { col: 0, row: 1 });
        run_ticks(&mut state, SETTLE_TICKS);
        assert_eq!(
            state.grid.cols[0][0].value,
            CellValue::Number(4),
            "merge leaves the intermediate result"
        );

        // Toggle the result off and back on, then 4 × 6 = 24
        handle_input(&mut state, Input::TapCell { col: 0, row: 0 });
        handle_input(&mut state, Input::TapCell { col: 0, row: 0 });
        handle_input(&mut state, Input::TapCell { col: 1, row: 2 });
        handle_input(&mut state, Input::TapCell { col: 2, row: 2 });
        let effects = run_ticks(&mut state, SETTLE_TICKS);
        assert!(effects.contains(&Effect::TutorialComplete));
        assert!(!state.in_tutorial());
    }

    #[test]
    fn test_determinism() {
        let inputs = [
            Input::TapCell { col: 0, row: 0 },
            Input::TapCell { col: 1, row: 0 },
            Input::TapCell { col: 0, row: 1 },
        ];
        let mut a = GameState::new(777, Settings::default());
        let mut b = GameState::new(777, Settings::default());
        for input in inputs {
            handle_input(&mut a, input);
            handle_input(&mut b, input);
            tick(&mut a, TICK_DT);
            tick(&mut b, TICK_DT);
        }
        let more_a = run_ticks(&mut a, 50);
        let more_b = run_ticks(&mut b, 50);
        assert_eq!(a, b);
        assert_eq!(more_a, more_b);
    }
}
