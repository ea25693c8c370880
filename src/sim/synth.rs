//! Synthesis engine
//!
//! Validates a (number, operator, number) triple, computes the result and
//! commits the mutation after the settle lock runs out. Invalid attempts
//! never mutate score, grid or combo; they clear the pending selection and
//! report a typed rejection for display. Division is fail-fast: a non-exact
//! or zero divisor rejects the attempt instead of silently truncating.

use super::catalog::difficulty_level;
use super::state::{
    CellId, EndReason, GameState, ItemKind, Operator, PendingSynthesis, Position, StorageItem,
};
use crate::consts::*;

/// Why an attempt was turned down. Recovered locally; surfaced as a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    DivideByZero,
    NotDivisible,
    NegativeResult,
    /// Chained merges can grow tiles without bound; a result past i64 range
    /// is rejected like any other bad arithmetic
    Overflow,
    /// Settle lock held; concurrent attempts are dropped, never queued
    Locked,
    GameOver,
    Paused,
    /// An operand position did not hold a usable number
    SelectionIncomplete,
}

impl Rejection {
    pub fn message(&self) -> &'static str {
        match self {
            Rejection::DivideByZero => "Cannot divide by zero",
            Rejection::NotDivisible => "Not exactly divisible",
            Rejection::NegativeResult => "Result would be negative",
            Rejection::Overflow => "Result is too large",
            Rejection::Locked => "Still synthesizing",
            Rejection::GameOver => "The round is over",
            Rejection::Paused => "Game is paused",
            Rejection::SelectionIncomplete => "Pick two numbers and an operator",
        }
    }
}

/// Evaluate `a OP b` under the synthesis rules
pub fn evaluate(op: Operator, a: i64, b: i64) -> Result<i64, Rejection> {
    let result = match op {
        Operator::Add => a.checked_add(b).ok_or(Rejection::Overflow)?,
        Operator::Sub => a.checked_sub(b).ok_or(Rejection::Overflow)?,
        Operator::Mul => a.checked_mul(b).ok_or(Rejection::Overflow)?,
        Operator::Div => {
            if b == 0 {
                return Err(Rejection::DivideByZero);
            }
            if a % b != 0 {
                return Err(Rejection::NotDivisible);
            }
            a / b
        }
    };
    if result < 0 {
        return Err(Rejection::NegativeResult);
    }
    Ok(result)
}

/// What a committed synthesis did, for the tick loop to turn into effects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitOutcome {
    pub matched: bool,
    /// Points awarded (zero on a non-match)
    pub payout: u64,
    /// Set when the payout pushed the score over a difficulty threshold
    pub level_up: Option<u32>,
    /// No valid move remained after a non-match
    pub exhausted: bool,
    /// The scripted tutorial match landed
    pub tutorial_complete: bool,
}

/// Validate an attempt and, if accepted, schedule its deferred commit.
///
/// Arithmetic rejections clear the pending selection; guard rejections
/// (locked, paused, over) leave the state untouched.
pub fn attempt(
    state: &mut GameState,
    first: Position,
    op_row: usize,
    second: Position,
) -> Result<(), Rejection> {
    if state.is_game_over() {
        return Err(Rejection::GameOver);
    }
    if state.paused {
        return Err(Rejection::Paused);
    }
    if state.is_synthesizing() {
        return Err(Rejection::Locked);
    }

    let (Some(a), Some(first_id)) = (state.value_at(first), state.cell_id_at(first)) else {
        state.clear_selection();
        return Err(Rejection::SelectionIncomplete);
    };
    let (Some(b), Some(second_id)) = (state.value_at(second), state.cell_id_at(second)) else {
        state.clear_selection();
        return Err(Rejection::SelectionIncomplete);
    };
    let Some(op) = state.grid.operator_at(op_row) else {
        state.clear_selection();
        return Err(Rejection::SelectionIncomplete);
    };

    let result = match evaluate(op, a, b) {
        Ok(result) => result,
        Err(reason) => {
            state.clear_selection();
            return Err(reason);
        }
    };

    state.pending = Some(PendingSynthesis {
        first,
        first_id,
        op,
        second,
        second_id,
        result,
        ticks_left: SETTLE_TICKS,
    });
    log::debug!("synthesis scheduled: {a} {} {b} = {result}", op.symbol());
    Ok(())
}

fn remove_operand(state: &mut GameState, pos: Position, id: CellId) {
    match pos {
        Position::Grid { .. } => {
            state.grid.remove_by_id(id);
        }
        Position::Storage { index } => {
            if let Some(slot) = state.storage.get_mut(index) {
                *slot = None;
            }
        }
    }
}

/// Commit the pending synthesis. Called by the tick loop once the settle
/// lock runs out; a game-over that landed first wins and this is a no-op.
pub fn commit_pending(state: &mut GameState) -> Option<CommitOutcome> {
    let pending = state.pending.take()?;
    if state.is_game_over() {
        return None;
    }

    let matched = pending.result == state.current_target.value;

    // The scripted tutorial ends on its match; the board is discarded and the
    // shell starts a real session.
    if matched && state.in_tutorial() {
        state.tutorial = None;
        state.clear_selection();
        return Some(CommitOutcome {
            matched: true,
            payout: 0,
            level_up: None,
            exhausted: false,
            tutorial_complete: true,
        });
    }

    state.numbers_used += 2;
    remove_operand(state, pending.first, pending.first_id);

    if matched {
        remove_operand(state, pending.second, pending.second_id);
        let outcome = apply_match(state);
        Some(outcome)
    } else {
        apply_merge(state, &pending);
        let exhausted = state.numeric_cell_count() < 2;
        if exhausted {
            state.game_over = Some(EndReason::Exhausted);
        }
        Some(CommitOutcome {
            matched: false,
            payout: 0,
            level_up: None,
            exhausted,
            tutorial_complete: false,
        })
    }
}

/// Both operands consumed; score, combo, target, timer and board advance
fn apply_match(state: &mut GameState) -> CommitOutcome {
    let combo_bonus = if state.settings.combo {
        (state.combo as u64 * COMBO_SCORE_BONUS).min(COMBO_BONUS_CAP)
    } else {
        0
    };
    let mut payout = state.current_target.weight as u64 * BASE_SCORE_MULTIPLIER + combo_bonus;
    if state.status.double_score_matches > 0 {
        payout *= 2;
        state.status.double_score_matches -= 1;
    }
    state.score += payout;
    if state.settings.combo {
        state.combo += 1;
        state.highest_combo = state.highest_combo.max(state.combo);
    }
    state.targets_cleared += 1;
    state.status.time_penalty_matches = state.status.time_penalty_matches.saturating_sub(1);

    // Forced-loss attrition: one random number gone, its refill skipped for
    // exactly this cycle; nominal height is restored on the next match.
    if state.status.forced_loss_pending {
        state.grid.remove_random_numeric(&mut state.rng);
        state.status.forced_loss_pending = false;
    } else {
        let preview = state.preview.clone();
        state.grid.refill(&preview, &mut state.rng, &mut state.ids);
    }
    state.regenerate_preview();

    let level = difficulty_level(state.score);
    let level_up = (level > state.last_difficulty_level).then_some(level);
    state.last_difficulty_level = level;

    state.current_target = state.next_target;
    state.highest_tier = state.highest_tier.max(state.current_target.tier);
    state.next_target = state.sequencer.next(state.score, &mut state.rng);

    // Penalty already decremented above, so the new duration reflects the
    // remaining count. Failed attempts never reset the timer; matches do.
    let current = state.current_target;
    state.timer.reset_for(&current, &state.status, level);

    state.take_level_snapshot();
    state.clear_selection();

    CommitOutcome {
        matched: true,
        payout,
        level_up,
        exhausted: false,
        tutorial_complete: false,
    }
}

/// Non-match: the second operand's cell is rewritten in place with the
/// result under a fresh identity and becomes the new pending selection, so
/// the player can chain straight onto the intermediate value.
fn apply_merge(state: &mut GameState, pending: &PendingSynthesis) {
    state.combo = 0;
    state.selected_op = None;
    state.selected_num = None;

    match pending.second {
        Position::Grid { .. } => {
            if let Some(new_id) =
                state
                    .grid
                    .rewrite_by_id(pending.second_id, pending.result, &mut state.ids)
            {
                if let Some((col, row)) = state.grid.find_by_id(new_id) {
                    state.selected_num = Some(Position::Grid { col, row });
                }
            }
        }
        Position::Storage { index } => {
            if let Some(slot) = state.storage.get_mut(index) {
                let id = state.ids.next();
                *slot = Some(StorageItem {
                    id,
                    kind: ItemKind::NumberToken(pending.result),
                });
                state.selected_num = Some(Position::Storage { index });
            }
        }
    }
}
