//! Reward (gacha) subsystem
//!
//! Triggered by progression milestones, a draw grants either an inventory
//! item or fires a disruptive/beneficial event. Effects apply the moment the
//! draw resolves; claiming only closes the modal. The trigger latches the
//! counter value immediately so one threshold crossing can never fire twice,
//! and the deferred open re-validates its conditions before presenting.

use rand::Rng;

use serde::{Deserialize, Serialize};

use super::catalog::difficulty_level;
use super::state::{GameState, ItemKind, StorageItem};
use crate::consts::*;

/// Reward modal lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GachaPhase {
    #[default]
    Closed,
    /// Latched trigger waiting out the celebration beat before presenting
    Opening { ticks_left: u32 },
    /// Modal visible, waiting for the player to pull
    Open,
    /// Draw animation running; claim input is ignored
    Drawing { ticks_left: u32 },
    /// Result visible, waiting for the claim
    ResultShown,
}

/// Events the draw can fire instead of an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GachaEvent {
    /// Timer halved for the next TIME_PENALTY_MATCHES targets
    HalveTimer,
    /// Payout doubled for the next DOUBLE_SCORE_MATCHES targets
    DoubleScore,
    /// One random occupied storage slot is emptied
    LoseRandomItem,
    /// A random grid number is lost after the next match, refill skipped
    ForcedNumberLoss,
}

const EVENTS: [GachaEvent; 4] = [
    GachaEvent::HalveTimer,
    GachaEvent::DoubleScore,
    GachaEvent::LoseRandomItem,
    GachaEvent::ForcedNumberLoss,
];

/// What a resolved draw produced (already applied to the state)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawResult {
    Item(ItemKind),
    Event(GachaEvent),
}

/// Reward subsystem state, part of the game snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GachaState {
    pub phase: GachaPhase,
    /// Counter value latched at the last trigger
    pub last_trigger: u32,
    /// Transient result kept until the claim
    pub result: Option<DrawResult>,
}

/// Notifications for the tick loop to translate into effects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GachaSignal {
    ModalOpened,
    ResultReady(DrawResult),
}

/// Item-branch probability, skewed toward events as difficulty climbs
pub fn item_chance(level: u32) -> f64 {
    (ITEM_CHANCE_BASE - ITEM_CHANCE_STEP * level as f64).max(ITEM_CHANCE_MIN)
}

/// Evaluate the trigger after a committed transition. Latches and schedules
/// the deferred open when it fires; returns whether it fired.
pub fn check_trigger(state: &mut GameState) -> bool {
    if !state.settings.gacha {
        return false;
    }
    if state.gacha.phase != GachaPhase::Closed || state.in_tutorial() {
        return false;
    }
    let counter = state.gacha_counter();
    let threshold = state.settings.gacha_threshold();
    if counter < state.gacha.last_trigger + threshold {
        return false;
    }
    if !state.has_empty_slot() {
        return false;
    }
    // Latch immediately so re-evaluations of the same crossing are no-ops
    state.gacha.last_trigger = counter;
    state.gacha.phase = GachaPhase::Opening {
        ticks_left: GACHA_OPEN_DELAY_TICKS,
    };
    log::debug!("gacha trigger latched at counter {counter}");
    true
}

/// Player pulled the lever. Only valid while the modal is open.
pub fn begin_draw(state: &mut GameState) -> bool {
    if state.gacha.phase != GachaPhase::Open {
        return false;
    }
    state.gacha.phase = GachaPhase::Drawing {
        ticks_left: GACHA_DRAW_TICKS,
    };
    true
}

/// Player acknowledged the result. Never re-applies or rolls back the
/// already-applied effect.
pub fn claim(state: &mut GameState) -> bool {
    if state.gacha.phase != GachaPhase::ResultShown {
        return false;
    }
    state.gacha.phase = GachaPhase::Closed;
    state.gacha.result = None;
    true
}

/// Advance the deferred phases by one tick
pub fn tick_phases(state: &mut GameState) -> Option<GachaSignal> {
    match state.gacha.phase {
        GachaPhase::Opening { ticks_left } => {
            if ticks_left > 1 {
                state.gacha.phase = GachaPhase::Opening {
                    ticks_left: ticks_left - 1,
                };
                return None;
            }
            // Conditions may have changed during the delay; re-validate
            // instead of assuming they still hold.
            if state.has_empty_slot() && !state.in_tutorial() {
                state.gacha.phase = GachaPhase::Open;
                Some(GachaSignal::ModalOpened)
            } else {
                log::debug!("gacha open abandoned: conditions no longer hold");
                state.gacha.phase = GachaPhase::Closed;
                None
            }
        }
        GachaPhase::Drawing { ticks_left } => {
            if ticks_left > 1 {
                state.gacha.phase = GachaPhase::Drawing {
                    ticks_left: ticks_left - 1,
                };
                return None;
            }
            let result = resolve_draw(state);
            state.gacha.phase = GachaPhase::ResultShown;
            state.gacha.result = Some(result);
            state.total_draws += 1;
            Some(GachaSignal::ResultReady(result))
        }
        _ => None,
    }
}

/// Roll the draw and apply its outcome to the shared state
fn resolve_draw(state: &mut GameState) -> DrawResult {
    let level = difficulty_level(state.score);
    let roll: f64 = state.rng.random();
    if roll < item_chance(level) {
        let kind = random_item_kind(state);
        apply_item(state, kind);
        log::info!("gacha draw: item {kind:?}");
        DrawResult::Item(kind)
    } else {
        let event = EVENTS[state.rng.random_range(0..EVENTS.len())];
        apply_event(state, event);
        log::info!("gacha draw: event {event:?}");
        DrawResult::Event(event)
    }
}

/// Weighted item pool: number tokens are common, board refreshes rare
fn random_item_kind(state: &mut GameState) -> ItemKind {
    let roll = state.rng.random_range(0..10u32);
    if roll < 4 {
        let digit = state.rng.random_range(DIGIT_MIN..=DIGIT_MAX);
        ItemKind::NumberToken(digit)
    } else if roll < 7 {
        ItemKind::TimerBoost
    } else if roll < 9 {
        ItemKind::ScorePack
    } else {
        ItemKind::BoardRefresh
    }
}

fn apply_item(state: &mut GameState, kind: ItemKind) {
    if kind == ItemKind::ScorePack {
        // Applied on the spot; never occupies a slot
        state.score += SCORE_PACK_POINTS;
        return;
    }
    // Emptiness is re-checked at apply time, not trigger time
    match state.first_empty_slot() {
        Some(slot) => {
            let id = state.ids.next();
            state.storage[slot] = Some(StorageItem { id, kind });
        }
        None => log::warn!("storage full at apply time, dropping {kind:?}"),
    }
}

fn apply_event(state: &mut GameState, event: GachaEvent) {
    match event {
        GachaEvent::HalveTimer => {
            state.status.time_penalty_matches = TIME_PENALTY_MATCHES;
        }
        GachaEvent::DoubleScore => {
            state.status.double_score_matches = DOUBLE_SCORE_MATCHES;
        }
        GachaEvent::LoseRandomItem => {
            let occupied: Vec<usize> = state
                .storage
                .iter()
                .enumerate()
                .filter_map(|(i, slot)| slot.as_ref().map(|_| i))
                .collect();
            if let Some(&slot) = occupied.get(state.rng.random_range(0..occupied.len().max(1))) {
                state.storage[slot] = None;
            }
        }
        GachaEvent::ForcedNumberLoss => {
            state.status.forced_loss_pending = true;
        }
    }
}
