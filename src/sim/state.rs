//! Game state and core simulation types
//!
//! All state that must be persisted for save/resume lives here. The RNG is
//! part of the state so a reloaded snapshot continues the exact stream.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::catalog::{SequencerState, TargetData, random_easy_target};
use super::gacha::GachaState;
use super::grid::{Grid, random_digit_cell};
use super::timer::TimerState;
use super::tutorial::TutorialState;
use crate::consts::*;
use crate::settings::{GachaMetric, Settings};

/// Arithmetic operators of the fixed middle column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    pub fn symbol(&self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '×',
            Operator::Div => '÷',
        }
    }
}

/// Opaque cell identity. Never reused; every value rewrite issues a new one,
/// so renderers can diff and animate by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellId(pub u64);

/// Monotone id allocator carried in the game state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdAlloc {
    next: u64,
}

impl IdAlloc {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next(&mut self) -> CellId {
        let id = CellId(self.next);
        self.next += 1;
        id
    }
}

impl Default for IdAlloc {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellValue {
    Number(i64),
    Op(Operator),
}

/// A tile on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub id: CellId,
    pub value: CellValue,
}

impl Cell {
    pub fn number(&self) -> Option<i64> {
        match self.value {
            CellValue::Number(n) => Some(n),
            CellValue::Op(_) => None,
        }
    }
}

/// Where a numeric operand lives. Storage-held number tokens participate in
/// synthesis exactly like grid cells; operators are addressed separately by
/// their row in the fixed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    Grid { col: usize, row: usize },
    Storage { index: usize },
}

/// What a storage slot holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    /// A held digit usable as a synthesis operand
    NumberToken(i64),
    /// Click to add seconds to the countdown
    TimerBoost,
    /// Click to regenerate both numeric columns
    BoardRefresh,
    /// Applied as a score increment the moment it is drawn; never stored
    ScorePack,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageItem {
    pub id: CellId,
    pub kind: ItemKind,
}

/// Counter-gated temporary modifiers from reward events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatusEffects {
    /// Matches left with the timer halved
    pub time_penalty_matches: u8,
    /// Matches left with doubled payout
    pub double_score_matches: u8,
    /// One random grid number is lost (and its refill skipped) on the next match
    pub forced_loss_pending: bool,
}

/// Why the session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndReason {
    TimeUp,
    /// Fewer than two numeric cells remained after a non-match
    Exhausted,
    /// Player forced settlement
    Settled,
}

impl EndReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndReason::TimeUp => "time_up",
            EndReason::Exhausted => "exhausted",
            EndReason::Settled => "settle",
        }
    }
}

/// Deep copy of the board taken when a target is first presented, so a level
/// reset never aliases live state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    pub grid: Grid,
    pub storage: Vec<Option<StorageItem>>,
    pub numbers_used: u32,
}

/// A validated synthesis waiting out the settle lock before committing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingSynthesis {
    pub first: Position,
    pub first_id: CellId,
    pub op: Operator,
    pub second: Position,
    pub second_id: CellId,
    pub result: i64,
    pub ticks_left: u32,
}

/// Complete game state (deterministic, serializable)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    /// Run seed for reproducibility
    pub seed: u64,
    /// The injectable random source; serialized so resume replays the stream
    pub rng: Pcg32,
    pub ids: IdAlloc,
    /// Feature toggles and variants frozen at session start
    pub settings: Settings,

    pub grid: Grid,
    /// One pre-generated replacement digit per numeric column, regenerated at
    /// synthesis time and shifted in on the next successful match
    pub preview: [Cell; 2],

    pub current_target: TargetData,
    pub next_target: TargetData,
    pub sequencer: SequencerState,

    pub score: u64,
    pub combo: u32,
    pub highest_combo: u32,
    /// Last difficulty level a banner was shown for
    pub last_difficulty_level: u32,
    /// Highest target tier presented this session
    pub highest_tier: u8,

    pub selected_num: Option<Position>,
    /// Row into the operator column
    pub selected_op: Option<usize>,

    pub game_over: Option<EndReason>,
    pub paused: bool,

    /// Numeric operands consumed (+2 per attempt, match or not)
    pub numbers_used: u32,
    pub targets_cleared: u32,
    /// Reward draws performed
    pub total_draws: u32,

    pub storage: Vec<Option<StorageItem>>,
    pub level_snapshot: Option<LevelSnapshot>,
    pub tutorial: Option<TutorialState>,

    pub status: StatusEffects,
    pub gacha: GachaState,
    pub timer: TimerState,

    /// The "synthesizing" lock: input is rejected while this is Some
    pub pending: Option<PendingSynthesis>,
}

impl GameState {
    /// Fresh session with the given seed
    pub fn new(seed: u64, settings: Settings) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let mut ids = IdAlloc::new();
        let mut sequencer = SequencerState::new();
        let current_target = sequencer.next(0, &mut rng);
        let next_target = sequencer.next(0, &mut rng);
        let grid = Grid::new_random(&mut rng, &mut ids);
        let preview = [
            random_digit_cell(&mut rng, &mut ids),
            random_digit_cell(&mut rng, &mut ids),
        ];
        let timer = TimerState::for_target(&current_target, &StatusEffects::default(), 0);

        let mut state = Self {
            seed,
            rng,
            ids,
            settings,
            grid,
            preview,
            current_target,
            next_target,
            sequencer,
            score: 0,
            combo: 0,
            highest_combo: 0,
            last_difficulty_level: 0,
            highest_tier: current_target.tier,
            selected_num: None,
            selected_op: None,
            game_over: None,
            paused: false,
            numbers_used: 0,
            targets_cleared: 0,
            total_draws: 0,
            storage: vec![None; STORAGE_SLOTS],
            level_snapshot: None,
            tutorial: None,
            status: StatusEffects::default(),
            gacha: GachaState::default(),
            timer,
            pending: None,
        };
        state.take_level_snapshot();
        state
    }

    /// Scripted tutorial session: fixed board, fixed targets, no snapshot
    pub fn new_tutorial(seed: u64, settings: Settings) -> Self {
        let mut state = Self::new(seed, settings);
        state.grid = Grid::new_fixed(&[3, 1, 6], &[9, 3, 6], &mut state.ids);
        state.current_target = TargetData {
            value: 24,
            tier: 0,
            weight: 2,
        };
        state.next_target = TargetData {
            value: 12,
            tier: 0,
            weight: 2,
        };
        state.tutorial = Some(TutorialState::new());
        state.level_snapshot = None;
        state.timer = TimerState::fixed(TUTORIAL_TIMER_SECONDS);
        state
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over.is_some()
    }

    pub fn is_synthesizing(&self) -> bool {
        self.pending.is_some()
    }

    pub fn in_tutorial(&self) -> bool {
        self.tutorial.is_some()
    }

    /// Numeric cells on the grid plus number tokens in storage
    pub fn numeric_cell_count(&self) -> usize {
        let stored = self
            .storage
            .iter()
            .flatten()
            .filter(|item| matches!(item.kind, ItemKind::NumberToken(_)))
            .count();
        self.grid.numeric_count() + stored
    }

    pub fn first_empty_slot(&self) -> Option<usize> {
        self.storage.iter().position(Option::is_none)
    }

    pub fn has_empty_slot(&self) -> bool {
        self.first_empty_slot().is_some()
    }

    /// Operand value at a position, if it is a usable number
    pub fn value_at(&self, pos: Position) -> Option<i64> {
        match pos {
            Position::Grid { col, row } => self.grid.number_at(col, row)?.number(),
            Position::Storage { index } => match self.storage.get(index)?.as_ref()?.kind {
                ItemKind::NumberToken(n) => Some(n),
                _ => None,
            },
        }
    }

    /// Cell identity at a position, if it is a usable number
    pub fn cell_id_at(&self, pos: Position) -> Option<CellId> {
        match pos {
            Position::Grid { col, row } => Some(self.grid.number_at(col, row)?.id),
            Position::Storage { index } => {
                let item = self.storage.get(index)?.as_ref()?;
                match item.kind {
                    ItemKind::NumberToken(_) => Some(item.id),
                    _ => None,
                }
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected_num = None;
        self.selected_op = None;
    }

    /// Regenerate the preview digits (done at synthesis time)
    pub fn regenerate_preview(&mut self) {
        self.preview = [
            random_digit_cell(&mut self.rng, &mut self.ids),
            random_digit_cell(&mut self.rng, &mut self.ids),
        ];
    }

    /// Record the board as it stands for "reset this level". Short columns
    /// are padded so a reset always restores a full board.
    pub fn take_level_snapshot(&mut self) {
        let grid = self.grid.padded_copy(&mut self.rng, &mut self.ids);
        self.level_snapshot = Some(LevelSnapshot {
            grid,
            storage: self.storage.clone(),
            numbers_used: self.numbers_used,
        });
    }

    /// Restore the level-start board. Keeps score and remaining time, zeroes
    /// the combo, and only restores number tokens into storage (items gained
    /// since the snapshot stay). Returns false if there is no snapshot.
    pub fn restore_level_snapshot(&mut self) -> bool {
        let Some(snapshot) = self.level_snapshot.clone() else {
            return false;
        };
        self.grid = snapshot.grid;
        for (slot, saved) in self.storage.iter_mut().zip(snapshot.storage.iter()) {
            if let Some(item) = saved {
                if matches!(item.kind, ItemKind::NumberToken(_)) {
                    *slot = Some(item.clone());
                }
            }
        }
        self.numbers_used = snapshot.numbers_used;
        self.combo = 0;
        self.clear_selection();
        true
    }

    /// Swap the current target for a random easy one. The board, next target
    /// and timer are untouched; the combo is forfeited.
    pub fn refresh_target(&mut self) {
        self.current_target = random_easy_target(&mut self.rng);
        self.combo = 0;
        self.clear_selection();
    }

    /// The reward-trigger progress counter under the configured metric
    pub fn gacha_counter(&self) -> u32 {
        match self.settings.gacha_metric {
            GachaMetric::NumbersUsed => self.numbers_used,
            GachaMetric::TargetsCleared => self.targets_cleared,
        }
    }
}
