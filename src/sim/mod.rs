//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable cell identity (monotone id allocator)
//! - No rendering or platform dependencies

pub mod catalog;
pub mod gacha;
pub mod grid;
pub mod state;
pub mod synth;
pub mod tick;
pub mod timer;
pub mod tutorial;

pub use catalog::{PatternKind, SequencerState, TargetData, difficulty_level};
pub use gacha::{DrawResult, GachaEvent, GachaPhase, GachaState};
pub use grid::Grid;
pub use state::{
    Cell, CellId, CellValue, EndReason, GameState, ItemKind, Operator, Position, StatusEffects,
    StorageItem,
};
pub use synth::{CommitOutcome, Rejection, evaluate};
pub use tick::{Effect, Input, Sound, handle_input, tick};
pub use timer::TimerState;
pub use tutorial::TutorialState;
