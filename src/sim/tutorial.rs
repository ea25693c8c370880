//! Scripted tutorial walkthrough
//!
//! A fixed linear overlay sequence driven by the same state machine as real
//! play. The first steps are hint screens acknowledged by the player; after
//! that only the scripted taps are accepted. The timer and the reward
//! subsystem stay inactive throughout.

use serde::{Deserialize, Serialize};

/// Hint-only steps before the board becomes interactive
pub const HINT_STEPS: usize = 4;

/// Expected taps once interactive, as (ui column, row): ui column 0 = left
/// numbers, 1 = operators, 2 = right numbers.
///
/// On the fixed board (left 3/1/6, right 9/3/6, target 24) this walks the
/// player through 3 + 1 = 4 (a deliberate non-match that merges into a 4),
/// a deselect/reselect of the result tile, then 4 × 6 = 24. The merge
/// consumes the 3, so the result tile sits at the top row afterwards.
pub const SCRIPT: &[(usize, usize)] = &[
    (0, 0), // select 3
    (1, 0), // operator +
    (0, 1), // second operand 1 -> merges to 4
    (0, 0), // toggle the result tile off
    (0, 0), // and back on
    (1, 2), // operator ×
    (2, 2), // second operand 6 -> 24, match
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorialState {
    /// Current step: hint screens first, then one step per scripted tap
    pub step: usize,
}

impl TutorialState {
    pub fn new() -> Self {
        Self { step: 0 }
    }

    /// Still on the acknowledge-to-continue hint screens
    pub fn in_hints(&self) -> bool {
        self.step < HINT_STEPS
    }

    /// Acknowledge a hint screen
    pub fn advance_hint(&mut self) {
        if self.in_hints() {
            self.step += 1;
        }
    }

    /// Whether a tap at (ui_col, row) is the scripted one; advances the
    /// script when it is. Off-script taps are ignored by the caller.
    pub fn accept_tap(&mut self, ui_col: usize, row: usize) -> bool {
        if self.in_hints() {
            return false;
        }
        let index = self.step - HINT_STEPS;
        match SCRIPT.get(index) {
            Some(&(c, r)) if c == ui_col && r == row => {
                self.step += 1;
                true
            }
            _ => false,
        }
    }
}

impl Default for TutorialState {
    fn default() -> Self {
        Self::new()
    }
}
