//! The 3-column tile board: two numeric columns and one fixed operator column
//!
//! Numeric columns hold 0..=NUM_COLUMN_HEIGHT live cells; consumed cells are
//! removed outright so the vec stays packed toward the visible end. Row 0 is
//! the top slot and replacement cells enter from the top.

use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::state::{Cell, CellId, CellValue, IdAlloc, Operator};
use crate::consts::*;

/// The canonical operator column, top to bottom
pub const OPERATORS: [Operator; OP_COLUMN_HEIGHT] =
    [Operator::Add, Operator::Sub, Operator::Mul, Operator::Div];

/// Roll a fresh digit cell in 1..=9
pub fn random_digit_cell(rng: &mut Pcg32, ids: &mut IdAlloc) -> Cell {
    Cell {
        id: ids.next(),
        value: CellValue::Number(rng.random_range(DIGIT_MIN..=DIGIT_MAX)),
    }
}

/// The tile board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    /// Numeric columns (0 = left, 1 = right), packed, at most NUM_COLUMN_HEIGHT each
    pub cols: [Vec<Cell>; 2],
    /// Fixed operator cells; never consumed or rewritten
    pub ops: [Cell; OP_COLUMN_HEIGHT],
}

impl Grid {
    /// Fresh board: two full columns of random digits plus the operator column
    pub fn new_random(rng: &mut Pcg32, ids: &mut IdAlloc) -> Self {
        let make_col = |rng: &mut Pcg32, ids: &mut IdAlloc| {
            (0..NUM_COLUMN_HEIGHT)
                .map(|_| random_digit_cell(rng, ids))
                .collect::<Vec<_>>()
        };
        Self {
            cols: [make_col(rng, ids), make_col(rng, ids)],
            ops: Self::operator_column(ids),
        }
    }

    /// Fixed board for the scripted tutorial
    pub fn new_fixed(left: &[i64], right: &[i64], ids: &mut IdAlloc) -> Self {
        let make_col = |digits: &[i64], ids: &mut IdAlloc| {
            digits
                .iter()
                .map(|&d| Cell {
                    id: ids.next(),
                    value: CellValue::Number(d),
                })
                .collect::<Vec<_>>()
        };
        Self {
            cols: [make_col(left, ids), make_col(right, ids)],
            ops: Self::operator_column(ids),
        }
    }

    fn operator_column(ids: &mut IdAlloc) -> [Cell; OP_COLUMN_HEIGHT] {
        OPERATORS.map(|op| Cell {
            id: ids.next(),
            value: CellValue::Op(op),
        })
    }

    /// Numeric cell at a column/row, if present
    pub fn number_at(&self, col: usize, row: usize) -> Option<&Cell> {
        self.cols.get(col)?.get(row)
    }

    /// Operator at a row of the fixed column
    pub fn operator_at(&self, row: usize) -> Option<Operator> {
        match self.ops.get(row)?.value {
            CellValue::Op(op) => Some(op),
            CellValue::Number(_) => None,
        }
    }

    /// Live numeric cells across both columns
    pub fn numeric_count(&self) -> usize {
        self.cols.iter().map(Vec::len).sum()
    }

    /// Remove a numeric cell by identity. Returns true if it was present.
    pub fn remove_by_id(&mut self, id: CellId) -> bool {
        for col in &mut self.cols {
            if let Some(row) = col.iter().position(|c| c.id == id) {
                col.remove(row);
                return true;
            }
        }
        false
    }

    /// Rewrite a numeric cell in place with a new value and a fresh identity
    /// (the non-match "merge"). Returns the new id if the cell was found.
    pub fn rewrite_by_id(&mut self, id: CellId, value: i64, ids: &mut IdAlloc) -> Option<CellId> {
        for col in &mut self.cols {
            if let Some(cell) = col.iter_mut().find(|c| c.id == id) {
                cell.id = ids.next();
                cell.value = CellValue::Number(value);
                return Some(cell.id);
            }
        }
        None
    }

    /// Locate a numeric cell by identity
    pub fn find_by_id(&self, id: CellId) -> Option<(usize, usize)> {
        for (col_idx, col) in self.cols.iter().enumerate() {
            if let Some(row) = col.iter().position(|c| c.id == id) {
                return Some((col_idx, row));
            }
        }
        None
    }

    /// Restock both numeric columns after a match: shift in that side's
    /// preview digit first, then top-fill with fresh digits until nominal
    /// height is restored.
    pub fn refill(&mut self, preview: &[Cell; 2], rng: &mut Pcg32, ids: &mut IdAlloc) {
        for (col_idx, col) in self.cols.iter_mut().enumerate() {
            if col.len() < NUM_COLUMN_HEIGHT {
                // Preview cells get a fresh id on placement; ids are never reused
                let mut incoming = preview[col_idx].clone();
                incoming.id = ids.next();
                col.insert(0, incoming);
            }
            while col.len() < NUM_COLUMN_HEIGHT {
                col.insert(0, random_digit_cell(rng, ids));
            }
        }
    }

    /// Remove one uniformly chosen numeric cell (forced-loss attrition).
    /// Returns the removed cell's id, or None on an empty board.
    pub fn remove_random_numeric(&mut self, rng: &mut Pcg32) -> Option<CellId> {
        let total = self.numeric_count();
        if total == 0 {
            return None;
        }
        let pick = rng.random_range(0..total);
        let (col_idx, row) = if pick < self.cols[0].len() {
            (0, pick)
        } else {
            (1, pick - self.cols[0].len())
        };
        let id = self.cols[col_idx][row].id;
        self.cols[col_idx].remove(row);
        Some(id)
    }

    /// Regenerate both numeric columns (the board-refresh item). Operators
    /// are untouched.
    pub fn refresh_numbers(&mut self, rng: &mut Pcg32, ids: &mut IdAlloc) {
        for col in &mut self.cols {
            *col = (0..NUM_COLUMN_HEIGHT)
                .map(|_| random_digit_cell(rng, ids))
                .collect();
        }
    }

    /// Deep copy with short columns padded back to nominal height, used for
    /// level-start snapshots so a reset always restores a full board.
    pub fn padded_copy(&self, rng: &mut Pcg32, ids: &mut IdAlloc) -> Self {
        let mut copy = self.clone();
        for col in &mut copy.cols {
            while col.len() < NUM_COLUMN_HEIGHT {
                col.insert(0, random_digit_cell(rng, ids));
            }
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn fixture() -> (Grid, Pcg32, IdAlloc) {
        let mut rng = Pcg32::seed_from_u64(42);
        let mut ids = IdAlloc::new();
        let grid = Grid::new_random(&mut rng, &mut ids);
        (grid, rng, ids)
    }

    #[test]
    fn test_new_grid_shape() {
        let (grid, _, _) = fixture();
        assert_eq!(grid.cols[0].len(), NUM_COLUMN_HEIGHT);
        assert_eq!(grid.cols[1].len(), NUM_COLUMN_HEIGHT);
        for col in &grid.cols {
            for cell in col {
                match cell.value {
                    CellValue::Number(n) => assert!((DIGIT_MIN..=DIGIT_MAX).contains(&n)),
                    CellValue::Op(_) => panic!("operator in numeric column"),
                }
            }
        }
        assert_eq!(grid.operator_at(0), Some(Operator::Add));
        assert_eq!(grid.operator_at(3), Some(Operator::Div));
    }

    #[test]
    fn test_remove_and_refill_consumes_preview() {
        let (mut grid, mut rng, mut ids) = fixture();
        let preview = [
            random_digit_cell(&mut rng, &mut ids),
            random_digit_cell(&mut rng, &mut ids),
        ];
        let removed = grid.cols[0][1].id;
        assert!(grid.remove_by_id(removed));
        assert_eq!(grid.cols[0].len(), NUM_COLUMN_HEIGHT - 1);

        grid.refill(&preview, &mut rng, &mut ids);
        assert_eq!(grid.cols[0].len(), NUM_COLUMN_HEIGHT);
        assert_eq!(grid.cols[1].len(), NUM_COLUMN_HEIGHT);
        // The shifted-in cell carries the preview value but a fresh id
        assert_eq!(grid.cols[0][0].value, preview[0].value);
        assert_ne!(grid.cols[0][0].id, preview[0].id);
    }

    #[test]
    fn test_rewrite_issues_new_id() {
        let (mut grid, _, mut ids) = fixture();
        let old = grid.cols[1][0].id;
        let new = grid.rewrite_by_id(old, 77, &mut ids).unwrap();
        assert_ne!(old, new);
        assert_eq!(grid.cols[1][0].value, CellValue::Number(77));
        assert!(grid.find_by_id(old).is_none());
    }

    #[test]
    fn test_remove_random_numeric_shrinks_board() {
        let (mut grid, mut rng, _) = fixture();
        let before = grid.numeric_count();
        let removed = grid.remove_random_numeric(&mut rng);
        assert!(removed.is_some());
        assert_eq!(grid.numeric_count(), before - 1);
    }

    #[test]
    fn test_refresh_numbers_keeps_operators() {
        let (mut grid, mut rng, mut ids) = fixture();
        let ops_before = grid.ops.clone();
        grid.refresh_numbers(&mut rng, &mut ids);
        assert_eq!(grid.ops, ops_before);
        assert_eq!(grid.numeric_count(), 2 * NUM_COLUMN_HEIGHT);
    }
}
