//! Filled-row detection, the timed highlight that precedes a clear, and the
//! drop of everything above the cleared rows.

use std::collections::BTreeMap;

use crate::config::{SCORE_DOUBLE, SCORE_SINGLE, SCORE_TETRIS, SCORE_TRIPLE};
use crate::grid::{CellIndex, Grid};
use crate::piece::SettledPiece;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct RowCell {
    pub index: CellIndex,
    /// Milliseconds after the animation start at which the cell lights up.
    pub reveal_at_ms: u64,
    pub revealed: bool,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RowClearRecord {
    pub row: i32,
    /// Sorted left to right.
    pub cells: Vec<RowCell>,
}

impl RowClearRecord {
    fn new(row: i32, mut indices: Vec<CellIndex>, animation_ms: u64) -> Self {
        indices.sort_unstable();
        let step = animation_ms / indices.len().max(1) as u64;
        let cells = indices
            .into_iter()
            .enumerate()
            .map(|(i, index)| RowCell {
                index,
                reveal_at_ms: step * i as u64,
                revealed: false,
            })
            .collect();
        Self { row, cells }
    }

    pub fn is_finished(&self) -> bool {
        self.cells.iter().all(|cell| cell.revealed)
    }
}

/// Groups settled cells by row and returns one record per full row, top row
/// first.
pub fn detect_filled_rows(
    grid: &Grid,
    settled: &[SettledPiece],
    animation_ms: u64,
) -> Vec<RowClearRecord> {
    let mut rows: BTreeMap<i32, Vec<CellIndex>> = BTreeMap::new();
    for &cell in settled.iter().flat_map(|piece| &piece.cells) {
        rows.entry(grid.row_of(cell)).or_default().push(cell);
    }

    rows.into_iter()
        .filter(|(_, cells)| cells.len() == grid.cols())
        .map(|(row, cells)| RowClearRecord::new(row, cells, animation_ms))
        .collect()
}

/// Marks every cell whose reveal time has passed. Returns whether any row is
/// still animating; the clear waits for all of them.
pub fn advance_animation(records: &[RowClearRecord], elapsed_ms: u64) -> (bool, Vec<RowClearRecord>) {
    let advanced: Vec<RowClearRecord> = records
        .iter()
        .map(|record| RowClearRecord {
            row: record.row,
            cells: record
                .cells
                .iter()
                .map(|cell| RowCell {
                    revealed: cell.reveal_at_ms <= elapsed_ms,
                    ..*cell
                })
                .collect(),
        })
        .collect();
    let still_animating = !advanced.iter().all(RowClearRecord::is_finished);
    (still_animating, advanced)
}

/// Removes the cleared rows and shifts each remaining cell down one row per
/// cleared row below it. Pieces left without cells are dropped.
pub fn apply_clear(
    grid: &Grid,
    settled: Vec<SettledPiece>,
    finished: &[RowClearRecord],
) -> Vec<SettledPiece> {
    let cleared: Vec<i32> = finished.iter().map(|record| record.row).collect();
    let cols = grid.cols() as CellIndex;

    settled
        .into_iter()
        .filter_map(|mut piece| {
            piece.cells = piece
                .cells
                .into_iter()
                .filter(|&cell| !cleared.contains(&grid.row_of(cell)))
                .map(|cell| {
                    let row = grid.row_of(cell);
                    let drop = cleared.iter().filter(|&&r| r > row).count() as CellIndex;
                    cell + drop * cols
                })
                .collect();
            (!piece.cells.is_empty()).then_some(piece)
        })
        .collect()
}

pub fn score_for_rows(rows: usize) -> u32 {
    match rows {
        1 => SCORE_SINGLE,
        2 => SCORE_DOUBLE,
        3 => SCORE_TRIPLE,
        4 => SCORE_TETRIS,
        _ => 0,
    }
}
