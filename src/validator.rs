//! Legality checks for proposed piece positions.
//!
//! Nothing here mutates state. Callers build a proposal, run it through
//! [`is_move_legal`] and only then commit it to the active piece.

use crate::grid::{CellIndex, Grid, PixelRect};

/// True when the cells touch both side walls at once, which only happens when
/// a shift or rotation wrapped part of the piece into the neighbouring row.
pub fn is_wall_collision(grid: &Grid, cells: &[CellIndex]) -> bool {
    let last_col = grid.cols() as i32 - 1;
    cells.iter().any(|&c| grid.column_of(c) == 0)
        && cells.iter().any(|&c| grid.column_of(c) >= last_col)
}

/// Tolerant axis-aligned overlap: two rectangles overlap unless one lies
/// entirely to the left of, right of, above, or below the other. Touching
/// edges do not count.
pub fn rects_overlap(a: PixelRect, b: PixelRect) -> bool {
    let left_of = a.right() <= b.x;
    let right_of = b.right() <= a.x;
    let above = a.bottom() <= b.y;
    let below = b.bottom() <= a.y;
    !(left_of || right_of || above || below)
}

pub fn is_block_collision(grid: &Grid, proposed: &[CellIndex], settled: &[CellIndex]) -> bool {
    proposed.iter().any(|&p| {
        let rect = grid.cell_rect(p);
        settled
            .iter()
            .any(|&s| rects_overlap(rect, grid.cell_rect(s)))
    })
}

pub fn is_move_legal(grid: &Grid, proposed: &[CellIndex], settled: &[CellIndex]) -> bool {
    proposed.iter().all(|&c| grid.is_in_bounds(c))
        && !is_wall_collision(grid, proposed)
        && !is_block_collision(grid, proposed, settled)
}

/// Rejects translations where any cell jumps more than one cell width
/// sideways. Cells are compared pairwise in resolution order.
pub fn is_single_step(grid: &Grid, current: &[CellIndex], proposed: &[CellIndex]) -> bool {
    let max_shift = grid.geometry().cell_width;
    current.len() == proposed.len()
        && current.iter().zip(proposed).all(|(&from, &to)| {
            (grid.cell_rect(to).x - grid.cell_rect(from).x).abs() <= max_shift
        })
}
