use crate::config::PixelGeometry;

/// Linear cell index, `col + row * cols`. Signed so that proposals reaching
/// above the top row stay representable until the bounds check rejects them.
pub type CellIndex = i32;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Position {
    pub col: i32,
    pub row: i32,
}

impl Position {
    pub fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    pub fn offset(self, dcol: i32, drow: i32) -> Self {
        Self {
            col: self.col + dcol,
            row: self.row + drow,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PixelPoint {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }
}

/// Logical cell lattice plus the pixel origin of every cell.
#[derive(Clone, Debug)]
pub struct Grid {
    cols: usize,
    rows: usize,
    geometry: PixelGeometry,
    origins: Vec<PixelPoint>,
}

impl Grid {
    /// Expects a size accepted by `GameConfig::validate`.
    pub fn new(cols: usize, rows: usize, geometry: PixelGeometry) -> Self {
        let offset = geometry.border_offset();
        let mut origins = Vec::with_capacity(cols * rows);
        for row in 0..rows as i32 {
            for col in 0..cols as i32 {
                origins.push(PixelPoint {
                    x: offset + col * geometry.cell_width,
                    y: offset + row * geometry.cell_height,
                });
            }
        }
        Self {
            cols,
            rows,
            geometry,
            origins,
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn geometry(&self) -> PixelGeometry {
        self.geometry
    }

    pub fn last_cell_index(&self) -> CellIndex {
        (self.cols * self.rows) as CellIndex - 1
    }

    /// No validation: out-of-range inputs map to out-of-range or wrapped indices.
    pub fn index_of(&self, col: i32, row: i32) -> CellIndex {
        col + row * self.cols as i32
    }

    pub fn index_at(&self, position: Position) -> CellIndex {
        self.index_of(position.col, position.row)
    }

    pub fn is_in_bounds(&self, index: CellIndex) -> bool {
        (0..=self.last_cell_index()).contains(&index)
    }

    pub fn column_of(&self, index: CellIndex) -> i32 {
        index.rem_euclid(self.cols as i32)
    }

    pub fn row_of(&self, index: CellIndex) -> i32 {
        index.div_euclid(self.cols as i32)
    }

    /// Precomputed pixel origin of a cell, for drawing.
    pub fn cell_pixel(&self, index: CellIndex) -> Option<PixelPoint> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.origins.get(i))
            .copied()
    }

    /// Pixel rectangle of any index, including ones outside the lattice.
    pub fn cell_rect(&self, index: CellIndex) -> PixelRect {
        let offset = self.geometry.border_offset();
        PixelRect {
            x: offset + self.column_of(index) * self.geometry.cell_width,
            y: offset + self.row_of(index) * self.geometry.cell_height,
            width: self.geometry.cell_width,
            height: self.geometry.cell_height,
        }
    }

    /// Full drawing surface including the border.
    pub fn pixel_size(&self) -> (i32, i32) {
        (
            self.cols as i32 * self.geometry.cell_width + self.geometry.border,
            self.rows as i32 * self.geometry.cell_height + self.geometry.border,
        )
    }
}
