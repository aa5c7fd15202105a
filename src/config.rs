use std::fmt;

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_COLS: usize = 10;
pub const DEFAULT_ROWS: usize = 20;
pub const DEFAULT_PREVIEW_COUNT: usize = 4;

/// Smallest grid that fits every facing at the spawn anchor and keeps a
/// four-wide piece from touching both walls.
pub const MIN_COLS: usize = 7;
pub const MIN_ROWS: usize = 7;

/// Largest grid accepted. Keeps `cols * rows` well inside a `CellIndex`.
pub const MAX_COLS: usize = 1000;
pub const MAX_ROWS: usize = 1000;

// Terminal chrome around the board
pub const SIDE_PANEL_WIDTH: i32 = 16;
pub const FOOTER_HEIGHT: i32 = 2;

// Timing (in milliseconds)
pub const ROW_ANIMATION_MS: u64 = 2000;
const BASE_TICK_MS: u64 = 800;
const MIN_TICK_MS: u64 = 100;
pub const SPEED_INCREASE_PER_LEVEL: u64 = 50;
pub const LINES_PER_LEVEL: u32 = 10;

// Scoring
pub const SCORE_SINGLE: u32 = 100;
pub const SCORE_DOUBLE: u32 = 300;
pub const SCORE_TRIPLE: u32 = 500;
pub const SCORE_TETRIS: u32 = 800;

// ============================================================================
// Types
// ============================================================================

/// Pixel geometry of one cell. The default is one terminal row tall and two
/// characters wide, inside a one-character frame.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PixelGeometry {
    pub cell_width: i32,
    pub cell_height: i32,
    pub border: i32,
}

impl PixelGeometry {
    pub fn border_offset(&self) -> i32 {
        self.border / 2
    }
}

impl Default for PixelGeometry {
    fn default() -> Self {
        Self {
            cell_width: 2,
            cell_height: 1,
            border: 2,
        }
    }
}

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub cols: usize,
    pub rows: usize,
    pub geometry: PixelGeometry,
    pub row_animation_ms: u64,
    pub base_tick_ms: u64,
    pub min_tick_ms: u64,
    pub preview_count: usize,
    /// Mirror a random facing half of the time.
    pub mirroring: bool,
    /// `None` seeds the piece generator from entropy.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
            geometry: PixelGeometry::default(),
            row_animation_ms: ROW_ANIMATION_MS,
            base_tick_ms: BASE_TICK_MS,
            min_tick_ms: MIN_TICK_MS,
            preview_count: DEFAULT_PREVIEW_COUNT,
            mirroring: true,
            seed: None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConfigError {
    TooNarrow { cols: usize },
    TooShort { rows: usize },
    EmptyCell { width: i32, height: i32 },
    TooLarge { cols: usize, rows: usize },
    NoPreview,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::TooNarrow { cols } => {
                write!(f, "grid needs at least {MIN_COLS} columns, got {cols}")
            }
            ConfigError::TooShort { rows } => {
                write!(f, "grid needs at least {MIN_ROWS} rows, got {rows}")
            }
            ConfigError::EmptyCell { width, height } => {
                write!(f, "cell size must be positive, got {width}x{height}")
            }
            ConfigError::TooLarge { cols, rows } => write!(
                f,
                "grid of {cols}x{rows} cells exceeds {MAX_COLS}x{MAX_ROWS} or the terminal extent"
            ),
            ConfigError::NoPreview => write!(f, "preview queue must hold at least one piece"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cols < MIN_COLS {
            return Err(ConfigError::TooNarrow { cols: self.cols });
        }
        if self.rows < MIN_ROWS {
            return Err(ConfigError::TooShort { rows: self.rows });
        }
        let PixelGeometry {
            cell_width,
            cell_height,
            ..
        } = self.geometry;
        if cell_width <= 0 || cell_height <= 0 {
            return Err(ConfigError::EmptyCell {
                width: cell_width,
                height: cell_height,
            });
        }
        if self.cols > MAX_COLS || self.rows > MAX_ROWS || self.frame_size().is_none() {
            return Err(ConfigError::TooLarge {
                cols: self.cols,
                rows: self.rows,
            });
        }
        if self.preview_count == 0 {
            return Err(ConfigError::NoPreview);
        }
        Ok(())
    }

    /// Terminal footprint of the board with its side panel and footer, or
    /// `None` when either extent overflows a `u16`.
    pub fn frame_size(&self) -> Option<(u16, u16)> {
        let PixelGeometry {
            cell_width,
            cell_height,
            border,
        } = self.geometry;
        let width = i32::try_from(self.cols)
            .ok()?
            .checked_mul(cell_width)?
            .checked_add(border)?
            .checked_add(SIDE_PANEL_WIDTH)?;
        let height = i32::try_from(self.rows)
            .ok()?
            .checked_mul(cell_height)?
            .checked_add(border)?
            .checked_add(FOOTER_HEIGHT)?;
        Some((u16::try_from(width).ok()?, u16::try_from(height).ok()?))
    }

    /// Gravity interval for a level, shrinking by a fixed step down to the floor.
    pub fn drop_interval_ms(&self, level: u32) -> u64 {
        let speed_reduction = u64::from(level.saturating_sub(1)) * SPEED_INCREASE_PER_LEVEL;
        self.base_tick_ms
            .saturating_sub(speed_reduction)
            .max(self.min_tick_ms)
    }
}
