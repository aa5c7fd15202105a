use std::collections::VecDeque;

use crate::config::{ConfigError, GameConfig, LINES_PER_LEVEL};
use crate::grid::{CellIndex, Grid, Position};
use crate::line_clear::{
    advance_animation, apply_clear, detect_filled_rows, score_for_rows, RowClearRecord,
};
use crate::piece::{
    ActivePiece, PieceProvider, PieceSpec, RandomPieceProvider, SettledPiece, ShapeKind,
};
use crate::validator::{is_block_collision, is_move_legal, is_single_step};

// ============================================================================
// Types
// ============================================================================

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Play,
    RowAnimation,
    Collision,
    GameOver,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    MoveLeft,
    MoveRight,
    SoftDrop,
    Rotate,
}

impl Command {
    /// Unknown identifiers map to `None` and are dropped by [`Game::dispatch`].
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "moveLeft" => Some(Command::MoveLeft),
            "moveRight" => Some(Command::MoveRight),
            "softDrop" => Some(Command::SoftDrop),
            "rotate" => Some(Command::Rotate),
            _ => None,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub enum GameEvent {
    PieceMoved,
    PieceRotated,
    MoveRejected,
    PieceLocked,
    RowsFilled(u32),
    LinesCleared(u32),
    LevelUp(u32),
    PieceSpawned(ShapeKind),
    GameRestarted,
    GameOver,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CellReveal {
    pub index: CellIndex,
    pub revealed: bool,
}

/// Read-only view handed to renderers after a tick.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Snapshot {
    pub phase: Phase,
    pub score: u32,
    pub lines_cleared: u32,
    pub level: u32,
    pub active_kind: Option<ShapeKind>,
    pub active_cells: Vec<CellIndex>,
    pub settled_cells: Vec<(CellIndex, ShapeKind)>,
    pub next: Option<ShapeKind>,
    /// Only populated during the row animation.
    pub reveals: Vec<CellReveal>,
}

// ============================================================================
// Game
// ============================================================================

pub struct Game {
    config: GameConfig,
    grid: Grid,
    active: Option<ActivePiece>,
    settled: Vec<SettledPiece>,
    preview_queue: VecDeque<PieceSpec>,
    phase: Phase,
    score: u32,
    lines_cleared: u32,
    level: u32,
    pending_rows: Vec<RowClearRecord>,
    animation_start_ms: u64,
    last_drop_ms: Option<u64>,
    piece_provider: Box<dyn PieceProvider>,
    events: Vec<GameEvent>,
}

impl Game {
    pub fn new(config: GameConfig) -> Result<Self, ConfigError> {
        let provider = RandomPieceProvider::new(config.seed, config.mirroring);
        Self::with_provider(config, Box::new(provider))
    }

    pub fn with_provider(
        config: GameConfig,
        provider: Box<dyn PieceProvider>,
    ) -> Result<Self, ConfigError> {
        Self::with_settled(config, provider, Vec::new())
    }

    /// Starts a session on top of pre-settled pieces.
    pub fn with_settled(
        config: GameConfig,
        provider: Box<dyn PieceProvider>,
        settled: Vec<SettledPiece>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = Grid::new(config.cols, config.rows, config.geometry);

        let mut game = Self {
            config,
            grid,
            active: None,
            settled,
            preview_queue: VecDeque::new(),
            phase: Phase::Play,
            score: 0,
            lines_cleared: 0,
            level: 1,
            pending_rows: Vec::new(),
            animation_start_ms: 0,
            last_drop_ms: None,
            piece_provider: provider,
            events: Vec::new(),
        };
        game.fill_preview();
        game.spawn_or_end();
        game.events.clear();
        Ok(game)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lines_cleared(&self) -> u32 {
        self.lines_cleared
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn active(&self) -> Option<&ActivePiece> {
        self.active.as_ref()
    }

    pub fn settled(&self) -> &[SettledPiece] {
        &self.settled
    }

    pub fn preview_queue(&self) -> &VecDeque<PieceSpec> {
        &self.preview_queue
    }

    pub fn pending_rows(&self) -> &[RowClearRecord] {
        &self.pending_rows
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    pub fn settled_cells(&self) -> Vec<CellIndex> {
        self.settled
            .iter()
            .flat_map(|piece| piece.cells.iter().copied())
            .collect()
    }

    pub fn drop_interval_ms(&self) -> u64 {
        self.config.drop_interval_ms(self.level)
    }

    // ------------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------------

    pub fn apply(&mut self, command: Command) -> bool {
        match command {
            Command::MoveLeft => self.move_left(),
            Command::MoveRight => self.move_right(),
            Command::SoftDrop => self.soft_drop(),
            Command::Rotate => self.rotate(),
        }
    }

    pub fn dispatch(&mut self, name: &str) -> bool {
        Command::parse(name).is_some_and(|command| self.apply(command))
    }

    pub fn move_left(&mut self) -> bool {
        self.translate(-1, 0)
    }

    pub fn move_right(&mut self) -> bool {
        self.translate(1, 0)
    }

    pub fn soft_drop(&mut self) -> bool {
        self.translate(0, 1)
    }

    pub fn rotate(&mut self) -> bool {
        if self.phase != Phase::Play {
            return false;
        }
        let Some(piece) = self.active.as_ref() else {
            return false;
        };
        let rotation = (piece.rotation() + 1) % 4;
        let anchor = piece.anchor();
        let proposed = piece.propose(&self.grid, anchor, rotation);
        self.try_commit(anchor, rotation, proposed, GameEvent::PieceRotated)
    }

    fn translate(&mut self, dcol: i32, drow: i32) -> bool {
        if self.phase != Phase::Play {
            return false;
        }
        let Some(piece) = self.active.as_ref() else {
            return false;
        };
        let anchor = piece.anchor().offset(dcol, drow);
        let rotation = piece.rotation();
        let proposed = piece.propose(&self.grid, anchor, rotation);
        if !is_single_step(&self.grid, piece.cells(), &proposed) {
            self.events.push(GameEvent::MoveRejected);
            return false;
        }
        self.try_commit(anchor, rotation, proposed, GameEvent::PieceMoved)
    }

    fn try_commit(
        &mut self,
        anchor: Position,
        rotation: usize,
        proposed: Vec<CellIndex>,
        event: GameEvent,
    ) -> bool {
        if !is_move_legal(&self.grid, &proposed, &self.settled_cells()) {
            self.events.push(GameEvent::MoveRejected);
            return false;
        }
        if let Some(piece) = self.active.as_mut() {
            piece.commit(anchor, rotation, proposed);
            self.events.push(event);
            return true;
        }
        false
    }

    // ------------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------------

    /// Advances the session by at most one phase transition. `now_ms` must be
    /// monotonic.
    pub fn tick(&mut self, now_ms: u64) {
        match self.phase {
            Phase::Play => self.tick_play(now_ms),
            Phase::Collision => self.tick_collision(now_ms),
            Phase::RowAnimation => self.tick_row_animation(now_ms),
            Phase::GameOver => {}
        }
    }

    fn tick_play(&mut self, now_ms: u64) {
        let Some(piece) = self.active.as_ref() else {
            return;
        };
        let below = piece.propose(&self.grid, piece.anchor().offset(0, 1), piece.rotation());
        if !is_move_legal(&self.grid, &below, &self.settled_cells()) {
            self.phase = Phase::Collision;
            return;
        }

        match self.last_drop_ms {
            None => self.last_drop_ms = Some(now_ms),
            Some(last) if now_ms.saturating_sub(last) >= self.drop_interval_ms() => {
                if let Some(piece) = self.active.as_mut() {
                    let anchor = piece.anchor().offset(0, 1);
                    let rotation = piece.rotation();
                    piece.commit(anchor, rotation, below);
                }
                self.last_drop_ms = Some(now_ms);
            }
            Some(_) => {}
        }
    }

    fn tick_collision(&mut self, now_ms: u64) {
        if let Some(piece) = self.active.take() {
            self.settled.push(piece.lock());
            self.events.push(GameEvent::PieceLocked);
        }

        if !self.spawn_is_clear() {
            self.end_game();
            return;
        }

        let rows = detect_filled_rows(&self.grid, &self.settled, self.config.row_animation_ms);
        if rows.is_empty() {
            self.spawn_or_end();
            return;
        }

        self.events.push(GameEvent::RowsFilled(rows.len() as u32));
        self.pending_rows = rows;
        self.animation_start_ms = now_ms;
        self.phase = Phase::RowAnimation;
    }

    fn tick_row_animation(&mut self, now_ms: u64) {
        let elapsed = now_ms.saturating_sub(self.animation_start_ms);
        let (still_animating, rows) = advance_animation(&self.pending_rows, elapsed);
        self.pending_rows = rows;
        if still_animating {
            return;
        }

        let finished = std::mem::take(&mut self.pending_rows);
        let settled = std::mem::take(&mut self.settled);
        self.settled = apply_clear(&self.grid, settled, &finished);
        self.add_score(finished.len());
        self.spawn_or_end();
    }

    // ------------------------------------------------------------------------
    // Spawning and scoring
    // ------------------------------------------------------------------------

    fn fill_preview(&mut self) {
        self.preview_queue.clear();
        for _ in 0..self.config.preview_count {
            self.preview_queue.push_back(self.piece_provider.next_piece());
        }
    }

    fn next_spec(&self) -> Option<PieceSpec> {
        self.preview_queue.front().copied()
    }

    /// Whether the next piece fits at the spawn anchor.
    fn spawn_is_clear(&self) -> bool {
        let Some(spec) = self.next_spec() else {
            return false;
        };
        let candidate = ActivePiece::spawn(&self.grid, spec);
        candidate
            .cells()
            .iter()
            .all(|&cell| self.grid.is_in_bounds(cell))
            && !is_block_collision(&self.grid, candidate.cells(), &self.settled_cells())
    }

    fn spawn_or_end(&mut self) {
        if !self.spawn_is_clear() {
            self.end_game();
            return;
        }
        let Some(spec) = self.preview_queue.pop_front() else {
            return;
        };
        self.preview_queue.push_back(self.piece_provider.next_piece());
        self.active = Some(ActivePiece::spawn(&self.grid, spec));
        self.last_drop_ms = None;
        self.phase = Phase::Play;
        self.events.push(GameEvent::PieceSpawned(spec.kind));
    }

    fn end_game(&mut self) {
        self.active = None;
        self.phase = Phase::GameOver;
        self.events.push(GameEvent::GameOver);
    }

    pub fn add_score(&mut self, rows: usize) {
        if rows == 0 {
            return;
        }
        self.score += score_for_rows(rows);
        self.lines_cleared += rows as u32;
        self.events.push(GameEvent::LinesCleared(rows as u32));

        let new_level = (self.lines_cleared / LINES_PER_LEVEL) + 1;
        if new_level > self.level {
            self.level = new_level;
            self.events.push(GameEvent::LevelUp(self.level));
        }
    }

    pub fn restart(&mut self) {
        self.settled.clear();
        self.pending_rows.clear();
        self.score = 0;
        self.lines_cleared = 0;
        self.level = 1;
        self.animation_start_ms = 0;
        self.events.clear();

        self.fill_preview();
        self.spawn_or_end();
        self.events.push(GameEvent::GameRestarted);
    }

    // ------------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------------

    pub fn snapshot(&self) -> Snapshot {
        let reveals = if self.phase == Phase::RowAnimation {
            self.pending_rows
                .iter()
                .flat_map(|record| &record.cells)
                .map(|cell| CellReveal {
                    index: cell.index,
                    revealed: cell.revealed,
                })
                .collect()
        } else {
            Vec::new()
        };

        Snapshot {
            phase: self.phase,
            score: self.score,
            lines_cleared: self.lines_cleared,
            level: self.level,
            active_kind: self.active.as_ref().map(ActivePiece::kind),
            active_cells: self
                .active
                .as_ref()
                .map(|piece| piece.cells().to_vec())
                .unwrap_or_default(),
            settled_cells: self
                .settled
                .iter()
                .flat_map(|piece| piece.cells.iter().map(move |&cell| (cell, piece.kind)))
                .collect(),
            next: self.next_spec().map(|spec| spec.kind),
            reveals,
        }
    }

    /// Takes and clears all pending events
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Count filled cells in a row
    pub fn filled_count_in_row(&self, row: i32) -> usize {
        self.settled
            .iter()
            .flat_map(|piece| &piece.cells)
            .filter(|&&cell| self.grid.row_of(cell) == row)
            .count()
    }
}

// ============================================================================
// Test Helpers
// ============================================================================

pub mod test_helpers {
    use super::*;

    pub fn row_cells(grid: &Grid, row: i32) -> Vec<CellIndex> {
        (0..grid.cols() as i32).map(|col| grid.index_of(col, row)).collect()
    }

    pub fn filled_row(grid: &Grid, row: i32) -> SettledPiece {
        SettledPiece::new(ShapeKind::T, row_cells(grid, row))
    }

    pub fn filled_row_with_gap(grid: &Grid, row: i32, gap_cols: &[i32]) -> SettledPiece {
        let cells = (0..grid.cols() as i32)
            .filter(|col| !gap_cols.contains(col))
            .map(|col| grid.index_of(col, row))
            .collect();
        SettledPiece::new(ShapeKind::T, cells)
    }
}
