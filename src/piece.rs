use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::grid::{CellIndex, Grid, Position};

/// Column/row delta from a piece's anchor cell.
pub type Offset = (i32, i32);

/// Row of the spawn anchor; deep enough for every facing reaching upwards.
pub const SPAWN_ROW: i32 = 3;

// ============================================================================
// Catalog
// ============================================================================

const I_FACINGS: &[&[Offset]] = &[&[(1, 0), (2, 0), (3, 0)], &[(0, 1), (0, 2), (0, 3)]];
const S_FACINGS: &[&[Offset]] = &[&[(1, 0), (1, 1), (2, 1)], &[(0, -1), (1, -1), (1, -2)]];
const L_BACKWARD_FACINGS: &[&[Offset]] =
    &[&[(-1, 0), (-2, 0), (-2, 1)], &[(0, 1), (0, 2), (1, 2)]];
const L_FORWARD_FACINGS: &[&[Offset]] = &[&[(1, 0), (2, 0), (2, 1)], &[(0, 1), (0, 2), (-1, 2)]];
const SQUARE_FACINGS: &[&[Offset]] = &[&[(1, 0), (1, -1), (0, -1)]];
const T_FACINGS: &[&[Offset]] = &[&[(1, 0), (1, 1), (2, 0)], &[(0, -1), (1, -1), (0, -2)]];
const Z_FACINGS: &[&[Offset]] = &[&[(1, 0), (1, -1), (2, -1)], &[(0, -1), (-1, -1), (-1, -2)]];

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ShapeKind {
    I,
    S,
    LBackward,
    LForward,
    Square,
    T,
    Z,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 7] = [
        ShapeKind::I,
        ShapeKind::S,
        ShapeKind::LBackward,
        ShapeKind::LForward,
        ShapeKind::Square,
        ShapeKind::T,
        ShapeKind::Z,
    ];

    /// Base offset sets; every rotation is derived from one of these.
    pub fn facings(self) -> &'static [&'static [Offset]] {
        match self {
            ShapeKind::I => I_FACINGS,
            ShapeKind::S => S_FACINGS,
            ShapeKind::LBackward => L_BACKWARD_FACINGS,
            ShapeKind::LForward => L_FORWARD_FACINGS,
            ShapeKind::Square => SQUARE_FACINGS,
            ShapeKind::T => T_FACINGS,
            ShapeKind::Z => Z_FACINGS,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShapeKind::I => "I",
            ShapeKind::S => "S",
            ShapeKind::LBackward => "L-B",
            ShapeKind::LForward => "L-F",
            ShapeKind::Square => "Square",
            ShapeKind::T => "T",
            ShapeKind::Z => "Z",
        }
    }
}

// ============================================================================
// Transform
// ============================================================================

/// Quarter-turn rotation about the anchor. No kicks are applied.
pub fn rotate(offsets: &[Offset], stage: usize) -> Vec<Offset> {
    offsets
        .iter()
        .map(|&(x, y)| match stage % 4 {
            0 => (x, y),
            1 => (y, -x),
            2 => (-x, -y),
            _ => (-y, x),
        })
        .collect()
}

/// The anchor's own index followed by one index per offset.
pub fn resolve_absolute_cells(grid: &Grid, anchor: Position, offsets: &[Offset]) -> Vec<CellIndex> {
    let origin = grid.index_at(anchor);
    std::iter::once(origin)
        .chain(offsets.iter().map(|&(dx, dy)| origin + grid.index_of(dx, dy)))
        .collect()
}

pub fn spawn_anchor(grid: &Grid) -> Position {
    Position::new(grid.cols() as i32 / 2, SPAWN_ROW)
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PieceSpec {
    pub kind: ShapeKind,
    pub facing: usize,
    /// Negates x on the first facing and y on the second.
    pub mirrored: bool,
}

impl PieceSpec {
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            facing: 0,
            mirrored: false,
        }
    }

    pub fn with_facing(kind: ShapeKind, facing: usize) -> Self {
        Self {
            kind,
            facing,
            mirrored: false,
        }
    }

    pub fn base_offsets(&self) -> Vec<Offset> {
        let facings = self.kind.facings();
        let facing = self.facing % facings.len();
        facings[facing]
            .iter()
            .map(|&(x, y)| match (self.mirrored, facing) {
                (false, _) => (x, y),
                (true, 0) => (-x, y),
                (true, _) => (x, -y),
            })
            .collect()
    }
}

// ============================================================================
// Active Piece
// ============================================================================

#[derive(Clone, Debug)]
pub struct ActivePiece {
    spec: PieceSpec,
    rotation: usize,
    anchor: Position,
    cells: Vec<CellIndex>,
}

impl ActivePiece {
    pub fn new_at(grid: &Grid, spec: PieceSpec, anchor: Position) -> Self {
        let cells = resolve_absolute_cells(grid, anchor, &spec.base_offsets());
        Self {
            spec,
            rotation: 0,
            anchor,
            cells,
        }
    }

    pub fn spawn(grid: &Grid, spec: PieceSpec) -> Self {
        Self::new_at(grid, spec, spawn_anchor(grid))
    }

    pub fn kind(&self) -> ShapeKind {
        self.spec.kind
    }

    pub fn spec(&self) -> PieceSpec {
        self.spec
    }

    pub fn rotation(&self) -> usize {
        self.rotation
    }

    pub fn anchor(&self) -> Position {
        self.anchor
    }

    pub fn cells(&self) -> &[CellIndex] {
        &self.cells
    }

    pub fn offsets(&self) -> Vec<Offset> {
        rotate(&self.spec.base_offsets(), self.rotation)
    }

    /// Cells the piece would occupy at another anchor/rotation. Nothing changes.
    pub fn propose(&self, grid: &Grid, anchor: Position, rotation: usize) -> Vec<CellIndex> {
        resolve_absolute_cells(grid, anchor, &rotate(&self.spec.base_offsets(), rotation))
    }

    pub(crate) fn commit(&mut self, anchor: Position, rotation: usize, cells: Vec<CellIndex>) {
        self.anchor = anchor;
        self.rotation = rotation % 4;
        self.cells = cells;
    }

    /// Consumes the piece, keeping only its kind and occupied cells.
    pub fn lock(self) -> SettledPiece {
        SettledPiece {
            kind: self.spec.kind,
            cells: self.cells,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SettledPiece {
    pub kind: ShapeKind,
    pub cells: Vec<CellIndex>,
}

impl SettledPiece {
    pub fn new(kind: ShapeKind, cells: Vec<CellIndex>) -> Self {
        Self { kind, cells }
    }
}

// ============================================================================
// Piece Provider Trait
// ============================================================================

pub trait PieceProvider {
    fn next_piece(&mut self) -> PieceSpec;
}

/// Uniform kind and facing; mirrors half of the pieces when enabled.
pub struct RandomPieceProvider {
    rng: StdRng,
    mirroring: bool,
}

impl RandomPieceProvider {
    pub fn new(seed: Option<u64>, mirroring: bool) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng, mirroring }
    }
}

impl PieceProvider for RandomPieceProvider {
    fn next_piece(&mut self) -> PieceSpec {
        let kind = ShapeKind::ALL[self.rng.gen_range(0..ShapeKind::ALL.len())];
        let facing = self.rng.gen_range(0..kind.facings().len());
        let mirrored = self.mirroring && self.rng.gen_bool(0.5);
        PieceSpec {
            kind,
            facing,
            mirrored,
        }
    }
}

pub struct SequencePieceProvider {
    pieces: Vec<PieceSpec>,
    index: usize,
}

impl SequencePieceProvider {
    pub fn new(pieces: Vec<PieceSpec>) -> Self {
        assert!(!pieces.is_empty(), "sequence provider needs at least one piece");
        Self { pieces, index: 0 }
    }

    pub fn of_kinds(kinds: &[ShapeKind]) -> Self {
        Self::new(kinds.iter().copied().map(PieceSpec::new).collect())
    }
}

impl PieceProvider for SequencePieceProvider {
    fn next_piece(&mut self) -> PieceSpec {
        let piece = self.pieces[self.index % self.pieces.len()];
        self.index += 1;
        piece
    }
}
