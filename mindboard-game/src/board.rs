//! Board geometry and piece placement.
//!
//! Movement operates on the 1-D cell numbering (1..=100). The 10x10 snake
//! layout only matters for the bishop and knight effects, which are defined
//! in row/column space.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;

pub const BOARD_SIDE: u8 = 10;
pub const START_CELL: u8 = 1;
pub const FINAL_CELL: u8 = 100;

/// Diagonal directions as (row, column) deltas, tried in this order.
pub const DIAGONAL_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];

/// Knight offsets as (row, column) deltas, tried in this order.
pub const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (2, 1),
    (2, -1),
    (-2, 1),
    (-2, -1),
    (1, 2),
    (1, -2),
    (-1, 2),
    (-1, -2),
];

/// Number of rows a bishop (or the queen's diagonal option) travels.
pub const DIAGONAL_STEPS: i8 = 3;

/// Cells a rook (or the queen's forward option) advances.
pub const FORWARD_STEPS: u8 = 5;

#[must_use]
pub const fn is_on_board(cell: u8) -> bool {
    cell >= START_CELL && cell <= FINAL_CELL
}

/// Row and column of a cell in the snake layout. Row 0 holds cells 1..=10.
#[must_use]
pub const fn row_col(cell: u8) -> (i8, i8) {
    let index = cell.saturating_sub(1);
    let row = (index / BOARD_SIDE) as i8;
    let raw_col = (index % BOARD_SIDE) as i8;
    if row % 2 == 0 {
        (row, raw_col)
    } else {
        (row, 9 - raw_col)
    }
}

/// Inverse of [`row_col`]; `None` when the coordinates fall off the grid.
#[must_use]
pub fn cell_at(row: i8, col: i8) -> Option<u8> {
    let side = BOARD_SIDE as i8;
    if !(0..side).contains(&row) || !(0..side).contains(&col) {
        return None;
    }
    let actual_col = if row % 2 == 0 { col } else { 9 - col };
    u8::try_from(row * side + actual_col + 1).ok()
}

/// Light squares are the odd cells.
#[must_use]
pub const fn is_light(cell: u8) -> bool {
    cell % 2 == 1
}

/// First diagonal destination `steps` rows away that keeps the square colour.
#[must_use]
pub fn diagonal_destination(cell: u8, steps: i8) -> Option<u8> {
    let (row, col) = row_col(cell);
    DIAGONAL_DIRECTIONS.iter().find_map(|&(dr, dc)| {
        let target = cell_at(row + dr * steps, col + dc * steps)?;
        (is_light(target) == is_light(cell) && target <= FINAL_CELL).then_some(target)
    })
}

/// Knight destinations that move the player back toward the start.
#[must_use]
pub fn knight_destinations(cell: u8) -> SmallVec<[u8; 8]> {
    let (row, col) = row_col(cell);
    KNIGHT_OFFSETS
        .iter()
        .filter_map(|&(dr, dc)| cell_at(row + dr, col + dc))
        .filter(|&target| target <= FINAL_CELL && target < cell)
        .collect()
}

/// Destination of a forward move, capped at the final cell.
#[must_use]
pub fn forward_destination(cell: u8, steps: u8) -> u8 {
    cell.saturating_add(steps).min(FINAL_CELL)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    Pawn,
    Rook,
    Bishop,
    Knight,
    Queen,
    King,
}

impl PieceKind {
    #[must_use]
    pub const fn default_symbol(self) -> &'static str {
        match self {
            Self::Pawn => "♙",
            Self::Rook => "♖",
            Self::Bishop => "♗",
            Self::Knight => "♘",
            Self::Queen => "♕",
            Self::King => "♔",
        }
    }

    /// Pawn marks the player's token and king marks the goal; neither is a tile.
    #[must_use]
    pub const fn tile(self) -> Option<Tile> {
        match self {
            Self::Rook => Some(Tile::Rook),
            Self::Bishop => Some(Tile::Bishop),
            Self::Knight => Some(Tile::Knight),
            Self::Queen => Some(Tile::Queen),
            Self::Pawn | Self::King => None,
        }
    }
}

/// Special cells that trigger a forced move or a choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tile {
    Rook,
    Bishop,
    Knight,
    Queen,
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rook => write!(f, "rook"),
            Self::Bishop => write!(f, "bishop"),
            Self::Knight => write!(f, "knight"),
            Self::Queen => write!(f, "queen"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    #[serde(default)]
    pub symbol: Option<String>,
}

impl Piece {
    #[must_use]
    pub const fn new(kind: PieceKind) -> Self {
        Self { kind, symbol: None }
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        self.symbol
            .as_deref()
            .unwrap_or_else(|| self.kind.default_symbol())
    }
}

/// Static piece placement for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub pieces: BTreeMap<u8, Piece>,
}

impl Default for Board {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Board {
    #[must_use]
    pub fn with_defaults() -> Self {
        const DEFAULTS: &[(u8, PieceKind)] = &[
            (1, PieceKind::Pawn),
            (7, PieceKind::Rook),
            (19, PieceKind::Bishop),
            (28, PieceKind::Queen),
            (36, PieceKind::Bishop),
            (39, PieceKind::Knight),
            (43, PieceKind::Rook),
            (47, PieceKind::Bishop),
            (49, PieceKind::Knight),
            (51, PieceKind::Queen),
            (59, PieceKind::Knight),
            (76, PieceKind::Rook),
            (82, PieceKind::Knight),
            (88, PieceKind::Knight),
            (92, PieceKind::Rook),
            (97, PieceKind::Knight),
            (100, PieceKind::King),
        ];

        Self {
            pieces: DEFAULTS
                .iter()
                .map(|&(cell, kind)| (cell, Piece::new(kind)))
                .collect(),
        }
    }

    /// A board with no pieces at all.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            pieces: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_piece(mut self, cell: u8, kind: PieceKind) -> Self {
        self.pieces.insert(cell, Piece::new(kind));
        self
    }

    #[must_use]
    pub fn piece_at(&self, cell: u8) -> Option<&Piece> {
        self.pieces.get(&cell)
    }

    #[must_use]
    pub fn tile_at(&self, cell: u8) -> Option<Tile> {
        self.piece_at(cell).and_then(|piece| piece.kind.tile())
    }

    /// Display rows from the top of the board (100..=91) down to the start row.
    #[must_use]
    pub fn render_rows() -> Vec<[u8; 10]> {
        let side = BOARD_SIDE as i8;
        (0..side)
            .rev()
            .map(|row| {
                let mut cells = [0_u8; 10];
                for (col, slot) in (0..side).zip(cells.iter_mut()) {
                    *slot = cell_at(row, col).unwrap_or_default();
                }
                cells
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_layout_roundtrips_every_cell() {
        for cell in START_CELL..=FINAL_CELL {
            let (row, col) = row_col(cell);
            assert_eq!(cell_at(row, col), Some(cell));
        }
        assert_eq!(row_col(1), (0, 0));
        assert_eq!(row_col(10), (0, 9));
        assert_eq!(row_col(11), (1, 9));
        assert_eq!(row_col(20), (1, 0));
        assert_eq!(row_col(100), (9, 0));
    }

    #[test]
    fn cell_at_rejects_off_grid() {
        assert_eq!(cell_at(-1, 0), None);
        assert_eq!(cell_at(0, 10), None);
        assert_eq!(cell_at(10, 3), None);
    }

    #[test]
    fn bishop_from_19_takes_first_direction() {
        assert_eq!(diagonal_destination(19, DIAGONAL_STEPS), Some(45));
    }

    #[test]
    fn bishop_destinations_preserve_colour() {
        for cell in START_CELL..=FINAL_CELL {
            if let Some(target) = diagonal_destination(cell, DIAGONAL_STEPS) {
                assert_eq!(is_light(target), is_light(cell), "cell {cell} -> {target}");
            }
        }
    }

    #[test]
    fn knight_moves_only_backward() {
        assert_eq!(knight_destinations(39).first(), Some(&18));
        assert!(knight_destinations(1).is_empty());
        for cell in START_CELL..=FINAL_CELL {
            assert!(knight_destinations(cell).iter().all(|&t| t < cell));
        }
    }

    #[test]
    fn forward_is_capped() {
        assert_eq!(forward_destination(7, FORWARD_STEPS), 12);
        assert_eq!(forward_destination(97, FORWARD_STEPS), 100);
    }

    #[test]
    fn default_board_tiles() {
        let board = Board::with_defaults();
        assert_eq!(board.tile_at(7), Some(Tile::Rook));
        assert_eq!(board.tile_at(28), Some(Tile::Queen));
        assert_eq!(board.tile_at(1), None);
        assert_eq!(board.tile_at(100), None);
        assert_eq!(board.piece_at(100).map(Piece::symbol), Some("♔"));
    }

    #[test]
    fn render_rows_start_at_goal() {
        let rows = Board::render_rows();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0][0], 100);
        assert_eq!(rows[0][9], 91);
        assert_eq!(rows[9][0], 1);
        assert_eq!(rows[8][0], 20);
    }
}
