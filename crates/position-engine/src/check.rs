//! Check and checkmate detection.
//!
//! Mate is decided by brute force: every pseudo-legal move of the side in
//! check is played on a scratch board and the king re-tested. On a 20-square
//! board this is exhaustive and cheap, so detection is exact.

use board_core::{Board, Color, Coord};
use serde::{Deserialize, Serialize};

use crate::movegen::{is_attacked, pseudo_legal_moves, Move};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KingPositions {
    pub white: Option<Coord>,
    pub black: Option<Coord>,
}

impl KingPositions {
    /// First king of each color in row-major order.
    pub fn from_board(board: &Board) -> Self {
        Self {
            white: board.king(Color::White),
            black: board.king(Color::Black),
        }
    }

    pub fn get(&self, color: Color) -> Option<Coord> {
        match color {
            Color::White => self.white,
            Color::Black => self.black,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckStatus {
    pub white_in_check: bool,
    pub black_in_check: bool,
    pub checkmate: bool,
}

impl CheckStatus {
    pub fn in_check(&self, color: Color) -> bool {
        match color {
            Color::White => self.white_in_check,
            Color::Black => self.black_in_check,
        }
    }
}

fn king_attacked(board: &Board, king: Option<Coord>, color: Color) -> bool {
    king.is_some_and(|at| is_attacked(board, at, !color))
}

pub fn is_in_check(board: &Board, color: Color) -> bool {
    king_attacked(board, board.king(color), color)
}

/// Moves that do not leave the mover's own king attacked.
pub fn legal_moves(board: &Board, color: Color) -> Vec<Move> {
    pseudo_legal_moves(board, color)
        .filter(|mv| !is_in_check(&mv.apply(board), color))
        .collect()
}

/// Mate test for the king on `king`. The square follows the king when it
/// is the piece that moves.
fn king_mated(board: &Board, king: Coord, color: Color) -> bool {
    is_attacked(board, king, !color)
        && !pseudo_legal_moves(board, color).any(|mv| {
            let king = if mv.from == king { mv.to } else { king };
            !is_attacked(&mv.apply(board), king, !color)
        })
}

pub fn is_checkmated(board: &Board, color: Color) -> bool {
    board.king(color).is_some_and(|king| king_mated(board, king, color))
}

/// Check flags for both kings at the given squares; a missing king is never in check.
pub fn compute_check_status(board: &Board, kings: &KingPositions) -> CheckStatus {
    let white_in_check = king_attacked(board, kings.white, Color::White);
    let black_in_check = king_attacked(board, kings.black, Color::Black);

    let mated =
        |king: Option<Coord>, color: Color| king.is_some_and(|at| king_mated(board, at, color));
    let checkmate = (white_in_check && mated(kings.white, Color::White))
        || (black_in_check && mated(kings.black, Color::Black));

    CheckStatus {
        white_in_check,
        black_in_check,
        checkmate,
    }
}
