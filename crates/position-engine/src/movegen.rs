//! Shared attack and move generation on the 5x4 board.
//!
//! Check detection and activity scoring both go through `attacks` and
//! `destinations`, so there is exactly one set of movement rules.

use board_core::{Board, Color, Coord, Piece, PieceKind};

const ORTHOGONAL: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const DIAGONAL: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];
const ALL_DIRECTIONS: [(i8, i8); 8] = [
    (-1, 0), (1, 0), (0, -1), (0, 1),
    (-1, -1), (-1, 1), (1, -1), (1, 1),
];
const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (-2, -1), (-2, 1), (-1, -2), (-1, 2),
    (1, -2), (1, 2), (2, -1), (2, 1),
];
const WHITE_PAWN_CAPTURES: [(i8, i8); 2] = [(-1, -1), (-1, 1)];
const BLACK_PAWN_CAPTURES: [(i8, i8); 2] = [(1, -1), (1, 1)];

/// Is this a ray (sliding) piece type?
pub fn is_ray_piece(kind: PieceKind) -> bool {
    matches!(kind, PieceKind::Queen | PieceKind::Rook | PieceKind::Bishop)
}

fn pattern(piece: Piece) -> (&'static [(i8, i8)], bool) {
    match piece.kind {
        PieceKind::King => (&ALL_DIRECTIONS, false),
        PieceKind::Queen => (&ALL_DIRECTIONS, true),
        PieceKind::Rook => (&ORTHOGONAL, true),
        PieceKind::Bishop => (&DIAGONAL, true),
        PieceKind::Knight => (&KNIGHT_JUMPS, false),
        PieceKind::Pawn => match piece.color {
            Color::White => (&WHITE_PAWN_CAPTURES, false),
            Color::Black => (&BLACK_PAWN_CAPTURES, false),
        },
    }
}

/// Lazy iterator over the squares a piece attacks. Rays stop on the first
/// occupied square, which is included.
pub struct Attacks<'a> {
    board: &'a Board,
    from: Coord,
    directions: &'static [(i8, i8)],
    sliding: bool,
    direction: usize,
    cursor: Coord,
}

impl Iterator for Attacks<'_> {
    type Item = Coord;

    fn next(&mut self) -> Option<Coord> {
        while let Some(&(d_row, d_col)) = self.directions.get(self.direction) {
            if !self.sliding {
                self.direction += 1;
                if let Some(to) = self.from.offset(d_row, d_col) {
                    return Some(to);
                }
                continue;
            }

            match self.cursor.offset(d_row, d_col) {
                Some(to) if self.board.piece_at(to).is_none() => {
                    self.cursor = to;
                    return Some(to);
                }
                Some(to) => {
                    self.direction += 1;
                    self.cursor = self.from;
                    return Some(to);
                }
                None => {
                    self.direction += 1;
                    self.cursor = self.from;
                }
            }
        }
        None
    }
}

/// Squares attacked by the piece on `from` (empty if the square is empty).
/// For pawns this is the two forward diagonals, not the push.
pub fn attacks(board: &Board, from: Coord) -> Attacks<'_> {
    let (directions, sliding): (&'static [(i8, i8)], bool) = match board.piece_at(from) {
        Some(piece) => pattern(piece),
        None => (&[], false),
    };
    Attacks {
        board,
        from,
        directions,
        sliding,
        direction: 0,
        cursor: from,
    }
}

/// Lazy iterator over pseudo-legal destination squares of one piece.
pub struct Destinations<'a> {
    board: &'a Board,
    piece: Option<Piece>,
    push: Option<Coord>,
    attacks: Attacks<'a>,
}

impl Iterator for Destinations<'_> {
    type Item = Coord;

    fn next(&mut self) -> Option<Coord> {
        if let Some(push) = self.push.take() {
            return Some(push);
        }
        let piece = self.piece?;
        let board = self.board;
        self.attacks.by_ref().find(|&to| match board.piece_at(to) {
            Some(target) => target.color != piece.color,
            // Pawns only move diagonally when capturing.
            None => piece.kind != PieceKind::Pawn,
        })
    }
}

/// Pseudo-legal destinations of the piece on `from`: any attacked square not
/// holding a friendly piece, plus a pawn's single push onto an empty square.
/// There is no double step, castling, or en passant on this board.
pub fn destinations(board: &Board, from: Coord) -> Destinations<'_> {
    let piece = board.piece_at(from);
    let push = piece
        .filter(|p| p.kind == PieceKind::Pawn)
        .and_then(|p| from.offset(p.color.forward(), 0))
        .filter(|&to| board.piece_at(to).is_none());
    Destinations {
        board,
        piece,
        push,
        attacks: attacks(board, from),
    }
}

/// All pieces of a given color that attack a square.
pub fn attackers(board: &Board, color: Color, square: Coord) -> impl Iterator<Item = Coord> + '_ {
    board
        .pieces_of(color)
        .map(|(at, _)| at)
        .filter(move |&at| attacks(board, at).any(|to| to == square))
}

pub fn is_attacked(board: &Board, square: Coord, by: Color) -> bool {
    attackers(board, by, square).next().is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: Coord,
    pub to: Coord,
    pub piece: Piece,
    pub captured: Option<Piece>,
}

impl Move {
    /// Board after the move. A pawn reaching the far rank becomes a queen.
    pub fn apply(&self, board: &Board) -> Board {
        let promotes = self.piece.kind == PieceKind::Pawn
            && self.to.offset(self.piece.color.forward(), 0).is_none();
        let mut next = board.moved(self.from, self.to);
        if promotes {
            next.set(self.to, Some(Piece::new(PieceKind::Queen, self.piece.color)));
        }
        next
    }
}

/// Every pseudo-legal move for one side, piece by piece in row-major order.
pub fn pseudo_legal_moves(board: &Board, color: Color) -> impl Iterator<Item = Move> + '_ {
    board.pieces_of(color).flat_map(move |(from, piece)| {
        destinations(board, from).map(move |to| Move {
            from,
            to,
            piece,
            captured: board.piece_at(to),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(row: usize, col: usize) -> Coord {
        Coord::new(row, col).unwrap()
    }

    #[test]
    fn test_rook_on_empty_board() {
        let board: Board = "4/4/1R2/4/4".parse().unwrap();
        // 4 squares along the column plus 3 along the row
        assert_eq!(attacks(&board, sq(2, 1)).count(), 7);
    }

    #[test]
    fn test_sliding_stops_at_blocker() {
        let board: Board = "4/1p2/1R2/4/1P2".parse().unwrap();
        let targets: Vec<Coord> = attacks(&board, sq(2, 1)).collect();
        assert!(targets.contains(&sq(1, 1)));
        assert!(!targets.contains(&sq(0, 1)));
        assert!(targets.contains(&sq(4, 1)));

        let moves: Vec<Coord> = destinations(&board, sq(2, 1)).collect();
        assert!(moves.contains(&sq(1, 1)), "capture of the black pawn");
        assert!(!moves.contains(&sq(4, 1)), "own pawn is not a destination");
    }

    #[test]
    fn test_knight_jumps_in_corner() {
        let board: Board = "N3/4/4/4/4".parse().unwrap();
        let mut targets: Vec<Coord> = attacks(&board, sq(0, 0)).collect();
        targets.sort();
        assert_eq!(targets, vec![sq(1, 2), sq(2, 1)]);
    }

    #[test]
    fn test_pawn_attacks_and_pushes() {
        let board: Board = "4/4/p1n1/1P2/4".parse().unwrap();
        let attacked: Vec<Coord> = attacks(&board, sq(3, 1)).collect();
        assert_eq!(attacked, vec![sq(2, 0), sq(2, 2)]);

        let mut moves: Vec<Coord> = destinations(&board, sq(3, 1)).collect();
        moves.sort();
        assert_eq!(moves, vec![sq(2, 0), sq(2, 1), sq(2, 2)]);

        let blocked: Board = "4/4/1p2/1P2/4".parse().unwrap();
        assert_eq!(destinations(&blocked, sq(3, 1)).count(), 0);
    }

    #[test]
    fn test_black_pawn_moves_down() {
        let board: Board = "4/1p2/4/4/4".parse().unwrap();
        let moves: Vec<Coord> = destinations(&board, sq(1, 1)).collect();
        assert_eq!(moves, vec![sq(2, 1)]);
    }

    #[test]
    fn test_attackers_reverse_lookup() {
        let board: Board = "k3/4/2q1/4/2K1".parse().unwrap();
        let found: Vec<Coord> = attackers(&board, Color::Black, sq(4, 2)).collect();
        assert_eq!(found, vec![sq(2, 2)]);
        assert!(!is_attacked(&board, sq(0, 0), Color::White));
    }

    #[test]
    fn test_promotion_on_apply() {
        let board: Board = "4/P3/4/4/4".parse().unwrap();
        let mv = pseudo_legal_moves(&board, Color::White).next().unwrap();
        let after = mv.apply(&board);
        assert_eq!(
            after.piece_at(sq(0, 0)),
            Some(Piece::new(PieceKind::Queen, Color::White))
        );
    }
}
