//! The 5x4 setup board and its piece types.
//!
//! Row 0 is Black's back rank and row 4 is White's. White pawns advance
//! toward row 0, Black pawns toward row 4.

use std::fmt;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::BoardError;

pub const ROWS: usize = 5;
pub const COLS: usize = 4;
pub const SQUARES: usize = ROWS * COLS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub const ALL: [Color; 2] = [Color::White, Color::Black];

    pub fn name(self) -> &'static str {
        match self {
            Color::White => "White",
            Color::Black => "Black",
        }
    }

    /// Row delta of a pawn step for this color.
    pub fn forward(self) -> i8 {
        match self {
            Color::White => -1,
            Color::Black => 1,
        }
    }

    fn index(self) -> usize {
        match self {
            Color::White => 0,
            Color::Black => 1,
        }
    }
}

impl std::ops::Not for Color {
    type Output = Color;

    fn not(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        PieceKind::King,
        PieceKind::Queen,
        PieceKind::Rook,
        PieceKind::Bishop,
        PieceKind::Knight,
        PieceKind::Pawn,
    ];

    /// Uppercase wire symbol.
    pub fn symbol(self) -> char {
        match self {
            PieceKind::King => 'K',
            PieceKind::Queen => 'Q',
            PieceKind::Rook => 'R',
            PieceKind::Bishop => 'B',
            PieceKind::Knight => 'N',
            PieceKind::Pawn => 'P',
        }
    }

    pub fn from_symbol(c: char) -> Option<PieceKind> {
        match c.to_ascii_uppercase() {
            'K' => Some(PieceKind::King),
            'Q' => Some(PieceKind::Queen),
            'R' => Some(PieceKind::Rook),
            'B' => Some(PieceKind::Bishop),
            'N' => Some(PieceKind::Knight),
            'P' => Some(PieceKind::Pawn),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PieceKind::King => "king",
            PieceKind::Queen => "queen",
            PieceKind::Rook => "rook",
            PieceKind::Bishop => "bishop",
            PieceKind::Knight => "knight",
            PieceKind::Pawn => "pawn",
        }
    }

    /// Material value in pawns (king excluded).
    pub fn value(self) -> i32 {
        match self {
            PieceKind::Pawn => 1,
            PieceKind::Knight => 3,
            PieceKind::Bishop => 3,
            PieceKind::Rook => 5,
            PieceKind::Queen => 9,
            PieceKind::King => 0,
        }
    }

    fn index(self) -> usize {
        match self {
            PieceKind::King => 0,
            PieceKind::Queen => 1,
            PieceKind::Rook => 2,
            PieceKind::Bishop => 3,
            PieceKind::Knight => 4,
            PieceKind::Pawn => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

/// Number of distinct (color, kind) pieces.
pub const PIECE_CODES: usize = 12;

impl Piece {
    pub const fn new(kind: PieceKind, color: Color) -> Self {
        Self { kind, color }
    }

    /// Wire symbol: uppercase for White, lowercase for Black.
    pub fn symbol(self) -> char {
        match self.color {
            Color::White => self.kind.symbol(),
            Color::Black => self.kind.symbol().to_ascii_lowercase(),
        }
    }

    pub fn from_symbol(c: char) -> Option<Piece> {
        let kind = PieceKind::from_symbol(c)?;
        let color = if c.is_ascii_uppercase() { Color::White } else { Color::Black };
        Some(Piece { kind, color })
    }

    /// Dense code in `0..PIECE_CODES`: White K..P, then Black K..P.
    pub fn code(self) -> u8 {
        (self.color.index() * PieceKind::ALL.len() + self.kind.index()) as u8
    }

    pub fn from_code(code: u8) -> Option<Piece> {
        let code = code as usize;
        if code >= PIECE_CODES {
            return None;
        }
        let color = Color::ALL[code / PieceKind::ALL.len()];
        let kind = PieceKind::ALL[code % PieceKind::ALL.len()];
        Some(Piece { kind, color })
    }
}

/// A square on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub row: u8,
    pub col: u8,
}

impl Coord {
    pub fn new(row: usize, col: usize) -> Option<Coord> {
        if row < ROWS && col < COLS {
            Some(Coord { row: row as u8, col: col as u8 })
        } else {
            None
        }
    }

    /// Row-major index in `0..SQUARES`.
    pub fn index(self) -> usize {
        self.row as usize * COLS + self.col as usize
    }

    pub fn from_index(index: usize) -> Option<Coord> {
        if index < SQUARES {
            Coord::new(index / COLS, index % COLS)
        } else {
            None
        }
    }

    /// Step by a delta, staying on the board.
    pub fn offset(self, d_row: i8, d_col: i8) -> Option<Coord> {
        let row = self.row as i8 + d_row;
        let col = self.col as i8 + d_col;
        if row < 0 || col < 0 {
            return None;
        }
        Coord::new(row as usize, col as usize)
    }

    /// Chebyshev distance.
    pub fn distance(self, other: Coord) -> u8 {
        self.row.abs_diff(other.row).max(self.col.abs_diff(other.col))
    }

    pub fn all() -> impl Iterator<Item = Coord> {
        (0..SQUARES).filter_map(Coord::from_index)
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Count of each (color, kind) on a board, indexed by `Piece::code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PieceProfile(pub [u8; PIECE_CODES]);

impl PieceProfile {
    pub fn count(&self, piece: Piece) -> u8 {
        self.0[piece.code() as usize]
    }

    pub fn total(&self) -> u32 {
        self.0.iter().map(|&n| n as u32).sum()
    }

    /// Size of the multiset symmetric difference.
    pub fn symmetric_difference(&self, other: &PieceProfile) -> u32 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(&a, &b)| a.abs_diff(b) as u32)
            .sum()
    }

    /// `1 - |A△B| / (|A| + |B|)`, always within `[0, 1]`. Two empty profiles are identical.
    pub fn similarity(&self, other: &PieceProfile) -> f64 {
        let total = self.total() + other.total();
        if total == 0 {
            return 1.0;
        }
        1.0 - self.symmetric_difference(other) as f64 / total as f64
    }
}

/// A 5x4 grid of optional pieces. Plain value: edits return a new board.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Board {
    cells: [Option<Piece>; SQUARES],
}

impl Board {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: [[Option<Piece>; COLS]; ROWS]) -> Self {
        let mut board = Board::empty();
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                board.cells[r * COLS + c] = *cell;
            }
        }
        board
    }

    pub fn piece_at(&self, at: Coord) -> Option<Piece> {
        self.cells[at.index()]
    }

    pub fn set(&mut self, at: Coord, piece: Option<Piece>) {
        self.cells[at.index()] = piece;
    }

    pub fn with_piece(&self, at: Coord, piece: Piece) -> Board {
        let mut next = *self;
        next.set(at, Some(piece));
        next
    }

    pub fn without_piece(&self, at: Coord) -> Board {
        let mut next = *self;
        next.set(at, None);
        next
    }

    /// Move whatever stands on `from` to `to`, replacing any occupant.
    pub fn moved(&self, from: Coord, to: Coord) -> Board {
        let mut next = *self;
        let piece = next.cells[from.index()].take();
        next.set(to, piece);
        next
    }

    pub fn cells(&self) -> &[Option<Piece>; SQUARES] {
        &self.cells
    }

    /// Occupied squares in row-major order.
    pub fn pieces(&self) -> impl Iterator<Item = (Coord, Piece)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter_map(|(i, cell)| Some((Coord::from_index(i)?, (*cell)?)))
    }

    pub fn pieces_of(&self, color: Color) -> impl Iterator<Item = (Coord, Piece)> + '_ {
        self.pieces().filter(move |(_, p)| p.color == color)
    }

    /// King squares of a color, lowest row first, then lowest column.
    pub fn find_kings(&self, color: Color) -> impl Iterator<Item = Coord> + '_ {
        self.pieces_of(color)
            .filter(|(_, p)| p.kind == PieceKind::King)
            .map(|(at, _)| at)
    }

    pub fn king(&self, color: Color) -> Option<Coord> {
        self.find_kings(color).next()
    }

    pub fn count(&self, color: Color, kind: PieceKind) -> usize {
        self.pieces_of(color).filter(|(_, p)| p.kind == kind).count()
    }

    pub fn piece_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.piece_count() == 0
    }

    pub fn piece_profile(&self) -> PieceProfile {
        let mut profile = PieceProfile::default();
        for (_, piece) in self.pieces() {
            profile.0[piece.code() as usize] += 1;
        }
        profile
    }

    /// Parse the wire shape: 5 arrays of 4 cells, each `null` or a piece symbol.
    pub fn from_wire(value: &Value) -> Result<Board, BoardError> {
        let rows = value.as_array().ok_or(BoardError::NotAnArray)?;
        if rows.len() != ROWS {
            return Err(BoardError::WrongRowCount(rows.len()));
        }

        let mut board = Board::empty();
        for (r, row) in rows.iter().enumerate() {
            let cells = row.as_array().ok_or(BoardError::RowNotAnArray(r))?;
            if cells.len() != COLS {
                return Err(BoardError::WrongColumnCount { row: r, found: cells.len() });
            }
            for (c, cell) in cells.iter().enumerate() {
                let piece = match cell {
                    Value::Null => None,
                    Value::String(s) => Some(parse_symbol(s).ok_or_else(|| {
                        BoardError::InvalidSymbol { row: r, col: c, symbol: s.clone() }
                    })?),
                    other => {
                        return Err(BoardError::InvalidSymbol {
                            row: r,
                            col: c,
                            symbol: other.to_string(),
                        })
                    }
                };
                board.cells[r * COLS + c] = piece;
            }
        }
        Ok(board)
    }

    pub fn to_wire(&self) -> Value {
        Value::Array(
            self.cells
                .chunks(COLS)
                .map(|row| {
                    Value::Array(
                        row.iter()
                            .map(|cell| match cell {
                                Some(p) => Value::String(p.symbol().to_string()),
                                None => Value::Null,
                            })
                            .collect(),
                    )
                })
                .collect(),
        )
    }

    /// Parse a FEN-style placement such as `rqkr/pppp/4/PPPP/RQKR`.
    pub fn from_placement(placement: &str) -> Result<Board, BoardError> {
        let rows: Vec<&str> = placement.trim().split('/').collect();
        if rows.len() != ROWS {
            return Err(BoardError::WrongRowCount(rows.len()));
        }

        let mut board = Board::empty();
        for (r, row) in rows.iter().enumerate() {
            let mut c = 0usize;
            for ch in row.chars() {
                if let Some(run) = ch.to_digit(10) {
                    c += run as usize;
                    continue;
                }
                let piece = Piece::from_symbol(ch).ok_or_else(|| BoardError::InvalidSymbol {
                    row: r,
                    col: c,
                    symbol: ch.to_string(),
                })?;
                if c >= COLS {
                    return Err(BoardError::WrongColumnCount { row: r, found: c + 1 });
                }
                board.cells[r * COLS + c] = Some(piece);
                c += 1;
            }
            if c != COLS {
                return Err(BoardError::WrongColumnCount { row: r, found: c });
            }
        }
        Ok(board)
    }

    pub fn to_placement(&self) -> String {
        let mut out = String::new();
        for (r, row) in self.cells.chunks(COLS).enumerate() {
            if r > 0 {
                out.push('/');
            }
            let mut run = 0;
            for cell in row {
                match cell {
                    Some(p) => {
                        if run > 0 {
                            out.push_str(&run.to_string());
                            run = 0;
                        }
                        out.push(p.symbol());
                    }
                    None => run += 1,
                }
            }
            if run > 0 {
                out.push_str(&run.to_string());
            }
        }
        out
    }
}

fn parse_symbol(s: &str) -> Option<Piece> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Piece::from_symbol(c),
        _ => None,
    }
}

/// Structural equality of two boards.
pub fn compare_positions(a: &Board, b: &Board) -> bool {
    a == b
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Board({})", self.to_placement())
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(COLS) {
            for cell in row {
                let ch = cell.map(|p| p.symbol()).unwrap_or('.');
                write!(f, "{ch}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl FromStr for Board {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Board::from_placement(s)
    }
}

impl Serialize for Board {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Board::from_wire(&value).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn starting_wire() -> Value {
        json!([
            ["r", "q", "k", "r"],
            ["p", "p", "p", "p"],
            [null, null, null, null],
            ["P", "P", "P", "P"],
            ["R", "Q", "K", "R"]
        ])
    }

    #[test]
    fn test_wire_parse_starting_position() {
        let board = Board::from_wire(&starting_wire()).unwrap();
        assert_eq!(board.piece_count(), 16);
        assert_eq!(board.king(Color::White), Coord::new(4, 2));
        assert_eq!(board.king(Color::Black), Coord::new(0, 2));
        assert_eq!(board.to_wire(), starting_wire());
    }

    #[test]
    fn test_wire_rejects_bad_shapes() {
        assert_eq!(Board::from_wire(&json!(null)), Err(BoardError::NotAnArray));
        assert_eq!(Board::from_wire(&json!([[], []])), Err(BoardError::WrongRowCount(2)));

        let short_row = json!([[null, null, null, null], [null], [null, null, null, null], [null, null, null, null], [null, null, null, null]]);
        assert_eq!(
            Board::from_wire(&short_row),
            Err(BoardError::WrongColumnCount { row: 1, found: 1 })
        );

        let bad_symbol = json!([["x", null, null, null], [null, null, null, null], [null, null, null, null], [null, null, null, null], [null, null, null, null]]);
        assert!(matches!(
            Board::from_wire(&bad_symbol),
            Err(BoardError::InvalidSymbol { row: 0, col: 0, .. })
        ));
    }

    #[test]
    fn test_placement_matches_wire() {
        let from_placement: Board = "rqkr/pppp/4/PPPP/RQKR".parse().unwrap();
        let from_wire = Board::from_wire(&starting_wire()).unwrap();
        assert_eq!(from_placement, from_wire);
        assert_eq!(from_wire.to_placement(), "rqkr/pppp/4/PPPP/RQKR");
        assert!(Board::from_placement("rqkr/pppp/5/PPPP/RQKR").is_err());
    }

    #[test]
    fn test_copy_on_write_edits() {
        let empty = Board::empty();
        let at = Coord::new(2, 1).unwrap();
        let placed = empty.with_piece(at, Piece::new(PieceKind::Knight, Color::White));
        assert!(empty.is_empty());
        assert_eq!(placed.piece_count(), 1);
        assert!(placed.without_piece(at).is_empty());
        assert!(!compare_positions(&empty, &placed));
    }

    #[test]
    fn test_piece_codes_round_trip() {
        for code in 0..PIECE_CODES as u8 {
            let piece = Piece::from_code(code).unwrap();
            assert_eq!(piece.code(), code);
            assert_eq!(Piece::from_symbol(piece.symbol()), Some(piece));
        }
        assert_eq!(Piece::from_code(12), None);
    }

    #[test]
    fn test_chebyshev_distance() {
        let a = Coord::new(0, 0).unwrap();
        let b = Coord::new(1, 1).unwrap();
        let c = Coord::new(4, 1).unwrap();
        assert_eq!(a.distance(b), 1);
        assert_eq!(a.distance(c), 4);
        assert_eq!(a.offset(-1, 0), None);
        assert_eq!(Coord::new(5, 0), None);
    }

    #[test]
    fn test_profile_similarity_bounds() {
        let start: Board = "rqkr/pppp/4/PPPP/RQKR".parse().unwrap();
        let kings: Board = "2k1/4/4/4/2K1".parse().unwrap();
        let empty = Board::empty();

        let s = start.piece_profile().similarity(&kings.piece_profile());
        assert!(s > 0.0 && s < 1.0);
        assert_eq!(start.piece_profile().similarity(&start.piece_profile()), 1.0);
        assert_eq!(empty.piece_profile().similarity(&empty.piece_profile()), 1.0);
        assert_eq!(empty.piece_profile().similarity(&kings.piece_profile()), 0.0);
    }
}
