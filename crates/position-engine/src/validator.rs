//! Structural and semantic legality checks for a placed position.

use board_core::{Board, BoardError, Color, Coord, PieceKind, ROWS};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::check::{compute_check_status, CheckStatus, KingPositions};

/// Most pieces of one kind a side may have (standard set, counting promotions).
/// Kings are covered by the cardinality check.
pub const PIECE_LIMITS: [(PieceKind, usize); 5] = [
    (PieceKind::Queen, 9),
    (PieceKind::Rook, 10),
    (PieceKind::Bishop, 10),
    (PieceKind::Knight, 10),
    (PieceKind::Pawn, 8),
];

pub const MAX_PIECES_PER_SIDE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationErrorKind {
    MissingKing,
    MultipleKings,
    InvalidPawnPosition,
    KingsAdjacent,
    TooManyPieces,
    MalformedBoard,
    BothKingsInCheck,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    #[serde(rename = "type")]
    pub kind: ValidationErrorKind,
    pub color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub piece: Option<PieceKind>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub square: Option<Coord>,
    pub message: String,
    pub severity: Severity,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, color: Option<Color>) -> Self {
        let severity = match kind {
            ValidationErrorKind::BothKingsInCheck => Severity::Warning,
            _ => Severity::Error,
        };
        let mut error = Self {
            kind,
            color,
            piece: None,
            square: None,
            message: String::new(),
            severity,
        };
        error.message = format_error_message(&error);
        error
    }

    fn with_piece(mut self, piece: PieceKind) -> Self {
        self.piece = Some(piece);
        self.message = format_error_message(&self);
        self
    }

    fn at(mut self, square: Coord) -> Self {
        self.square = Some(square);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub king_positions: KingPositions,
    pub check_status: CheckStatus,
}

impl ValidationResult {
    pub fn has_error(&self, kind: ValidationErrorKind, color: Option<Color>) -> bool {
        self.errors.iter().any(|e| e.kind == kind && e.color == color)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.iter().filter(|e| !e.is_error())
    }
}

/// Template text for an error. Never panics; errors without a color use a
/// generic sentence.
pub fn format_error_message(error: &ValidationError) -> String {
    use ValidationErrorKind::*;

    match (error.kind, error.color) {
        (MissingKing, Some(color)) => format!("{color} king is missing"),
        (MultipleKings, Some(color)) => format!("{color} has more than one king"),
        (InvalidPawnPosition, Some(color)) => {
            format!("{color} pawn cannot stand on the first or last rank")
        }
        (TooManyPieces, Some(color)) => match error.piece {
            Some(piece) => format!("{color} has too many {}s", piece.name()),
            None => format!("{color} has more than {MAX_PIECES_PER_SIDE} pieces"),
        },
        (KingsAdjacent, _) => "Kings cannot stand on adjacent squares".to_string(),
        (MalformedBoard, _) => "Board could not be read".to_string(),
        (BothKingsInCheck, _) => "Both kings are in check at the same time".to_string(),
        _ => "Invalid position".to_string(),
    }
}

fn check_king_cardinality(board: &Board, errors: &mut Vec<ValidationError>) {
    for color in Color::ALL {
        match board.find_kings(color).count() {
            0 => errors.push(ValidationError::new(ValidationErrorKind::MissingKing, Some(color))),
            1 => {}
            _ => errors.push(ValidationError::new(ValidationErrorKind::MultipleKings, Some(color))),
        }
    }
}

fn check_pawn_ranks(board: &Board, errors: &mut Vec<ValidationError>) {
    let illegal = board
        .pieces()
        .filter(|(at, p)| p.kind == PieceKind::Pawn && (at.row == 0 || at.row as usize == ROWS - 1));
    for (at, pawn) in illegal {
        errors.push(
            ValidationError::new(ValidationErrorKind::InvalidPawnPosition, Some(pawn.color)).at(at),
        );
    }
}

fn check_king_adjacency(kings: &KingPositions, errors: &mut Vec<ValidationError>) {
    if let (Some(white), Some(black)) = (kings.white, kings.black) {
        if white.distance(black) == 1 {
            errors.push(ValidationError::new(ValidationErrorKind::KingsAdjacent, None).at(black));
        }
    }
}

fn check_piece_counts(board: &Board, errors: &mut Vec<ValidationError>) {
    for color in Color::ALL {
        for (kind, limit) in PIECE_LIMITS {
            if board.count(color, kind) > limit {
                errors.push(
                    ValidationError::new(ValidationErrorKind::TooManyPieces, Some(color))
                        .with_piece(kind),
                );
            }
        }
        if board.pieces_of(color).count() > MAX_PIECES_PER_SIDE {
            errors.push(ValidationError::new(ValidationErrorKind::TooManyPieces, Some(color)));
        }
    }
}

/// Run every check and collect all problems in one pass.
pub fn validate_position(board: &Board) -> ValidationResult {
    let mut errors = Vec::new();
    let king_positions = KingPositions::from_board(board);

    check_king_cardinality(board, &mut errors);
    check_pawn_ranks(board, &mut errors);
    check_king_adjacency(&king_positions, &mut errors);
    check_piece_counts(board, &mut errors);

    let check_status = compute_check_status(board, &king_positions);
    if check_status.white_in_check && check_status.black_in_check {
        errors.push(ValidationError::new(ValidationErrorKind::BothKingsInCheck, None));
    }

    let valid = !errors.iter().any(ValidationError::is_error);
    debug!(valid, errors = errors.len(), "validated position");

    ValidationResult {
        valid,
        errors,
        king_positions,
        check_status,
    }
}

/// Validate a board still in wire form. Unreadable input becomes a single
/// `malformed_board` error instead of a failure.
pub fn validate_wire(value: &Value) -> ValidationResult {
    match Board::from_wire(value) {
        Ok(board) => validate_position(&board),
        Err(e) => malformed(&e),
    }
}

fn malformed(e: &BoardError) -> ValidationResult {
    debug!(error = %e, "rejecting malformed board");
    let mut error = ValidationError::new(ValidationErrorKind::MalformedBoard, None);
    error.message = format!("{}: {e}", error.message);
    ValidationResult {
        valid: false,
        errors: vec![error],
        king_positions: KingPositions::default(),
        check_status: CheckStatus::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(placement: &str) -> ValidationResult {
        validate_position(&placement.parse().unwrap())
    }

    fn kinds(result: &ValidationResult) -> Vec<ValidationErrorKind> {
        result.errors.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_starting_position_is_valid() {
        let result = validate("rqkr/pppp/4/PPPP/RQKR");
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert_eq!(result.king_positions.white, Coord::new(4, 2));
        assert_eq!(result.king_positions.black, Coord::new(0, 2));
    }

    #[test]
    fn test_empty_board_reports_both_missing_kings() {
        let result = validate("4/4/4/4/4");
        assert!(!result.valid);
        assert!(result.has_error(ValidationErrorKind::MissingKing, Some(Color::White)));
        assert!(result.has_error(ValidationErrorKind::MissingKing, Some(Color::Black)));
        assert_eq!(result.king_positions, KingPositions::default());
    }

    #[test]
    fn test_multiple_kings_reports_first_found() {
        let result = validate("k3/4/1K2/4/K3");
        assert!(result.has_error(ValidationErrorKind::MultipleKings, Some(Color::White)));
        assert_eq!(result.king_positions.white, Coord::new(2, 1));
    }

    #[test]
    fn test_errors_accumulate_without_short_circuit() {
        // No white king, a black pawn on the last rank, a white pawn on the first.
        let result = validate("P1k1/4/4/4/p3");
        assert_eq!(
            kinds(&result),
            vec![
                ValidationErrorKind::MissingKing,
                ValidationErrorKind::InvalidPawnPosition,
                ValidationErrorKind::InvalidPawnPosition,
            ]
        );
        assert_eq!(result.errors[1].square, Coord::new(0, 0));
        assert_eq!(result.errors[1].color, Some(Color::White));
        assert_eq!(result.errors[2].color, Some(Color::Black));
    }

    #[test]
    fn test_adjacent_kings() {
        let result = validate("4/1k2/2K1/4/4");
        assert!(!result.valid);
        assert!(result.has_error(ValidationErrorKind::KingsAdjacent, None));
    }

    #[test]
    fn test_too_many_pieces() {
        let result = validate("k3/4/4/4/NNNN");
        assert!(result.has_error(ValidationErrorKind::MissingKing, Some(Color::White)));
        assert!(!result.has_error(ValidationErrorKind::TooManyPieces, Some(Color::White)));

        let result = validate("kQQQ/QQQQ/QQQ1/4/3K");
        assert!(result.has_error(ValidationErrorKind::TooManyPieces, Some(Color::White)));
        let error = result
            .errors
            .iter()
            .find(|e| e.kind == ValidationErrorKind::TooManyPieces)
            .unwrap();
        assert_eq!(error.piece, Some(PieceKind::Queen));
        assert_eq!(error.message, "White has too many queens");
    }

    #[test]
    fn test_check_is_not_an_error() {
        let result = validate("k3/4/2q1/4/2K1");
        assert!(result.valid);
        assert!(result.check_status.white_in_check);
        assert!(!result.check_status.black_in_check);
    }

    #[test]
    fn test_both_in_check_is_a_warning() {
        // Black rook checks the white king along row 4, white rook checks along row 0.
        let result = validate("k2R/4/4/4/r2K");
        assert!(result.valid);
        assert_eq!(result.warnings().count(), 1);
        assert_eq!(result.errors[0].kind, ValidationErrorKind::BothKingsInCheck);
    }

    #[test]
    fn test_malformed_wire_input() {
        let result = validate_wire(&json!([["K"]]));
        assert!(!result.valid);
        assert_eq!(kinds(&result), vec![ValidationErrorKind::MalformedBoard]);
        assert!(result.errors[0].message.starts_with("Board could not be read"));
    }

    #[test]
    fn test_format_error_message_fallback() {
        let mut error = ValidationError::new(ValidationErrorKind::MissingKing, None);
        assert_eq!(format_error_message(&error), "Invalid position");
        error.color = Some(Color::Black);
        assert_eq!(format_error_message(&error), "Black king is missing");
    }

    #[test]
    fn test_serializes_with_wire_names() {
        let result = validate("4/4/4/4/4");
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["errors"][0]["type"], "missing_king");
        assert_eq!(value["errors"][0]["severity"], "error");
        assert_eq!(value["errors"][0]["color"], "white");
    }
}
