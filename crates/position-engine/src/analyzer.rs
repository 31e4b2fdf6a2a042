//! Position report: material, activity, king safety, center control, and
//! strategic recommendations.

use board_core::{Board, Color, Coord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::AnalysisError;
use crate::movegen::{attackers, destinations, is_attacked};

/// Material lead at which a recommendation is produced.
const MATERIAL_DEFICIT_THRESHOLD: i32 = 3;

const KING_STEPS: [(i8, i8); 8] = [
    (-1, -1), (-1, 0), (-1, 1),
    (0, -1), (0, 1),
    (1, -1), (1, 0), (1, 1),
];

/// Rows 1-3, columns 1-2.
pub fn center_squares() -> impl Iterator<Item = Coord> {
    (1..=3).flat_map(|row| (1..=2).filter_map(move |col| Coord::new(row, col)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Advantage {
    White,
    Black,
    Equal,
}

impl Advantage {
    fn from_diff(white_minus_black: i64) -> Self {
        match white_minus_black {
            d if d > 0 => Advantage::White,
            d if d < 0 => Advantage::Black,
            _ => Advantage::Equal,
        }
    }

    pub fn color(self) -> Option<Color> {
        match self {
            Advantage::White => Some(Color::White),
            Advantage::Black => Some(Color::Black),
            Advantage::Equal => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialBalance {
    pub white: i32,
    pub black: i32,
    pub advantage: Advantage,
    pub advantage_amount: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityStats {
    /// Pieces with at least one destination.
    pub mobile_pieces: u32,
    /// Sum of destinations over all pieces.
    pub total_moves: u32,
    pub immobile_pieces: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PieceActivity {
    pub white: ActivityStats,
    pub black: ActivityStats,
}

/// Ordered worst to best, so `Safe` compares greatest. `Unknown` (no king)
/// sorts below everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KingSafetyStatus {
    Unknown,
    Critical,
    Exposed,
    SlightlyExposed,
    Safe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KingSafety {
    pub status: KingSafetyStatus,
    pub escape_squares: u32,
    pub attacked_neighbors: u32,
    pub position: Option<Coord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KingSafetyReport {
    pub white: KingSafety,
    pub black: KingSafety,
}

impl KingSafetyReport {
    pub fn get(&self, color: Color) -> &KingSafety {
        match color {
            Color::White => &self.white,
            Color::Black => &self.black,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CenterControl {
    pub white: u32,
    pub black: u32,
    pub neutral: u32,
    pub advantage: Advantage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub material_balance: MaterialBalance,
    pub piece_activity: PieceActivity,
    pub king_safety: KingSafetyReport,
    pub center_control: CenterControl,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Count material for one side
pub fn material_count(board: &Board, color: Color) -> i32 {
    board.pieces_of(color).map(|(_, p)| p.kind.value()).sum()
}

pub fn material_balance(board: &Board) -> MaterialBalance {
    let white = material_count(board, Color::White);
    let black = material_count(board, Color::Black);
    MaterialBalance {
        white,
        black,
        advantage: Advantage::from_diff((white - black) as i64),
        advantage_amount: (white - black).abs(),
    }
}

fn activity_of(board: &Board, color: Color) -> ActivityStats {
    let mut stats = ActivityStats::default();
    for (at, _) in board.pieces_of(color) {
        let moves = destinations(board, at).count() as u32;
        stats.total_moves += moves;
        if moves > 0 {
            stats.mobile_pieces += 1;
        } else {
            stats.immobile_pieces += 1;
        }
    }
    stats
}

pub fn piece_activity(board: &Board) -> PieceActivity {
    PieceActivity {
        white: activity_of(board, Color::White),
        black: activity_of(board, Color::Black),
    }
}

/// Escape squares and attacked neighbours are measured with the king lifted
/// off the board, so a slider's ray continues through its square.
pub fn king_safety(board: &Board, color: Color) -> KingSafety {
    let Some(king) = board.king(color) else {
        return KingSafety {
            status: KingSafetyStatus::Unknown,
            escape_squares: 0,
            attacked_neighbors: 0,
            position: None,
        };
    };

    let lifted = board.without_piece(king);
    let mut escape_squares = 0;
    let mut attacked_neighbors = 0;
    for to in KING_STEPS.iter().filter_map(|&(dr, dc)| king.offset(dr, dc)) {
        let attacked = is_attacked(&lifted, to, !color);
        if attacked {
            attacked_neighbors += 1;
        }
        let own_piece = board.piece_at(to).is_some_and(|p| p.color == color);
        if !own_piece && !attacked {
            escape_squares += 1;
        }
    }

    let in_check = is_attacked(board, king, !color);
    let status = match (in_check, escape_squares, attacked_neighbors) {
        (true, 0, _) => KingSafetyStatus::Critical,
        (true, _, _) => KingSafetyStatus::Exposed,
        (false, _, n) if n >= 2 => KingSafetyStatus::Exposed,
        (false, _, 1) => KingSafetyStatus::SlightlyExposed,
        _ => KingSafetyStatus::Safe,
    };

    KingSafety {
        status,
        escape_squares,
        attacked_neighbors,
        position: Some(king),
    }
}

/// Each center square goes to the side with strictly more attackers.
pub fn center_control(board: &Board) -> CenterControl {
    let mut control = CenterControl {
        white: 0,
        black: 0,
        neutral: 0,
        advantage: Advantage::Equal,
    };
    for square in center_squares() {
        let white = attackers(board, Color::White, square).count();
        let black = attackers(board, Color::Black, square).count();
        match white.cmp(&black) {
            std::cmp::Ordering::Greater => control.white += 1,
            std::cmp::Ordering::Less => control.black += 1,
            std::cmp::Ordering::Equal => control.neutral += 1,
        }
    }
    control.advantage = Advantage::from_diff(control.white as i64 - control.black as i64);
    control
}

fn recommendations(
    material: &MaterialBalance,
    kings: &KingSafetyReport,
    center: &CenterControl,
) -> Vec<String> {
    let mut out = Vec::new();

    if material.advantage_amount >= MATERIAL_DEFICIT_THRESHOLD {
        if let Some(leader) = material.advantage.color() {
            out.push(format!(
                "{} is down {} points of material; {} should avoid even trades while {} simplifies",
                !leader, material.advantage_amount, !leader, leader
            ));
        }
    }

    for color in Color::ALL {
        match kings.get(color).status {
            KingSafetyStatus::Critical => out.push(format!(
                "{color} king is in critical danger; find an escape square or block the attack"
            )),
            KingSafetyStatus::Exposed => {
                out.push(format!("{color} king is exposed; bring defenders closer"))
            }
            KingSafetyStatus::Unknown => {
                out.push(format!("Place a {} king to assess king safety", color.name().to_lowercase()))
            }
            _ => {}
        }
    }

    let center_total = center.white + center.black + center.neutral;
    if center_total > 0 && center.neutral == center_total {
        out.push("Neither side controls the center; bring pieces toward the middle squares".to_string());
    } else if let Some(leader) = center.advantage.color() {
        out.push(format!("{leader} controls the center; {} should contest the middle squares", !leader));
    }

    if out.is_empty() {
        out.push("Position is balanced; improve the least active piece".to_string());
    }
    out
}

/// Analyze with an explicit timestamp.
pub fn analyze_position_at(board: &Board, timestamp: DateTime<Utc>) -> AnalysisResult {
    let material_balance = material_balance(board);
    let piece_activity = piece_activity(board);
    let king_safety = KingSafetyReport {
        white: king_safety(board, Color::White),
        black: king_safety(board, Color::Black),
    };
    let center_control = center_control(board);
    let recommendations = recommendations(&material_balance, &king_safety, &center_control);

    debug!(
        advantage = ?material_balance.advantage,
        recommendations = recommendations.len(),
        "analyzed position"
    );

    AnalysisResult {
        material_balance,
        piece_activity,
        king_safety,
        center_control,
        recommendations,
        timestamp,
    }
}

pub fn analyze_position(board: &Board) -> AnalysisResult {
    analyze_position_at(board, Utc::now())
}

/// Analyze a board in wire form; `null` and malformed input become errors.
pub fn analyze_wire(value: &Value) -> Result<AnalysisResult, AnalysisError> {
    if value.is_null() {
        return Err(AnalysisError::MissingBoard);
    }
    let board = Board::from_wire(value)?;
    Ok(analyze_position(&board))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn analyze(placement: &str) -> AnalysisResult {
        analyze_position(&placement.parse().unwrap())
    }

    #[test]
    fn test_material_count_starting() {
        let result = analyze("rqkr/pppp/4/PPPP/RQKR");
        // 4 pawns + 2 rooks + 1 queen = 4+10+9 = 23
        assert_eq!(result.material_balance.white, 23);
        assert_eq!(result.material_balance.black, 23);
        assert_eq!(result.material_balance.advantage, Advantage::Equal);
        assert_eq!(result.material_balance.advantage_amount, 0);
    }

    #[test]
    fn test_starting_activity_only_pawns_move() {
        let result = analyze("rqkr/pppp/4/PPPP/RQKR");
        let white = result.piece_activity.white;
        assert_eq!(white.mobile_pieces, 4);
        assert_eq!(white.total_moves, 4);
        assert_eq!(white.immobile_pieces, 4);
        assert_eq!(result.piece_activity.black, white);
    }

    #[test]
    fn test_starting_kings_safe_and_center_split() {
        let result = analyze("rqkr/pppp/4/PPPP/RQKR");
        assert_eq!(result.king_safety.white.status, KingSafetyStatus::Safe);
        assert_eq!(result.king_safety.white.position, Coord::new(4, 2));
        assert_eq!(result.center_control.white, 2);
        assert_eq!(result.center_control.black, 2);
        assert_eq!(result.center_control.neutral, 2);
        assert_eq!(result.center_control.advantage, Advantage::Equal);
        assert_eq!(result.recommendations, vec!["Position is balanced; improve the least active piece"]);
    }

    #[test]
    fn test_mated_king_is_critical_and_ordered_after_material() {
        let result = analyze("k2R/pp2/4/4/3K");
        assert_eq!(result.king_safety.black.status, KingSafetyStatus::Critical);
        assert_eq!(result.king_safety.black.escape_squares, 0);
        assert_eq!(result.material_balance.advantage, Advantage::White);
        assert_eq!(result.material_balance.advantage_amount, 3);
        assert!(result.recommendations[0].starts_with("Black is down 3 points"));
        assert!(result.recommendations[1].starts_with("Black king is in critical danger"));
    }

    #[test]
    fn test_missing_king_is_unknown() {
        let result = analyze("4/4/2q1/4/4");
        assert_eq!(result.king_safety.white.status, KingSafetyStatus::Unknown);
        assert_eq!(result.king_safety.white.position, None);
        assert_eq!(result.material_balance.advantage, Advantage::Black);
    }

    #[test]
    fn test_status_ordering() {
        assert!(KingSafetyStatus::Safe > KingSafetyStatus::SlightlyExposed);
        assert!(KingSafetyStatus::SlightlyExposed > KingSafetyStatus::Exposed);
        assert!(KingSafetyStatus::Exposed > KingSafetyStatus::Critical);
    }

    #[test]
    fn test_slightly_exposed_king() {
        // Black knight on (1, 0) covers (3, 1) only among the king's neighbours.
        let result = analyze("3k/n3/4/4/2K1");
        let white = result.king_safety.white;
        assert_eq!(white.attacked_neighbors, 1);
        assert_eq!(white.status, KingSafetyStatus::SlightlyExposed);
    }

    #[test]
    fn test_analyze_wire_errors() {
        let err = analyze_wire(&Value::Null).unwrap_err();
        assert_eq!(err, AnalysisError::MissingBoard);
        assert_eq!(err.to_report()["error"], true);

        assert!(matches!(
            analyze_wire(&json!([[1, 2]])),
            Err(AnalysisError::InvalidBoard(_))
        ));
    }

    #[test]
    fn test_fixed_timestamp() {
        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let board: Board = "rqkr/pppp/4/PPPP/RQKR".parse().unwrap();
        assert_eq!(analyze_position_at(&board, at).timestamp, at);
    }
}
