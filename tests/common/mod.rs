#![allow(dead_code)]

use std::sync::Arc;

use board_core::{Board, Color, Coord, Piece, PieceKind};
use chrono::{DateTime, Utc};
use history_cache::{CacheConfig, HistoryCache, InMemorySource, ManualClock, Metadata, NoopMonitor};
use serde_json::json;

/// Parse a placement string such as `k3/4/4/4/3K`.
pub fn board(placement: &str) -> Board {
    Board::from_placement(placement).unwrap()
}

pub fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

/// Deterministic pseudo-random boards with up to `max_pieces` pieces.
/// Pawns never land on the back ranks so most boards are plausible setups.
pub fn sparse_boards(seed: u64, count: usize, max_pieces: usize) -> Vec<Board> {
    let mut state = seed;
    let mut next = move || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (state >> 33) as usize
    };

    (0..count)
        .map(|_| {
            let mut board = Board::empty();
            let pieces = next() % (max_pieces + 1);
            for _ in 0..pieces {
                let at = Coord::from_index(next() % 20).unwrap();
                let color = if next() % 2 == 0 { Color::White } else { Color::Black };
                let mut kind = PieceKind::ALL[next() % 6];
                if kind == PieceKind::Pawn && (at.row == 0 || at.row == 4) {
                    kind = PieceKind::Knight;
                }
                board = board.with_piece(at, Piece::new(kind, color));
            }
            board
        })
        .collect()
}

/// A history of `len` distinct positions named `position <i>`, tagged by parity.
pub fn history(len: usize) -> InMemorySource {
    let mut source = InMemorySource::default();
    for (i, position) in distinct_positions(len).into_iter().enumerate() {
        let mut meta = Metadata::new();
        meta.insert("name".to_string(), json!(format!("position {i}")));
        meta.insert(
            "tags".to_string(),
            json!([if i % 2 == 0 { "even" } else { "odd" }]),
        );
        source.push(position, meta);
    }
    source
}

/// Kings fixed in opposite corners plus one or two white minor pieces.
pub fn distinct_positions(len: usize) -> Vec<Board> {
    let kings = board("k3/4/4/4/3K");
    let free: Vec<Coord> = Coord::all().filter(|c| kings.piece_at(*c).is_none()).collect();
    let mut out = Vec::with_capacity(len);
    'outer: for &a in &free {
        out.push(kings.with_piece(a, Piece::new(PieceKind::Knight, Color::White)));
        if out.len() == len {
            break;
        }
        for &b in &free {
            if b <= a {
                continue;
            }
            out.push(
                kings
                    .with_piece(a, Piece::new(PieceKind::Knight, Color::White))
                    .with_piece(b, Piece::new(PieceKind::Bishop, Color::White)),
            );
            if out.len() == len {
                break 'outer;
            }
        }
    }
    out
}

pub fn cache(config: CacheConfig, history_len: usize) -> (HistoryCache, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(epoch()));
    let cache = HistoryCache::new(
        config,
        clock.clone(),
        Box::new(history(history_len)),
        Box::new(NoopMonitor),
    )
    .unwrap();
    (cache, clock)
}
