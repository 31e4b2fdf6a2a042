//! URL-safe share codes.
//!
//! A board is mapped to a single integer, then written in base 64 over
//! `[A-Za-z0-9_-]`, most significant digit first. Boards with exactly one
//! king per colour come first: white king square, black king square among
//! the other 19, then the remaining 18 cells in base 11 (empty or one of the
//! ten non-king pieces). That range is below 64^12, so every such board gets
//! 12 characters or fewer. All other boards follow, enumerated by piece
//! count, then by the combinatorial rank of the occupied squares, then by the
//! piece codes read as a base-12 number; the longest of those codes is 13.

use std::sync::LazyLock;

use regex::Regex;

use crate::board::{Board, Color, Coord, Piece, PieceKind, PIECE_CODES, SQUARES};
use crate::compress::{self, CompressedBlob};
use crate::error::ShareCodeError;

const ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

pub const MAX_CODE_LEN: usize = 13;

/// Longest code of a board with exactly one king per colour.
pub const ROYAL_CODE_LEN: usize = 12;

/// Empty plus the ten non-king pieces.
const ROYAL_CELL_RADIX: u128 = 11;
const ROYAL_CELLS: u32 = (SQUARES - 2) as u32;
const KING_PAIRS: u128 = (SQUARES * (SQUARES - 1)) as u128;

static SHARE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,13}$").expect("share code pattern is valid"));

fn binomial(n: usize, k: usize) -> u128 {
    if k > n {
        return 0;
    }
    let k = k.min(n - k);
    let mut result: u128 = 1;
    for i in 0..k {
        result = result * (n - i) as u128 / (i + 1) as u128;
    }
    result
}

fn piece_radix_pow(k: usize) -> u128 {
    (PIECE_CODES as u128).pow(k as u32)
}

/// Number of boards with fewer than `k` pieces.
fn count_offset(k: usize) -> u128 {
    (0..k).map(|j| binomial(SQUARES, j) * piece_radix_pow(j)).sum()
}

/// Combinatorial number system rank of a set of squares.
fn combination_rank(bitmap: u32) -> u128 {
    (0..SQUARES)
        .filter(|i| bitmap & (1 << i) != 0)
        .enumerate()
        .map(|(nth, square)| binomial(square, nth + 1))
        .sum()
}

fn combination_unrank(mut rank: u128, k: usize) -> u32 {
    let mut bitmap = 0u32;
    let mut upper = SQUARES;
    for nth in (1..=k).rev() {
        let mut square = nth - 1;
        while square + 1 < upper && binomial(square + 1, nth) <= rank {
            square += 1;
        }
        rank -= binomial(square, nth);
        bitmap |= 1 << square;
        upper = square;
    }
    bitmap
}

/// Number of boards with exactly one king per colour.
fn royal_count() -> u128 {
    KING_PAIRS * ROYAL_CELL_RADIX.pow(ROYAL_CELLS)
}

/// The single white and black king squares, if there is exactly one of each.
fn royal_kings(board: &Board) -> Option<(Coord, Coord)> {
    let single = |color| {
        let mut kings = board.find_kings(color);
        let first = kings.next()?;
        kings.next().is_none().then_some(first)
    };
    Some((single(Color::White)?, single(Color::Black)?))
}

/// Non-king piece codes skip the king slot of each colour: 1..=5 white, 6..=10 black.
fn royal_digit(piece: Option<Piece>) -> u128 {
    match piece {
        None => 0,
        Some(p) => {
            let code = p.code() as usize;
            (code - code / PieceKind::ALL.len()) as u128
        }
    }
}

fn royal_piece(digit: u128) -> Option<Option<Piece>> {
    if digit == 0 {
        return Some(None);
    }
    let digit = digit as usize;
    let code = digit + (digit - 1) / (PieceKind::ALL.len() - 1);
    let piece = Piece::from_code(code as u8)?;
    (piece.kind != PieceKind::King).then_some(Some(piece))
}

fn royal_to_integer(board: &Board, white: Coord, black: Coord) -> u128 {
    let (w, b) = (white.index(), black.index());
    let b_rank = if b > w { b - 1 } else { b };
    let mut value = (w * (SQUARES - 1) + b_rank) as u128;
    for (index, cell) in board.cells().iter().enumerate() {
        if index != w && index != b {
            value = value * ROYAL_CELL_RADIX + royal_digit(*cell);
        }
    }
    value
}

fn integer_to_royal(value: u128) -> Option<Board> {
    let cells_radix = ROYAL_CELL_RADIX.pow(ROYAL_CELLS);
    let pair = (value / cells_radix) as usize;
    let mut digits = value % cells_radix;
    let w = pair / (SQUARES - 1);
    let b_rank = pair % (SQUARES - 1);
    let b = if b_rank >= w { b_rank + 1 } else { b_rank };

    let mut board = Board::empty()
        .with_piece(Coord::from_index(w)?, Piece::new(PieceKind::King, Color::White))
        .with_piece(Coord::from_index(b)?, Piece::new(PieceKind::King, Color::Black));
    for index in (0..SQUARES).rev().filter(|&i| i != w && i != b) {
        if let Some(piece) = royal_piece(digits % ROYAL_CELL_RADIX)? {
            board.set(Coord::from_index(index)?, Some(piece));
        }
        digits /= ROYAL_CELL_RADIX;
    }
    Some(board)
}

fn enumerative_rank(board: &Board) -> u128 {
    let mut bitmap = 0u32;
    let mut digits = 0u128;
    let mut k = 0;
    for (at, piece) in board.pieces() {
        bitmap |= 1 << at.index();
        digits = digits * PIECE_CODES as u128 + piece.code() as u128;
        k += 1;
    }
    count_offset(k) + combination_rank(bitmap) * piece_radix_pow(k) + digits
}

fn enumerative_unrank(value: u128) -> Option<Board> {
    if value >= count_offset(SQUARES + 1) {
        return None;
    }
    let k = (0..=SQUARES).rev().find(|&k| count_offset(k) <= value)?;
    let rest = value - count_offset(k);
    let radix = piece_radix_pow(k);
    let bitmap = combination_unrank(rest / radix, k);

    let mut digits = rest % radix;
    let mut codes = vec![0u8; k];
    for slot in codes.iter_mut().rev() {
        *slot = (digits % PIECE_CODES as u128) as u8;
        digits /= PIECE_CODES as u128;
    }
    compress::decompress_bytes(&compress::pack(bitmap, &codes))
}

fn position_to_integer(board: &Board) -> u128 {
    match royal_kings(board) {
        Some((white, black)) => royal_to_integer(board, white, black),
        None => royal_count() + enumerative_rank(board),
    }
}

fn integer_to_position(value: u128) -> Result<Board, ShareCodeError> {
    if value < royal_count() {
        return integer_to_royal(value).ok_or(ShareCodeError::OutOfRange);
    }
    let board = enumerative_unrank(value - royal_count()).ok_or(ShareCodeError::OutOfRange)?;
    if royal_kings(&board).is_some() {
        return Err(ShareCodeError::InvalidFormat(
            "board with one king per colour outside the royal range".to_string(),
        ));
    }
    Ok(board)
}

fn to_base64_digits(mut value: u128) -> String {
    let mut out = Vec::new();
    loop {
        out.push(ALPHABET[(value % 64) as usize]);
        value /= 64;
        if value == 0 {
            break;
        }
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}

fn from_base64_digits(code: &str) -> Result<u128, ShareCodeError> {
    if !SHARE_CODE_RE.is_match(code) {
        return Err(ShareCodeError::InvalidFormat(code.to_string()));
    }
    if code.len() > 1 && code.starts_with('A') {
        return Err(ShareCodeError::InvalidFormat(format!("{code} has a leading zero digit")));
    }
    let mut value = 0u128;
    for byte in code.bytes() {
        let digit = ALPHABET
            .iter()
            .position(|&a| a == byte)
            .ok_or_else(|| ShareCodeError::InvalidFormat(code.to_string()))?;
        value = value * 64 + digit as u128;
    }
    Ok(value)
}

/// Share code of a compressed blob.
pub fn encode_blob(blob: &CompressedBlob) -> Result<String, ShareCodeError> {
    let board = compress::decompress(blob).ok_or(ShareCodeError::CorruptBlob)?;
    Ok(encode_position(&board))
}

pub fn decode_blob(code: &str) -> Result<CompressedBlob, ShareCodeError> {
    decode_position(code).map(|board| compress::compress(&board))
}

pub fn encode_position(board: &Board) -> String {
    to_base64_digits(position_to_integer(board))
}

pub fn decode_position(code: &str) -> Result<Board, ShareCodeError> {
    integer_to_position(from_base64_digits(code)?)
}

/// `<base>?position=<code>`
pub fn share_url(base: &str, board: &Board) -> String {
    format!("{}?position={}", base.trim_end_matches('?'), encode_position(board))
}

/// Extract the `position` parameter from a query string (with or without `?`).
pub fn code_from_query(query: &str) -> Option<&str> {
    let query = query.rsplit_once('?').map(|(_, q)| q).unwrap_or(query);
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "position")
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}
