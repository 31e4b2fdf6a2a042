//! Compact board encoding for cache storage and share codes.
//!
//! Layout: one version byte, a 3-byte little-endian occupancy bitmap
//! (bit i = row-major square i), then one nibble per occupied square holding
//! `piece code + 1`, high nibble first. An odd piece count leaves a zero
//! low nibble as padding.

use serde::{Deserialize, Serialize};

use crate::board::{Board, Coord, Piece, PIECE_CODES, SQUARES};

pub const FORMAT_VERSION: u8 = 1;

/// Size of the uncompressed form: one byte per square.
pub const ORIGINAL_SIZE: usize = SQUARES;

const HEADER_LEN: usize = 4;
const BITMAP_MASK: u32 = (1 << SQUARES) - 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressedBlob {
    pub data: Vec<u8>,
    pub original_size: usize,
    pub compressed_size: usize,
}

impl CompressedBlob {
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let compressed_size = data.len();
        Self {
            data,
            original_size: ORIGINAL_SIZE,
            compressed_size,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn ratio(&self) -> f64 {
        self.compressed_size as f64 / self.original_size as f64
    }
}

/// Pack an occupancy bitmap and the piece codes of its set bits, in order.
pub(crate) fn pack(bitmap: u32, codes: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(HEADER_LEN + codes.len().div_ceil(2));
    data.push(FORMAT_VERSION);
    data.extend_from_slice(&bitmap.to_le_bytes()[..3]);
    for pair in codes.chunks(2) {
        let high = pair[0] + 1;
        let low = pair.get(1).map(|c| c + 1).unwrap_or(0);
        data.push((high << 4) | low);
    }
    data
}

/// Inverse of `pack`. Rejects anything `pack` could not have produced.
pub(crate) fn unpack(data: &[u8]) -> Option<(u32, Vec<u8>)> {
    if data.len() < HEADER_LEN || data[0] != FORMAT_VERSION {
        return None;
    }
    let bitmap = u32::from_le_bytes([data[1], data[2], data[3], 0]);
    if bitmap & !BITMAP_MASK != 0 {
        return None;
    }

    let count = bitmap.count_ones() as usize;
    let body = &data[HEADER_LEN..];
    if body.len() != count.div_ceil(2) {
        return None;
    }

    let mut codes = Vec::with_capacity(count);
    for (i, byte) in body.iter().enumerate() {
        let high = byte >> 4;
        let low = byte & 0x0F;
        codes.push(nibble_code(high)?);
        if codes.len() < count {
            codes.push(nibble_code(low)?);
        } else if low != 0 || i + 1 != body.len() {
            return None;
        }
    }
    Some((bitmap, codes))
}

fn nibble_code(nibble: u8) -> Option<u8> {
    if nibble == 0 || nibble as usize > PIECE_CODES {
        None
    } else {
        Some(nibble - 1)
    }
}

pub fn compress(board: &Board) -> CompressedBlob {
    let mut bitmap = 0u32;
    let mut codes = Vec::new();
    for (at, piece) in board.pieces() {
        bitmap |= 1 << at.index();
        codes.push(piece.code());
    }
    CompressedBlob::from_bytes(pack(bitmap, &codes))
}

/// Returns `None` for corrupt or foreign data.
pub fn decompress(blob: &CompressedBlob) -> Option<Board> {
    decompress_bytes(&blob.data)
}

pub fn decompress_bytes(data: &[u8]) -> Option<Board> {
    let (bitmap, codes) = unpack(data)?;
    let mut board = Board::empty();
    let occupied = (0..SQUARES).filter(|i| bitmap & (1 << i) != 0);
    for (index, code) in occupied.zip(codes) {
        board.set(Coord::from_index(index)?, Some(Piece::from_code(code)?));
    }
    Some(board)
}
