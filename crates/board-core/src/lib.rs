//! Board model and encodings for the 5x4 position setup tool.

pub mod board;
pub mod compress;
pub mod error;
pub mod presets;
pub mod share_code;

pub use board::{compare_positions, Board, Color, Coord, Piece, PieceKind, PieceProfile, COLS, ROWS, SQUARES};
pub use compress::{compress, decompress, CompressedBlob};
pub use error::{BoardError, ShareCodeError};
pub use presets::{preset, Preset, PRESETS};
pub use share_code::{decode_position, encode_position};
