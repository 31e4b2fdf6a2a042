//! Board and share-code error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("Board must be an array of rows")]
    NotAnArray,

    #[error("Row {0} must be an array of cells")]
    RowNotAnArray(usize),

    #[error("Board must have 5 rows, found {0}")]
    WrongRowCount(usize),

    #[error("Row {row} must have 4 cells, found {found}")]
    WrongColumnCount { row: usize, found: usize },

    #[error("Invalid piece symbol {symbol} at ({row}, {col})")]
    InvalidSymbol { row: usize, col: usize, symbol: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareCodeError {
    #[error("Share code has invalid format: {0}")]
    InvalidFormat(String),

    #[error("Share code does not name a board")]
    OutOfRange,

    #[error("Compressed board is corrupt")]
    CorruptBlob,
}
