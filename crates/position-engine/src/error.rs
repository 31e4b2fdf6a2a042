//! Analyzer error types

use board_core::BoardError;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("No board to analyze")]
    MissingBoard,

    #[error("Board cannot be analyzed: {0}")]
    InvalidBoard(#[from] BoardError),
}

impl AnalysisError {
    /// The `{"error": true, "message": ...}` report handed to callers.
    pub fn to_report(&self) -> Value {
        json!({ "error": true, "message": self.to_string() })
    }
}
