//! Legality checks and analysis for 5x4 setup positions.
//!
//! `validator` answers "can this position exist", `check` answers "is a king
//! attacked or mated", and `analyzer` produces the report the setup screen
//! shows. All three share the move rules in `movegen`.

pub mod analyzer;
pub mod check;
pub mod error;
pub mod movegen;
pub mod validator;

pub use analyzer::{analyze_position, analyze_wire, AnalysisResult, KingSafetyStatus};
pub use check::{compute_check_status, CheckStatus, KingPositions};
pub use error::AnalysisError;
pub use validator::{
    format_error_message, validate_position, validate_wire, Severity, ValidationError,
    ValidationErrorKind, ValidationResult,
};
