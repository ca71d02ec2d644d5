//! Input stream parse errors.

use super::error_code::{self, StratumErrorCode};

/// Errors raised while decoding dump lines. Always fatal for the
/// enclosing upload; the line number is 1-based.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Malformed input on line {line}: {message}")]
    InvalidLine { line: usize, message: String },

    #[error("Unknown element label {label:?} on line {line}")]
    UnknownLabel { line: usize, label: String },
}

impl ParseError {
    /// The 1-based input line the error was detected on.
    pub fn line(&self) -> usize {
        match self {
            ParseError::InvalidLine { line, .. } => *line,
            ParseError::UnknownLabel { line, .. } => *line,
        }
    }
}

impl StratumErrorCode for ParseError {
    fn error_code(&self) -> &'static str {
        error_code::PARSE_ERROR
    }
}
