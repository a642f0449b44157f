//! Errors raised while parsing filter input and inspector payloads

use thiserror::Error;

/// Malformed user input or upstream payload
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParseError {
    #[error("Invalid time window '{0}'. Use a format like '5s', '2m' or '1h'")]
    TimeWindow(String),

    #[error("Invalid status filter '{input}': {reason}")]
    StatusFilter { input: String, reason: String },

    #[error("Invalid path pattern '{pattern}': {reason}")]
    PathPattern { pattern: String, reason: String },

    #[error("Malformed captured record: {0}")]
    Record(String),
}
