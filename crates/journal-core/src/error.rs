//! Error types for journal-core

use thiserror::Error;

/// Errors related to timestamp parsing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error("Empty timestamp")]
    Empty,

    #[error("Unrecognized timestamp format: {0}")]
    Unrecognized(String),

    #[error("Year {0} is outside 0000-9999")]
    OutOfRange(i32),
}

/// Errors related to payload encoding and decoding
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Structured payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("Unknown payload format code: {0}")]
    UnknownFormat(i64),

    #[error("Payload encoding error: {0}")]
    Encode(String),

    #[error("Payload decoding error: {0}")]
    Decode(String),
}

/// Errors related to entry validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EntryError {
    #[error("Field '{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("Field '{field}' exceeds {max} characters (got {actual})")]
    FieldTooLong {
        field: &'static str,
        max: usize,
        actual: usize,
    },

    #[error("Sent year {0} is outside 0000-9999")]
    SentOutOfRange(i32),
}
