//! Error types for journal-storage
//!
//! Every failure the journal can report, grouped into three categories:
//! the store is unavailable, a write failed, or a query failed. A query that
//! matches nothing is not an error.

use thiserror::Error;

use journal_core::{EntryError, PayloadError, TimestampError};

/// Errors that can occur in journal operations
#[derive(Debug, Error)]
pub enum JournalError {
    /// The database file could not be opened or created
    #[error("database object not created: {0}")]
    Open(String),

    /// A schema migration failed; the journal was not opened
    #[error("migration failed at v{version} ({name}): {reason}")]
    Migration {
        version: i32,
        name: &'static str,
        reason: String,
    },

    /// The database was opened but does not respond
    #[error("message journal database not connected: {0}")]
    NotConnected(String),

    /// The database was written by a newer version of the journal
    #[error("schema version {current} is newer than supported version {supported}")]
    SchemaTooNew { current: i32, supported: i32 },

    /// I/O error preparing the storage location
    #[error("I/O error: {0}")]
    Io(String),

    /// The entry could not be encoded for storage
    #[error("cannot encode journal entry: {0}")]
    Encode(String),

    /// The entry could not be inserted
    #[error("insert failed: {0}")]
    Insert(String),

    /// A filter value could not be interpreted
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// The query could not be prepared or executed
    #[error("cannot query journal entries: {0}")]
    Query(String),

    /// A stored row could not be decoded
    #[error("cannot decode journal entry: {0}")]
    Decode(String),
}

/// Broad classes of journal failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Open, connect or migration failure; no handle exists
    StoreUnavailable,
    /// The entry was not recorded
    WriteFailure,
    /// The query failed; partial results are discarded
    QueryFailure,
}

impl JournalError {
    /// The category this error belongs to
    pub fn category(&self) -> ErrorCategory {
        match self {
            JournalError::Open(_)
            | JournalError::Migration { .. }
            | JournalError::NotConnected(_)
            | JournalError::SchemaTooNew { .. }
            | JournalError::Io(_) => ErrorCategory::StoreUnavailable,
            JournalError::Encode(_) | JournalError::Insert(_) => ErrorCategory::WriteFailure,
            JournalError::InvalidFilter(_) | JournalError::Query(_) | JournalError::Decode(_) => {
                ErrorCategory::QueryFailure
            }
        }
    }

    /// Create a new Query error
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Create a new Decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}

impl From<std::io::Error> for JournalError {
    fn from(err: std::io::Error) -> Self {
        JournalError::Io(err.to_string())
    }
}

impl From<EntryError> for JournalError {
    fn from(err: EntryError) -> Self {
        JournalError::Insert(err.to_string())
    }
}

impl From<TimestampError> for JournalError {
    fn from(err: TimestampError) -> Self {
        JournalError::InvalidFilter(err.to_string())
    }
}

impl From<PayloadError> for JournalError {
    fn from(err: PayloadError) -> Self {
        match err {
            PayloadError::Encode(_) | PayloadError::NotAnObject(_) => {
                JournalError::Encode(err.to_string())
            }
            PayloadError::Decode(_) | PayloadError::UnknownFormat(_) => {
                JournalError::Decode(err.to_string())
            }
        }
    }
}

/// Result type alias for journal operations
pub type JournalResult<T> = Result<T, JournalError>;
