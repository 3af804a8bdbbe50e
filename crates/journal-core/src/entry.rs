//! Journal entries

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EntryError;
use crate::payload::Payload;
use crate::time;

/// Maximum length of `message_id` and `response_to`
pub const MAX_MESSAGE_ID_LEN: usize = 36;

/// Maximum length of `worker_name`
pub const MAX_WORKER_NAME_LEN: usize = 128;

/// A stored journal entry
///
/// Entries are immutable once written. `id` is assigned by the store and
/// breaks ties between entries with the same `sent` time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Store-assigned surrogate key
    pub id: i64,
    /// Correlation identifier shared by a message and its events
    pub message_id: String,
    /// When the worker sent the message
    pub sent: DateTime<Utc>,
    /// Name of the emitting worker
    pub worker_name: String,
    /// Correlation id of the message this entry answers
    pub response_to: Option<String>,
    /// Numeric event code, resolved to a name at projection time
    pub worker_event: Option<u32>,
    /// Message text or structured data
    pub payload: Option<Payload>,
}

/// An entry waiting to be written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJournalEntry {
    pub message_id: String,
    pub sent: DateTime<Utc>,
    pub worker_name: String,
    pub response_to: Option<String>,
    pub worker_event: Option<u32>,
    pub payload: Option<Payload>,
}

impl NewJournalEntry {
    /// Create an entry with the required fields
    pub fn new(
        message_id: impl Into<String>,
        worker_name: impl Into<String>,
        sent: DateTime<Utc>,
    ) -> Self {
        Self {
            message_id: message_id.into(),
            sent,
            worker_name: worker_name.into(),
            response_to: None,
            worker_event: None,
            payload: None,
        }
    }

    /// Set the id of the message this entry answers
    pub fn with_response_to(mut self, response_to: impl Into<String>) -> Self {
        self.response_to = Some(response_to.into());
        self
    }

    /// Set the worker event code
    pub fn with_event(mut self, code: u32) -> Self {
        self.worker_event = Some(code);
        self
    }

    /// Set the payload
    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Check required fields and column bounds
    pub fn validate(&self) -> Result<(), EntryError> {
        if self.message_id.is_empty() {
            return Err(EntryError::EmptyField("message_id"));
        }
        if self.worker_name.is_empty() {
            return Err(EntryError::EmptyField("worker_name"));
        }
        check_len("message_id", &self.message_id, MAX_MESSAGE_ID_LEN)?;
        check_len("worker_name", &self.worker_name, MAX_WORKER_NAME_LEN)?;
        if let Some(response_to) = &self.response_to {
            check_len("response_to", response_to, MAX_MESSAGE_ID_LEN)?;
        }
        if !time::is_storable(&self.sent) {
            return Err(EntryError::SentOutOfRange(self.sent.year()));
        }
        Ok(())
    }
}

fn check_len(field: &'static str, value: &str, max: usize) -> Result<(), EntryError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(EntryError::FieldTooLong { field, max, actual });
    }
    Ok(())
}
