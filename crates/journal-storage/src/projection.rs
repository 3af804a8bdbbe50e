//! Entry projection
//!
//! Turns a stored [`JournalEntry`] into the shape handed to inspection
//! tooling: event codes resolved to names, message text truncated, and the
//! timestamp rendered as fixed text.

use std::collections::BTreeMap;

use serde::Serialize;

use journal_core::time;
use journal_core::{EventNameResolver, JournalEntry, Payload};

use crate::error::{JournalError, JournalResult};

/// Body of a projected entry
///
/// Serializes as a single `worker_message` or `worker_data` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectedBody {
    /// Plain-text payload (legacy shape), or no payload at all
    WorkerMessage(String),
    /// Structured payload, re-encoded as JSON
    WorkerData(String),
}

impl ProjectedBody {
    /// Record key for this body
    pub fn key(&self) -> &'static str {
        match self {
            ProjectedBody::WorkerMessage(_) => "worker_message",
            ProjectedBody::WorkerData(_) => "worker_data",
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ProjectedBody::WorkerMessage(text) | ProjectedBody::WorkerData(text) => text,
        }
    }
}

/// A journal entry shaped for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectedEntry {
    pub message_id: String,
    pub sent: String,
    pub worker_name: String,
    pub response_to: String,
    pub worker_event: String,
    #[serde(flatten)]
    pub body: ProjectedBody,
}

impl ProjectedEntry {
    /// The human-readable message, if the entry carries one
    ///
    /// For structured payloads this is the (possibly truncated) `message`
    /// field.
    pub fn message(&self) -> Option<String> {
        match &self.body {
            ProjectedBody::WorkerMessage(text) if !text.is_empty() => Some(text.clone()),
            ProjectedBody::WorkerMessage(_) => None,
            ProjectedBody::WorkerData(encoded) => serde_json::from_str::<serde_json::Value>(encoded)
                .ok()
                .and_then(|value| value.get(journal_core::MESSAGE_FIELD)?.as_str().map(String::from)),
        }
    }

    /// The entry as a string-keyed record with fixed keys
    pub fn to_record(&self) -> BTreeMap<String, String> {
        let mut record = BTreeMap::new();
        record.insert("message_id".to_string(), self.message_id.clone());
        record.insert("sent".to_string(), self.sent.clone());
        record.insert("worker_name".to_string(), self.worker_name.clone());
        record.insert("response_to".to_string(), self.response_to.clone());
        record.insert("worker_event".to_string(), self.worker_event.clone());
        record.insert(self.body.key().to_string(), self.body.as_str().to_string());
        record
    }
}

/// Project a stored entry
///
/// `truncate_length` of 0 leaves message text untouched.
pub fn project(
    entry: &JournalEntry,
    truncate_length: usize,
    resolver: &dyn EventNameResolver,
) -> JournalResult<ProjectedEntry> {
    let body = match entry.payload.as_ref().map(|p| p.truncated(truncate_length)) {
        None => ProjectedBody::WorkerMessage(String::new()),
        Some(Payload::Text(text)) => ProjectedBody::WorkerMessage(text),
        Some(structured @ Payload::Structured(_)) => {
            let encoded = structured.encode().map_err(|e| {
                JournalError::decode(format!(
                    "cannot re-encode worker data for entry {}: {e}",
                    entry.id
                ))
            })?;
            ProjectedBody::WorkerData(encoded)
        }
    };

    Ok(ProjectedEntry {
        message_id: entry.message_id.clone(),
        sent: time::display(&entry.sent),
        worker_name: entry.worker_name.clone(),
        response_to: entry.response_to.clone().unwrap_or_default(),
        worker_event: entry
            .worker_event
            .map(|code| resolver.resolve(code))
            .unwrap_or_default(),
        body,
    })
}
