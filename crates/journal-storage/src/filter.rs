//! Journal filters and the predicate compiler
//!
//! A [`Filter`] is compiled into SQL text plus a separate list of bound
//! values. Filter values only ever travel as parameters; the SQL text is
//! assembled exclusively from fixed fragments in this module.

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use journal_core::time;

use crate::error::JournalResult;
use crate::schema::JOURNAL_TABLE;

/// Columns selected for every entry query, in decode order
pub(crate) const ENTRY_COLUMNS: &str =
    "id, message_id, sent, worker_name, response_to, worker_event, payload, payload_format";

/// Caller-supplied query options
///
/// `None` means "no constraint". `Some(String::new())` filters for the
/// empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Show entries from every session, not just the current one
    pub persistent: bool,
    /// Truncate message text to this many characters (0 disables)
    pub truncate_length: usize,
    /// Only entries with this message id
    pub message_id: Option<String>,
    /// Only entries from this worker
    pub worker: Option<String>,
    /// Only entries sent at or after this time
    pub since: Option<String>,
    /// Only entries sent at or before this time
    pub until: Option<String>,
}

impl Filter {
    /// A filter over the current session with no other constraints
    pub fn new() -> Self {
        Self::default()
    }

    /// A filter over every session with no other constraints
    pub fn persistent() -> Self {
        Self {
            persistent: true,
            ..Default::default()
        }
    }

    pub fn with_persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn with_truncate_length(mut self, length: usize) -> Self {
        self.truncate_length = length;
        self
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn with_worker(mut self, worker: impl Into<String>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    pub fn with_since(mut self, since: impl Into<String>) -> Self {
        self.since = Some(since.into());
        self
    }

    pub fn with_until(mut self, until: impl Into<String>) -> Self {
        self.until = Some(until.into());
        self
    }
}

/// A parameterized query ready for execution
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// SQL text with `?N` placeholders
    pub sql: String,
    /// Values bound to the placeholders, in order
    pub params: Vec<Value>,
}

/// WHERE clause and its bound values
#[derive(Debug, Default)]
struct Predicate {
    conditions: Vec<&'static str>,
    params: Vec<Value>,
}

impl Predicate {
    /// Add `<column> <op> ?N` with a bound value
    fn bind(&mut self, condition: &'static str, value: Value) {
        self.conditions.push(condition);
        self.params.push(value);
    }

    fn where_clause(&self) -> String {
        let mut clause = String::from("WHERE 1=1");
        for (index, condition) in self.conditions.iter().enumerate() {
            clause.push_str(&format!(" AND {} ?{}", condition, index + 1));
        }
        clause
    }
}

fn build_predicate(filter: &Filter, session_opened_at: DateTime<Utc>) -> JournalResult<Predicate> {
    let mut predicate = Predicate::default();

    if let Some(message_id) = &filter.message_id {
        predicate.bind("message_id =", Value::Text(message_id.clone()));
    }
    if let Some(worker) = &filter.worker {
        predicate.bind("worker_name =", Value::Text(worker.clone()));
    }
    if let Some(since) = &filter.since {
        predicate.bind("sent >=", Value::Text(time::normalize(since)?));
    }
    if let Some(until) = &filter.until {
        predicate.bind("sent <=", Value::Text(time::normalize(until)?));
    }
    if !filter.persistent {
        predicate.bind("sent >=", Value::Text(time::to_stored(&session_opened_at)));
    }

    Ok(predicate)
}

/// Compile a filter into an ordered entry query
///
/// Fails with [`JournalError::InvalidFilter`](crate::JournalError::InvalidFilter)
/// if a time bound cannot be parsed.
pub fn compile(filter: &Filter, session_opened_at: DateTime<Utc>) -> JournalResult<CompiledQuery> {
    let predicate = build_predicate(filter, session_opened_at)?;
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM {JOURNAL_TABLE} {} ORDER BY sent ASC, id ASC",
        predicate.where_clause()
    );
    Ok(CompiledQuery {
        sql,
        params: predicate.params,
    })
}

/// Compile a filter into a row count query
pub fn compile_count(
    filter: &Filter,
    session_opened_at: DateTime<Utc>,
) -> JournalResult<CompiledQuery> {
    let predicate = build_predicate(filter, session_opened_at)?;
    let sql = format!(
        "SELECT COUNT(*) FROM {JOURNAL_TABLE} {}",
        predicate.where_clause()
    );
    Ok(CompiledQuery {
        sql,
        params: predicate.params,
    })
}
