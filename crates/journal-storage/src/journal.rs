//! The message journal handle
//!
//! [`MessageJournal`] ties the pieces together: it opens and migrates the
//! store, appends entries, and runs filtered queries through the projector.
//! The handle is `Send + Sync`; share it as `Arc<MessageJournal>`.

use std::fmt;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{Connection, Row, params, params_from_iter};
use tracing::{debug, info, instrument, warn};

use journal_core::time;
use journal_core::{
    Clock, EventNameResolver, JournalEntry, NewJournalEntry, Payload, PayloadFormat, SystemClock,
    WorkerEventNames,
};

use crate::config::JournalConfig;
use crate::error::{JournalError, JournalResult};
use crate::filter::{self, CompiledQuery, Filter};
use crate::projection::{self, ProjectedEntry};
use crate::schema::{self, SchemaStatus};
use crate::session::SessionClock;

/// A journal entry row as read from SQLite, before decoding
struct StoredRow {
    id: i64,
    message_id: String,
    sent: String,
    worker_name: String,
    response_to: Option<String>,
    worker_event: Option<i64>,
    payload: Option<String>,
    payload_format: i64,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            message_id: row.get(1)?,
            sent: row.get(2)?,
            worker_name: row.get(3)?,
            response_to: row.get(4)?,
            worker_event: row.get(5)?,
            payload: row.get(6)?,
            payload_format: row.get(7)?,
        })
    }

    fn decode(self) -> JournalResult<JournalEntry> {
        let sent = time::from_stored(&self.sent)
            .map_err(|e| JournalError::decode(format!("entry {}: {e}", self.id)))?;
        let worker_event = self
            .worker_event
            .map(u32::try_from)
            .transpose()
            .map_err(|e| JournalError::decode(format!("entry {}: worker_event: {e}", self.id)))?;
        let payload = match self.payload {
            Some(stored) => {
                let format = PayloadFormat::from_code(self.payload_format)?;
                Some(Payload::decode(format, &stored)?)
            }
            None => None,
        };

        Ok(JournalEntry {
            id: self.id,
            message_id: self.message_id,
            sent,
            worker_name: self.worker_name,
            response_to: self.response_to,
            worker_event,
            payload,
        })
    }
}

/// Embedded, append-only journal of worker messages and events
pub struct MessageJournal {
    conn: Mutex<Connection>,
    session: SessionClock,
    config: JournalConfig,
    resolver: Box<dyn EventNameResolver>,
}

impl fmt::Debug for MessageJournal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageJournal")
            .field("db_path", &self.config.db_path)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl MessageJournal {
    /// Open or create the journal at `path`
    pub fn open(path: impl AsRef<Path>) -> JournalResult<Self> {
        Self::open_with_config(JournalConfig::with_path(path.as_ref()))
    }

    /// Open or create the journal described by `config`
    pub fn open_with_config(config: JournalConfig) -> JournalResult<Self> {
        Self::open_with_clock(config, &SystemClock)
    }

    /// Open the journal, taking the session watermark from `clock`
    #[instrument(skip(config, clock), fields(path = %config.db_path.display()))]
    pub fn open_with_clock(config: JournalConfig, clock: &dyn Clock) -> JournalResult<Self> {
        if let Some(parent) = config.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&config.db_path).map_err(|e| {
            warn!(error = %e, "Cannot open journal database");
            JournalError::Open(e.to_string())
        })?;
        Self::from_connection(conn, config, clock)
    }

    /// Open a journal that lives only as long as the handle
    pub fn in_memory() -> JournalResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| JournalError::Open(e.to_string()))?;
        let config = JournalConfig::with_path(":memory:").with_wal(false);
        Self::from_connection(conn, config, &SystemClock)
    }

    fn from_connection(
        mut conn: Connection,
        config: JournalConfig,
        clock: &dyn Clock,
    ) -> JournalResult<Self> {
        conn.busy_timeout(config.busy_timeout)
            .map_err(|e| JournalError::Open(e.to_string()))?;
        if config.wal {
            let mode: String = conn
                .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
                .map_err(|e| JournalError::Open(format!("cannot enable WAL: {e}")))?;
            debug!(journal_mode = %mode, "Configured journal mode");
        }

        conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
            .map_err(|e| JournalError::NotConnected(e.to_string()))?;

        schema::migrate(&mut conn).inspect_err(|e| {
            warn!(error = %e, "Journal schema migration failed");
        })?;

        let session = SessionClock::start(clock);
        info!(opened_at = %session.watermark(), "Opened message journal");

        Ok(Self {
            conn: Mutex::new(conn),
            session,
            config,
            resolver: Box::new(WorkerEventNames),
        })
    }

    /// Use a different event name resolver for projection
    pub fn with_resolver(mut self, resolver: impl EventNameResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// The session watermark of this handle
    pub fn session(&self) -> SessionClock {
        self.session
    }

    /// The configuration this journal was opened with
    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    /// Append one entry
    ///
    /// Structured payloads are encoded before insertion. The entry is not
    /// recorded if this returns an error.
    #[instrument(skip(self, entry), fields(message_id = %entry.message_id, worker = %entry.worker_name))]
    pub fn add_entry(&self, entry: &NewJournalEntry) -> JournalResult<()> {
        entry.validate()?;
        let (payload, payload_format) = match &entry.payload {
            Some(payload) => (Some(payload.encode()?), payload.format()),
            None => (None, PayloadFormat::Text),
        };

        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO journal (message_id, sent, worker_name, response_to, worker_event, payload, payload_format)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.message_id,
                time::to_stored(&entry.sent),
                entry.worker_name,
                entry.response_to,
                entry.worker_event,
                payload,
                payload_format.code(),
            ],
        )
        .map_err(|e| {
            warn!(error = %e, "Cannot insert journal entry");
            JournalError::Insert(format!("could not insert journal entry: {e}"))
        })?;
        let id = conn.last_insert_rowid();
        drop(conn);

        debug!(id, "New message journal entry added");
        Ok(())
    }

    /// Retrieve entries matching `filter`, projected for display
    ///
    /// Entries are ordered by `sent`, then by insertion order. Zero matches
    /// is an empty vector, not an error.
    #[instrument(skip(self))]
    pub fn get_entries(&self, filter: &Filter) -> JournalResult<Vec<ProjectedEntry>> {
        let query = filter::compile(filter, self.session.opened_at())?;
        let rows = self.fetch(&query)?;

        let mut projected = Vec::with_capacity(rows.len());
        for row in rows {
            let entry = row.decode()?;
            projected.push(projection::project(
                &entry,
                filter.truncate_length,
                self.resolver.as_ref(),
            )?);
        }

        debug!(count = projected.len(), "Retrieved journal entries");
        Ok(projected)
    }

    /// Retrieve stored entries matching `filter` without projection
    pub fn read_entries(&self, filter: &Filter) -> JournalResult<Vec<JournalEntry>> {
        let query = filter::compile(filter, self.session.opened_at())?;
        self.fetch(&query)?
            .into_iter()
            .map(StoredRow::decode)
            .collect()
    }

    /// Count entries matching `filter`
    pub fn count_entries(&self, filter: &Filter) -> JournalResult<u64> {
        let query = filter::compile_count(filter, self.session.opened_at())?;
        let conn = self.conn.lock();
        let count: i64 = conn
            .query_row(&query.sql, params_from_iter(query.params.iter()), |row| {
                row.get(0)
            })
            .map_err(|e| JournalError::query(e.to_string()))?;
        u64::try_from(count).map_err(|e| JournalError::decode(e.to_string()))
    }

    /// Report the schema version and migration history
    pub fn schema_status(&self) -> JournalResult<SchemaStatus> {
        let conn = self.conn.lock();
        schema::status(&conn)
    }

    /// Run a compiled query and collect raw rows
    ///
    /// The statement and the connection lock are released before returning.
    fn fetch(&self, query: &CompiledQuery) -> JournalResult<Vec<StoredRow>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&query.sql).map_err(|e| {
            warn!(error = %e, "Cannot prepare journal query");
            JournalError::query(format!("cannot prepare query: {e}"))
        })?;
        let rows = stmt
            .query_map(params_from_iter(query.params.iter()), StoredRow::from_row)
            .map_err(|e| JournalError::query(format!("cannot execute query: {e}")))?;

        let mut result = Vec::new();
        for row in rows {
            result.push(row.map_err(|e| JournalError::decode(format!("cannot read row: {e}")))?);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn entry(message_id: &str, worker: &str, secs: i64) -> NewJournalEntry {
        NewJournalEntry::new(message_id, worker, Utc.timestamp_opt(secs, 0).unwrap())
    }

    #[test]
    fn test_in_memory_starts_empty() {
        let journal = MessageJournal::in_memory().unwrap();
        assert!(journal.get_entries(&Filter::persistent()).unwrap().is_empty());
        assert_eq!(journal.count_entries(&Filter::persistent()).unwrap(), 0);
    }

    #[test]
    fn test_add_and_read_back() {
        let journal = MessageJournal::in_memory().unwrap();
        journal
            .add_entry(
                &entry("m-1", "echo", 946_684_800)
                    .with_response_to("m-0")
                    .with_event(2)
                    .with_payload(Payload::message("done")),
            )
            .unwrap();

        let stored = journal.read_entries(&Filter::persistent()).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, 1);
        assert_eq!(stored[0].response_to.as_deref(), Some("m-0"));
        assert_eq!(stored[0].worker_event, Some(2));
        assert_eq!(stored[0].payload, Some(Payload::message("done")));

        let projected = journal.get_entries(&Filter::persistent()).unwrap();
        assert_eq!(projected[0].worker_event, "END");
        assert_eq!(projected[0].sent, "2000-01-01 00:00:00 UTC");
    }

    #[test]
    fn test_rejects_invalid_entry() {
        let journal = MessageJournal::in_memory().unwrap();
        let err = journal.add_entry(&entry("", "echo", 0)).unwrap_err();
        assert!(matches!(err, JournalError::Insert(_)));
        assert_eq!(journal.count_entries(&Filter::persistent()).unwrap(), 0);
    }

    #[test]
    fn test_with_resolver() {
        let journal = MessageJournal::in_memory()
            .unwrap()
            .with_resolver(|code: u32| format!("E{code}"));
        journal.add_entry(&entry("m-1", "echo", 0).with_event(9)).unwrap();
        let projected = journal.get_entries(&Filter::persistent()).unwrap();
        assert_eq!(projected[0].worker_event, "E9");
    }

    #[test]
    fn test_decode_rejects_unknown_format() {
        let journal = MessageJournal::in_memory().unwrap();
        journal
            .conn
            .lock()
            .execute_batch(
                "INSERT INTO journal (message_id, sent, worker_name, payload, payload_format)
                 VALUES ('m-1', '2000-01-01T00:00:00.000000000Z', 'echo', 'x', 7);",
            )
            .unwrap();
        let err = journal.get_entries(&Filter::persistent()).unwrap_err();
        assert!(matches!(err, JournalError::Decode(_)));
    }

    #[test]
    fn test_decode_rejects_corrupt_structured_payload() {
        let journal = MessageJournal::in_memory().unwrap();
        journal
            .conn
            .lock()
            .execute_batch(
                "INSERT INTO journal (message_id, sent, worker_name, payload, payload_format)
                 VALUES ('m-1', '2000-01-01T00:00:00.000000000Z', 'echo', '{not json', 1);",
            )
            .unwrap();
        let err = journal.get_entries(&Filter::persistent()).unwrap_err();
        assert!(matches!(err, JournalError::Decode(_)));
    }
}
