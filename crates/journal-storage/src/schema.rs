//! Schema store
//!
//! Owns the journal table definition and its migrations. The schema version
//! lives in `PRAGMA user_version`; `journal_migrations` records when each
//! migration was applied.
//!
//! # Adding a migration
//!
//! 1. Append a [`Migration`] to [`MIGRATIONS`] with the next version number
//! 2. Make it idempotent (`IF NOT EXISTS`, column probes) so a retried open
//!    is safe
//! 3. Add an upgrade test starting from the previous version

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use tracing::{debug, info, instrument};

use journal_core::PayloadFormat;
use journal_core::time;

use crate::error::{JournalError, JournalResult};

/// The journal table
pub const JOURNAL_TABLE: &str = "journal";

/// A named, ordered schema migration
pub struct Migration {
    /// Schema version after this migration is applied
    pub version: i32,
    /// Stable migration name
    pub name: &'static str,
    apply: fn(&Connection) -> rusqlite::Result<()>,
}

impl std::fmt::Debug for Migration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version)
            .field("name", &self.name)
            .finish()
    }
}

/// Registry of all migrations, in version order
pub static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "create_journal",
        apply: create_journal,
    },
    Migration {
        version: 2,
        name: "index_journal_sent",
        apply: index_journal,
    },
    Migration {
        version: 3,
        name: "add_payload_format",
        apply: add_payload_format,
    },
    Migration {
        version: 4,
        name: "fold_legacy_tables",
        apply: fold_legacy_tables,
    },
    Migration {
        version: 5,
        name: "adopt_worker_data_journal",
        apply: adopt_worker_data_journal,
    },
];

/// Schema version this code writes
pub const SCHEMA_VERSION: i32 = 5;

/// Migration history table
pub const HISTORY_TABLE: &str = "journal_migrations";

const BOOKKEEPING_SQL: &str = "
    CREATE TABLE IF NOT EXISTS journal_migrations (
        version INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        applied_at TEXT NOT NULL
    );
";

fn create_journal(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS journal (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            message_id VARCHAR(36) NOT NULL,
            sent TEXT NOT NULL,
            worker_name VARCHAR(128) NOT NULL,
            response_to VARCHAR(36),
            worker_event INTEGER,
            payload TEXT
        );
        ",
    )
}

fn index_journal(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_journal_sent ON journal(sent, id);
        CREATE INDEX IF NOT EXISTS idx_journal_message_id ON journal(message_id);
        CREATE INDEX IF NOT EXISTS idx_journal_worker_name ON journal(worker_name);
        ",
    )
}

fn add_payload_format(conn: &Connection) -> rusqlite::Result<()> {
    if table_has_column(conn, JOURNAL_TABLE, "payload_format")? {
        return Ok(());
    }
    conn.execute_batch("ALTER TABLE journal ADD COLUMN payload_format INTEGER NOT NULL DEFAULT 0;")
}

/// Move rows from the historical `persistent`/`runtime` table pair into the
/// single journal table. Legacy rows carry a plain-text `worker_message`.
fn fold_legacy_tables(conn: &Connection) -> rusqlite::Result<()> {
    if table_exists(conn, "persistent")? {
        let rows = {
            let mut stmt = conn.prepare(
                "SELECT message_id, sent, worker_name, response_to, worker_event, worker_message
                 FROM persistent ORDER BY rowid",
            )?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?;
            rows.collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut insert = conn.prepare(
            "INSERT INTO journal (message_id, sent, worker_name, response_to, worker_event, payload, payload_format)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )?;
        let folded = rows.len();
        for (message_id, sent, worker_name, response_to, worker_event, message) in rows {
            let sent = time::parse_timestamp(&sent).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    1,
                    rusqlite::types::Type::Text,
                    Box::new(std::io::Error::other(e.to_string())),
                )
            })?;
            insert.execute(params![
                message_id,
                time::to_stored(&sent),
                worker_name,
                response_to.filter(|r| !r.is_empty()),
                worker_event,
                message,
                PayloadFormat::Text.code(),
            ])?;
        }
        drop(insert);
        conn.execute_batch("DROP TABLE persistent;")?;
        info!(rows = folded, "Folded legacy persistent table into journal");
    }
    conn.execute_batch("DROP TABLE IF EXISTS runtime;")
}

/// Rebuild a `journal` table written with a `worker_data` column.
///
/// That layout stores every payload as a JSON-encoded record and tracks its
/// version in a `schema_migrations(version, dirty)` table, which is dropped
/// once the rows are moved. Ids are kept so insertion order survives.
fn adopt_worker_data_journal(conn: &Connection) -> rusqlite::Result<()> {
    if !table_has_column(conn, JOURNAL_TABLE, "worker_data")? {
        return Ok(());
    }

    conn.execute_batch("ALTER TABLE journal RENAME TO journal_worker_data;")?;
    create_journal(conn)?;
    add_payload_format(conn)?;

    let rows = {
        let mut stmt = conn.prepare(
            "SELECT id, message_id, sent, worker_name, response_to, worker_event, worker_data
             FROM journal_worker_data ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
                row.get::<_, Option<i64>>(5)?,
                row.get::<_, Option<String>>(6)?,
            ))
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    let mut insert = conn.prepare(
        "INSERT INTO journal (id, message_id, sent, worker_name, response_to, worker_event, payload, payload_format)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )?;
    let adopted = rows.len();
    for (id, message_id, sent, worker_name, response_to, worker_event, data) in rows {
        let sent = time::parse_timestamp(&sent).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::other(e.to_string())),
            )
        })?;
        let (payload, format) = worker_data_payload(data);
        insert.execute(params![
            id,
            message_id,
            time::to_stored(&sent),
            worker_name,
            response_to.filter(|r| !r.is_empty()),
            worker_event,
            payload,
            format.code(),
        ])?;
    }
    drop(insert);

    conn.execute_batch("DROP TABLE journal_worker_data;")?;
    index_journal(conn)?;
    if table_has_column(conn, "schema_migrations", "dirty")? {
        conn.execute_batch("DROP TABLE schema_migrations;")?;
    }
    info!(rows = adopted, "Adopted worker_data journal table");
    Ok(())
}

/// Stored payload for a `worker_data` value
///
/// JSON objects become structured payloads and JSON `null` or an empty
/// value becomes no payload. Anything else is kept verbatim as text.
fn worker_data_payload(data: Option<String>) -> (Option<String>, PayloadFormat) {
    let Some(data) = data.filter(|d| !d.trim().is_empty()) else {
        return (None, PayloadFormat::Text);
    };
    match serde_json::from_str::<serde_json::Value>(&data) {
        Ok(serde_json::Value::Object(_)) => (Some(data), PayloadFormat::Structured),
        Ok(serde_json::Value::Null) => (None, PayloadFormat::Text),
        _ => (Some(data), PayloadFormat::Text),
    }
}

fn table_exists(conn: &Connection, table: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |_| Ok(()),
    )
    .optional()
    .map(|found| found.is_some())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> rusqlite::Result<bool> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let names = stmt.query_map([table], |row| row.get::<_, String>(0))?;
    for name in names {
        if name? == column {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Read the schema version from `PRAGMA user_version`
///
/// Returns 0 for a fresh database.
pub fn user_version(conn: &Connection) -> JournalResult<i32> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| JournalError::NotConnected(format!("cannot read schema version: {e}")))
}

/// Bring the schema up to [`SCHEMA_VERSION`]
///
/// Each pending migration runs in its own immediate transaction together
/// with its bookkeeping, so a failure leaves the database at the last fully
/// applied version and a retried open resumes from there.
#[instrument(skip_all)]
pub fn migrate(conn: &mut Connection) -> JournalResult<()> {
    let current = user_version(conn)?;
    if current > SCHEMA_VERSION {
        return Err(JournalError::SchemaTooNew {
            current,
            supported: SCHEMA_VERSION,
        });
    }
    if current == SCHEMA_VERSION {
        debug!(version = current, "Journal schema up to date");
        return Ok(());
    }

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        apply_migration(conn, migration)?;
        info!(
            version = migration.version,
            name = migration.name,
            "Applied journal schema migration"
        );
    }
    Ok(())
}

fn apply_migration(conn: &mut Connection, migration: &Migration) -> JournalResult<()> {
    let fail = |e: rusqlite::Error| JournalError::Migration {
        version: migration.version,
        name: migration.name,
        reason: e.to_string(),
    };

    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(fail)?;

    // Another connection may have migrated while we waited for the lock.
    let current: i32 = tx
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(fail)?;
    if current >= migration.version {
        return Ok(());
    }

    tx.execute_batch(BOOKKEEPING_SQL).map_err(fail)?;
    (migration.apply)(&tx).map_err(fail)?;
    tx.execute(
        "INSERT OR REPLACE INTO journal_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
        params![migration.version, migration.name, time::to_stored(&Utc::now())],
    )
    .map_err(fail)?;
    tx.pragma_update(None, "user_version", migration.version)
        .map_err(fail)?;
    tx.commit().map_err(fail)
}

/// Applied state of one migration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: i32,
    pub name: &'static str,
    /// When the migration was applied, in stored timestamp form
    pub applied_at: Option<String>,
}

impl MigrationStatus {
    pub fn applied(&self) -> bool {
        self.applied_at.is_some()
    }
}

/// Schema version report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaStatus {
    /// Version recorded in the database
    pub current_version: i32,
    /// Version this code writes
    pub target_version: i32,
    /// Every known migration with its applied state
    pub migrations: Vec<MigrationStatus>,
}

/// Report the schema version and migration history
pub fn status(conn: &Connection) -> JournalResult<SchemaStatus> {
    let current_version = user_version(conn)?;
    let has_history = table_exists(conn, HISTORY_TABLE)
        .map_err(|e| JournalError::query(e.to_string()))?;

    let mut migrations = Vec::with_capacity(MIGRATIONS.len());
    for migration in MIGRATIONS {
        let applied_at = if has_history {
            conn.query_row(
                "SELECT applied_at FROM journal_migrations WHERE version = ?1",
                [migration.version],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .map_err(|e| JournalError::query(e.to_string()))?
        } else {
            None
        };
        migrations.push(MigrationStatus {
            version: migration.version,
            name: migration.name,
            applied_at,
        });
    }

    Ok(SchemaStatus {
        current_version,
        target_version: SCHEMA_VERSION,
        migrations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_registry_is_ordered() {
        let versions: Vec<i32> = MIGRATIONS.iter().map(|m| m.version).collect();
        let expected: Vec<i32> = (1..=SCHEMA_VERSION).collect();
        assert_eq!(versions, expected);
    }

    #[test]
    fn test_fresh_migration() {
        let mut conn = fresh();
        assert_eq!(user_version(&conn).unwrap(), 0);

        migrate(&mut conn).unwrap();

        assert_eq!(user_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(table_exists(&conn, "journal").unwrap());
        assert!(table_has_column(&conn, "journal", "payload_format").unwrap());
        let status = status(&conn).unwrap();
        assert!(status.migrations.iter().all(MigrationStatus::applied));
    }

    #[test]
    fn test_migrate_twice_is_noop() {
        let mut conn = fresh();
        migrate(&mut conn).unwrap();
        let before = status(&conn).unwrap();
        migrate(&mut conn).unwrap();
        assert_eq!(status(&conn).unwrap(), before);
    }

    #[test]
    fn test_migration_bodies_are_idempotent() {
        let conn = fresh();
        for migration in MIGRATIONS {
            (migration.apply)(&conn).unwrap();
            (migration.apply)(&conn).unwrap();
        }
    }

    #[test]
    fn test_resume_from_partial_version() {
        let mut conn = fresh();
        create_journal(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO journal (message_id, sent, worker_name, payload)
             VALUES ('m-1', '2000-01-01T00:00:00.000000000Z', 'echo', 'legacy text');
             PRAGMA user_version = 1;",
        )
        .unwrap();

        migrate(&mut conn).unwrap();

        assert_eq!(user_version(&conn).unwrap(), SCHEMA_VERSION);
        let format: i64 = conn
            .query_row("SELECT payload_format FROM journal", [], |row| row.get(0))
            .unwrap();
        assert_eq!(format, PayloadFormat::Text.code());
        let status = status(&conn).unwrap();
        assert!(!status.migrations[0].applied());
        assert!(status.migrations[1].applied());
    }

    #[test]
    fn test_schema_too_new() {
        let mut conn = fresh();
        conn.execute_batch("PRAGMA user_version = 99;").unwrap();
        let err = migrate(&mut conn).unwrap_err();
        assert!(matches!(
            err,
            JournalError::SchemaTooNew {
                current: 99,
                supported: SCHEMA_VERSION
            }
        ));
    }

    #[test]
    fn test_fold_legacy_tables() {
        let mut conn = fresh();
        conn.execute_batch(
            "
            CREATE TABLE persistent (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                message_id VARCHAR(36) NOT NULL,
                sent DATETIME NOT NULL,
                worker_name VARCHAR(128) NOT NULL,
                response_to VARCHAR(36),
                worker_event INTEGER,
                worker_message TEXT
            );
            CREATE TABLE runtime AS SELECT * FROM persistent;
            INSERT INTO persistent (message_id, sent, worker_name, response_to, worker_event, worker_message)
            VALUES ('m-1', '2000-01-01 00:00:00+00:00', 'echo', '', 1, 'started up'),
                   ('m-2', '2000-01-02 00:00:00+00:00', 'echo', 'm-1', 2, 'done');
            ",
        )
        .unwrap();

        migrate(&mut conn).unwrap();

        assert!(!table_exists(&conn, "persistent").unwrap());
        assert!(!table_exists(&conn, "runtime").unwrap());
        let rows: Vec<(String, String, Option<String>, i64)> = {
            let mut stmt = conn
                .prepare("SELECT message_id, sent, response_to, payload_format FROM journal ORDER BY id")
                .unwrap();
            stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)))
                .unwrap()
                .collect::<rusqlite::Result<_>>()
                .unwrap()
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "m-1");
        assert_eq!(rows[0].1, "2000-01-01T00:00:00.000000000Z");
        assert_eq!(rows[0].2, None);
        assert_eq!(rows[1].2.as_deref(), Some("m-1"));
        assert_eq!(rows[1].3, PayloadFormat::Text.code());
    }

    /// Layout left behind by the earlier `worker_data` journal, including
    /// its `schema_migrations(version, dirty)` tracking table
    const WORKER_DATA_LAYOUT: &str = "
        CREATE TABLE schema_migrations (version uint64, dirty bool);
        CREATE UNIQUE INDEX version_unique ON schema_migrations (version);
        INSERT INTO schema_migrations VALUES (2, 0);
        CREATE TABLE journal (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            message_id VARCHAR(36) NOT NULL,
            sent DATETIME NOT NULL,
            worker_name VARCHAR(128) NOT NULL,
            response_to VARCHAR(36),
            worker_event INTEGER,
            worker_data TEXT
        );
        INSERT INTO journal (message_id, sent, worker_name, response_to, worker_event, worker_data)
        VALUES ('m-1', '2023-06-01 10:00:00.5+00:00', 'echo', '', 1, '{\"message\":\"working on it\"}'),
               ('m-2', '2023-06-01 10:00:01+00:00', 'echo', 'm-1', 2, 'null'),
               ('m-3', '2023-06-01 10:00:02+00:00', 'echo', NULL, NULL, NULL);
    ";

    #[test]
    fn test_adopt_worker_data_journal() {
        let mut conn = fresh();
        conn.execute_batch(WORKER_DATA_LAYOUT).unwrap();

        migrate(&mut conn).unwrap();

        assert_eq!(user_version(&conn).unwrap(), SCHEMA_VERSION);
        assert!(!table_exists(&conn, "schema_migrations").unwrap());
        assert!(!table_exists(&conn, "journal_worker_data").unwrap());
        assert!(!table_has_column(&conn, JOURNAL_TABLE, "worker_data").unwrap());
        assert!(table_has_column(&conn, JOURNAL_TABLE, "payload").unwrap());

        let rows: Vec<(i64, String, Option<String>, Option<String>, i64)> = {
            let mut stmt = conn
                .prepare("SELECT id, sent, response_to, payload, payload_format FROM journal ORDER BY id")
                .unwrap();
            stmt.query_map([], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
            })
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap()
        };
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].0, 1);
        assert_eq!(rows[0].1, "2023-06-01T10:00:00.500000000Z");
        assert_eq!(rows[0].2, None);
        assert_eq!(rows[0].3.as_deref(), Some(r#"{"message":"working on it"}"#));
        assert_eq!(rows[0].4, PayloadFormat::Structured.code());
        assert_eq!(rows[1].2.as_deref(), Some("m-1"));
        assert_eq!(rows[1].3, None);
        assert_eq!(rows[2].3, None);

        let status = status(&conn).unwrap();
        assert!(status.migrations.iter().all(MigrationStatus::applied));
    }

    #[test]
    fn test_history_table_is_separate_from_foreign_tracking() {
        let mut conn = fresh();
        conn.execute_batch("CREATE TABLE schema_migrations (version uint64, dirty bool);")
            .unwrap();

        migrate(&mut conn).unwrap();

        assert!(table_exists(&conn, HISTORY_TABLE).unwrap());
        // Only dropped when a worker_data journal was adopted with it
        assert!(table_exists(&conn, "schema_migrations").unwrap());
    }

    #[test]
    fn test_failed_migration_rolls_back() {
        let mut conn = fresh();
        conn.execute_batch(
            "CREATE TABLE persistent (message_id TEXT, sent TEXT, worker_name TEXT,
                                      response_to TEXT, worker_event INTEGER, worker_message TEXT);
             INSERT INTO persistent VALUES ('m-1', 'not a time', 'echo', NULL, NULL, 'x');",
        )
        .unwrap();

        let err = migrate(&mut conn).unwrap_err();
        assert!(matches!(
            err,
            JournalError::Migration {
                version: 4,
                name: "fold_legacy_tables",
                ..
            }
        ));
        assert_eq!(user_version(&conn).unwrap(), 3);
        assert!(table_exists(&conn, "persistent").unwrap());
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM journal", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
