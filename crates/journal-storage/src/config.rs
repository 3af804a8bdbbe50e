//! Configuration for the message journal

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a [`MessageJournal`](crate::MessageJournal)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    /// Path to the SQLite database file
    pub db_path: PathBuf,
    /// How long to wait on a lock held by another connection
    #[serde(with = "duration_millis")]
    pub busy_timeout: Duration,
    /// Use write-ahead logging
    pub wal: bool,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("./journal-data/journal.db"),
            busy_timeout: Duration::from_secs(5),
            wal: true,
        }
    }
}

impl JournalConfig {
    /// Create a configuration for a database at `db_path`
    pub fn with_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Default::default()
        }
    }

    /// Set the busy timeout
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Enable or disable write-ahead logging
    pub fn with_wal(mut self, enabled: bool) -> Self {
        self.wal = enabled;
        self
    }
}

mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, ser};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).map_err(<S::Error as ser::Error>::custom)?;
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
