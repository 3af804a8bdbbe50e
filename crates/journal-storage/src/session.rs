//! Session clock
//!
//! A journal handle remembers when it was opened. Session-scoped queries
//! only see entries sent at or after that watermark, which gives "this
//! session only" visibility without a second table.

use chrono::{DateTime, Utc};

use journal_core::Clock;
use journal_core::time;

/// The open time of a journal handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClock {
    opened_at: DateTime<Utc>,
}

impl SessionClock {
    /// Start a session now, according to `clock`
    pub fn start(clock: &dyn Clock) -> Self {
        Self {
            opened_at: clock.now_utc(),
        }
    }

    /// When the session started
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    /// The watermark in stored timestamp form
    pub fn watermark(&self) -> String {
        time::to_stored(&self.opened_at)
    }
}
