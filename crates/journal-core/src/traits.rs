//! Core traits
//!
//! - [`Clock`]: Time abstraction for testability

use chrono::{DateTime, Utc};

/// Source of wall-clock time
pub trait Clock: Send + Sync {
    /// Get the current UTC datetime
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Real clock implementation using system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that always reports the same instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}
