//! Worker event names
//!
//! Workers report state transitions as small integer codes. The journal
//! stores the code and resolves it to a symbolic name only when an entry is
//! projected for display.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Symbolic names for worker event codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerEventName {
    /// The worker started handling a message
    Begin,
    /// The worker finished handling a message
    End,
    /// The worker is still handling a message
    Working,
    /// The worker process came up
    Started,
    /// The worker process went down
    Stopped,
}

impl WorkerEventName {
    /// All known event names in code order
    pub const ALL: [WorkerEventName; 5] = [
        WorkerEventName::Begin,
        WorkerEventName::End,
        WorkerEventName::Working,
        WorkerEventName::Started,
        WorkerEventName::Stopped,
    ];

    /// Look up the event name for a numeric code
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(WorkerEventName::Begin),
            2 => Some(WorkerEventName::End),
            3 => Some(WorkerEventName::Working),
            4 => Some(WorkerEventName::Started),
            5 => Some(WorkerEventName::Stopped),
            _ => None,
        }
    }

    /// The numeric code for this event
    pub fn code(self) -> u32 {
        match self {
            WorkerEventName::Begin => 1,
            WorkerEventName::End => 2,
            WorkerEventName::Working => 3,
            WorkerEventName::Started => 4,
            WorkerEventName::Stopped => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkerEventName::Begin => "BEGIN",
            WorkerEventName::End => "END",
            WorkerEventName::Working => "WORKING",
            WorkerEventName::Started => "STARTED",
            WorkerEventName::Stopped => "STOPPED",
        }
    }
}

impl fmt::Display for WorkerEventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves a numeric event code to its symbolic name
///
/// The journal treats this as an external lookup: it never stores names,
/// only codes. Unknown codes should resolve to an empty string.
pub trait EventNameResolver: Send + Sync {
    fn resolve(&self, code: u32) -> String;
}

/// Default resolver backed by [`WorkerEventName`]
#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerEventNames;

impl EventNameResolver for WorkerEventNames {
    fn resolve(&self, code: u32) -> String {
        WorkerEventName::from_code(code)
            .map(|name| name.as_str().to_string())
            .unwrap_or_default()
    }
}

impl<F> EventNameResolver for F
where
    F: Fn(u32) -> String + Send + Sync,
{
    fn resolve(&self, code: u32) -> String {
        self(code)
    }
}
