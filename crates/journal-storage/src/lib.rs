//! # Journal Storage
//!
//! SQLite-backed storage for the worker message journal.
//!
//! Workers exchange messages and lifecycle events; this crate records every
//! one of them in an append-only store and answers filtered queries for
//! inspection tooling.
//!
//! ## Features
//!
//! - **MessageJournal**: Open, migrate, append and query in one handle
//! - **Schema migrations**: Versioned, transactional and idempotent
//! - **Filter compiler**: Optional constraints compiled to parameterized SQL
//! - **Session scope**: Entries since this handle was opened, or everything
//! - **Projection**: Event names, truncated messages, display timestamps
//!
//! ## Example
//!
//! ```rust,ignore
//! use chrono::Utc;
//! use journal_core::{NewJournalEntry, Payload};
//! use journal_storage::{Filter, MessageJournal};
//!
//! let journal = MessageJournal::open("./journal-data/journal.db")?;
//!
//! journal.add_entry(
//!     &NewJournalEntry::new("m-1", "echo", Utc::now())
//!         .with_event(3)
//!         .with_payload(Payload::message("hello world")),
//! )?;
//!
//! // Everything ever written, messages cut to 15 characters
//! let entries = journal.get_entries(&Filter::persistent().with_truncate_length(15))?;
//! for entry in entries {
//!     println!("{} {} {}", entry.sent, entry.worker_name, entry.worker_event);
//! }
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod journal;
pub mod projection;
pub mod schema;
pub mod session;

// Re-exports
pub use config::JournalConfig;
pub use error::{ErrorCategory, JournalError, JournalResult};
pub use filter::{CompiledQuery, Filter};
pub use journal::MessageJournal;
pub use projection::{ProjectedBody, ProjectedEntry};
pub use schema::{MigrationStatus, SCHEMA_VERSION, SchemaStatus};
pub use session::SessionClock;
