//! # Journal Core
//!
//! Core types for the worker message journal.
//!
//! This crate holds the data model shared by the storage engine and the
//! inspection tooling. It has no storage dependencies of its own.
//!
//! ## Key Types
//!
//! - [`JournalEntry`]: A stored, immutable record of a worker message or event
//! - [`NewJournalEntry`]: An entry that has not been written yet
//! - [`Payload`]: Legacy plain text or a structured key/value record
//! - [`WorkerEventName`]: Symbolic names for worker event codes
//!
//! ## Key Traits
//!
//! - [`EventNameResolver`]: Maps a numeric event code to its symbolic name
//! - [`Clock`]: Time abstraction for testability

pub mod entry;
pub mod error;
pub mod event;
pub mod payload;
pub mod time;
pub mod traits;

// Re-export main types
pub use entry::*;
pub use error::*;
pub use event::*;
pub use payload::*;
pub use traits::*;
