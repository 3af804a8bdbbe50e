use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use journal_storage::Filter;

/// Default database location when neither `--db` nor `WJOURNAL_DB` is set
pub const DEFAULT_DB_PATH: &str = "./journal-data/journal.db";

#[derive(Debug, Parser)]
#[command(name = "wjournal", version, about = "Inspect and append to the worker message journal")]
pub struct Cli {
    /// Path to the journal database
    #[arg(long, global = true, env = "WJOURNAL_DB", default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List journal entries
    List(ListArgs),
    /// Append one entry
    Append(AppendArgs),
    /// Show the schema version and applied migrations
    Schema,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
    Table,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Include entries from earlier sessions
    ///
    /// A new invocation opens a new session, so without this flag only
    /// entries sent after the command started are shown.
    #[arg(long)]
    pub persistent: bool,

    /// Truncate worker messages to this many characters (0 disables)
    #[arg(long, default_value_t = 15)]
    pub truncate_message: usize,

    /// Only entries with this message id
    #[arg(long)]
    pub message_id: Option<String>,

    /// Only entries from this worker
    #[arg(long)]
    pub worker: Option<String>,

    /// Only entries sent at or after this time
    #[arg(long)]
    pub since: Option<String>,

    /// Only entries sent at or before this time
    #[arg(long)]
    pub until: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

impl ListArgs {
    pub fn filter(&self) -> Filter {
        Filter {
            persistent: self.persistent,
            truncate_length: self.truncate_message,
            message_id: self.message_id.clone(),
            worker: self.worker.clone(),
            since: self.since.clone(),
            until: self.until.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct AppendArgs {
    /// Message id (at most 36 characters)
    #[arg(long)]
    pub message_id: String,

    /// Worker name (at most 128 characters)
    #[arg(long)]
    pub worker: String,

    /// Id of the message this entry answers
    #[arg(long)]
    pub response_to: Option<String>,

    /// Worker event code
    #[arg(long)]
    pub event: Option<u32>,

    /// Plain-text message
    #[arg(long, conflicts_with = "data")]
    pub message: Option<String>,

    /// Structured payload as a JSON object
    #[arg(long)]
    pub data: Option<String>,

    /// Send time (defaults to now)
    #[arg(long)]
    pub sent: Option<String>,
}
