//! `wjournal`: command-line access to the worker message journal
//!
//! Opens the journal file directly and lists, appends, or reports schema
//! state. The binary in `main.rs` only parses arguments, sets up logging
//! and calls [`run`].

pub mod cli;
pub mod render;

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use tracing::debug;

use journal_core::{NewJournalEntry, Payload, time};
use journal_storage::MessageJournal;

use crate::cli::{AppendArgs, Cli, Command, ListArgs, OutputFormat};

/// Execute a parsed command, writing results to `out`
pub fn run(cli: &Cli, out: &mut impl Write) -> Result<()> {
    let journal = MessageJournal::open(&cli.db)
        .with_context(|| format!("cannot open message journal at {}", cli.db.display()))?;

    match &cli.command {
        Command::List(args) => list(&journal, args, out),
        Command::Append(args) => append(&journal, args, out),
        Command::Schema => {
            let status = journal
                .schema_status()
                .context("cannot read schema status")?;
            render::schema(out, &status)?;
            Ok(())
        }
    }
}

fn list(journal: &MessageJournal, args: &ListArgs, out: &mut impl Write) -> Result<()> {
    let entries = journal
        .get_entries(&args.filter())
        .context("cannot list message journal entries")?;
    debug!(count = entries.len(), "Listing journal entries");

    let written = match args.format {
        OutputFormat::Json => render::json(out, &entries),
        OutputFormat::Text => render::text(out, &entries),
        OutputFormat::Table => render::table(out, &entries),
    };
    written.context("cannot write journal entries")
}

fn append(journal: &MessageJournal, args: &AppendArgs, out: &mut impl Write) -> Result<()> {
    let sent = match &args.sent {
        Some(sent) => time::parse_timestamp(sent).with_context(|| format!("invalid --sent {sent:?}"))?,
        None => Utc::now(),
    };

    let mut entry = NewJournalEntry::new(&args.message_id, &args.worker, sent);
    if let Some(response_to) = &args.response_to {
        entry = entry.with_response_to(response_to);
    }
    if let Some(event) = args.event {
        entry = entry.with_event(event);
    }
    match (&args.message, &args.data) {
        (Some(message), None) => entry = entry.with_payload(Payload::text(message)),
        (None, Some(data)) => {
            let value: serde_json::Value =
                serde_json::from_str(data).context("--data is not valid JSON")?;
            let payload = Payload::from_value(value).context("--data must be a JSON object")?;
            entry = entry.with_payload(payload);
        }
        (None, None) => {}
        (Some(_), Some(_)) => bail!("--message and --data are mutually exclusive"),
    }

    journal
        .add_entry(&entry)
        .context("cannot add message journal entry")?;
    writeln!(
        out,
        "Recorded message {} from worker {}",
        args.message_id, args.worker
    )?;
    Ok(())
}
