//! Output renderers for `wjournal list`

use std::io::{self, Write};

use journal_storage::{ProjectedEntry, SchemaStatus};

/// Stand-in for empty fields in text output
const EMPTY_FIELD: &str = "...";

/// Spaces between table columns
const COLUMN_GAP: usize = 2;

const TABLE_HEADERS: [&str; 7] = [
    "MESSAGE #",
    "MESSAGE ID",
    "SENT",
    "WORKER NAME",
    "RESPONSE TO",
    "WORKER EVENT",
    "WORKER MESSAGE",
];

/// JSON array of string-keyed records
pub fn json(out: &mut impl Write, entries: &[ProjectedEntry]) -> io::Result<()> {
    let records: Vec<_> = entries.iter().map(ProjectedEntry::to_record).collect();
    serde_json::to_writer(&mut *out, &records)?;
    writeln!(out)
}

/// One line per entry, fields separated by ` : `
///
/// Structured payloads show only their message.
pub fn text(out: &mut impl Write, entries: &[ProjectedEntry]) -> io::Result<()> {
    for entry in entries {
        writeln!(
            out,
            "{} : {} : {} : {} : {} : {}",
            entry.message_id,
            entry.sent,
            entry.worker_name,
            or_placeholder(&entry.response_to),
            or_placeholder(&entry.worker_event),
            entry.message().as_deref().unwrap_or(EMPTY_FIELD),
        )?;
    }
    Ok(())
}

/// Aligned columns with a header row
pub fn table(out: &mut impl Write, entries: &[ProjectedEntry]) -> io::Result<()> {
    let rows: Vec<[String; 7]> = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            [
                index.to_string(),
                entry.message_id.clone(),
                entry.sent.clone(),
                entry.worker_name.clone(),
                entry.response_to.clone(),
                entry.worker_event.clone(),
                entry.body.as_str().to_string(),
            ]
        })
        .collect();

    let mut widths = TABLE_HEADERS.map(|h| h.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    write_row(out, &widths, TABLE_HEADERS.iter().copied())?;
    for row in &rows {
        write_row(out, &widths, row.iter().map(String::as_str))?;
    }
    Ok(())
}

/// Schema version and migration list
pub fn schema(out: &mut impl Write, status: &SchemaStatus) -> io::Result<()> {
    writeln!(
        out,
        "schema version {} (target {})",
        status.current_version, status.target_version
    )?;
    for migration in &status.migrations {
        match &migration.applied_at {
            Some(at) => writeln!(out, "  {:>3}  {:<24}  applied {at}", migration.version, migration.name)?,
            None => writeln!(out, "  {:>3}  {:<24}  pending", migration.version, migration.name)?,
        }
    }
    Ok(())
}

fn or_placeholder(value: &str) -> &str {
    if value.is_empty() { EMPTY_FIELD } else { value }
}

fn write_row<'a>(
    out: &mut impl Write,
    widths: &[usize; 7],
    cells: impl Iterator<Item = &'a str>,
) -> io::Result<()> {
    let mut line = String::new();
    for (column, cell) in cells.enumerate() {
        line.push_str(cell);
        if column + 1 < widths.len() {
            let pad = widths[column] - cell.chars().count() + COLUMN_GAP;
            line.extend(std::iter::repeat_n(' ', pad));
        }
    }
    writeln!(out, "{line}")
}
