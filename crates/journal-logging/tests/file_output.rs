//! End-to-end check of JSONL file output
//!
//! Installing a global subscriber can only happen once per process, so this
//! file holds a single test.

use journal_logging::{FileConfig, JournalSubscriberBuilder, RotationStrategy};
use tempfile::TempDir;

#[test]
fn test_events_land_in_jsonl_file() {
    let dir = TempDir::new().unwrap();
    let guard = JournalSubscriberBuilder::new()
        .with_console(false)
        .with_level("debug")
        .with_file_output(FileConfig {
            directory: dir.path().to_path_buf(),
            prefix: "journal-test".to_string(),
            rotation: RotationStrategy::Never,
            max_files: None,
        })
        .try_init()
        .expect("Failed to install subscriber");

    {
        let span = tracing::info_span!("add_entry", message_id = "m-1");
        let _entered = span.enter();
        tracing::debug!(id = 7, "New message journal entry added");
    }
    tracing::warn!(reason = "disk full", "Cannot insert journal entry");

    // Dropping the guard flushes the non-blocking writer
    drop(guard);

    let contents = std::fs::read_to_string(dir.path().join("journal-test.log")).unwrap();
    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).expect("Log line is not JSON"))
        .collect();
    assert_eq!(lines.len(), 2);

    assert_eq!(lines[0]["level"], "DEBUG");
    assert_eq!(lines[0]["message"], "New message journal entry added");
    assert_eq!(lines[0]["id"], 7);
    assert_eq!(lines[0]["span"]["message_id"], "m-1");

    assert_eq!(lines[1]["level"], "WARN");
    assert_eq!(lines[1]["reason"], "disk full");

    // A second global install is refused
    assert!(JournalSubscriberBuilder::new().try_init().is_err());
}
