//! End-to-end tests for `wjournal` commands against a temporary database

use clap::Parser;
use journal_cli::cli::Cli;
use tempfile::TempDir;

fn run(dir: &TempDir, args: &[&str]) -> anyhow::Result<String> {
    let db = dir.path().join("journal.db");
    let db = db.to_str().unwrap();
    let mut argv = vec!["wjournal", "--db", db];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv)?;

    let mut out = Vec::new();
    journal_cli::run(&cli, &mut out)?;
    Ok(String::from_utf8(out)?)
}

#[test]
fn test_append_then_list_json() {
    let dir = TempDir::new().unwrap();

    run(
        &dir,
        &[
            "append",
            "--message-id",
            "m-1",
            "--worker",
            "echo",
            "--event",
            "3",
            "--data",
            r#"{"message":"hello world","code":7}"#,
            "--sent",
            "2024-01-01T00:00:00Z",
        ],
    )
    .unwrap();
    run(
        &dir,
        &[
            "append",
            "--message-id",
            "m-2",
            "--worker",
            "echo",
            "--response-to",
            "m-1",
            "--message",
            "plain text reply",
            "--sent",
            "2024-01-01 00:00:05",
        ],
    )
    .unwrap();

    let output = run(
        &dir,
        &["list", "--persistent", "--truncate-message", "5", "--format", "json"],
    )
    .unwrap();
    let value: serde_json::Value = serde_json::from_str(&output).unwrap();
    let records = value.as_array().unwrap();
    assert_eq!(records.len(), 2);

    assert_eq!(records[0]["message_id"], "m-1");
    assert_eq!(records[0]["worker_event"], "WORKING");
    let data: serde_json::Value =
        serde_json::from_str(records[0]["worker_data"].as_str().unwrap()).unwrap();
    assert_eq!(data["message"], "hello...");
    assert_eq!(data["code"], 7);

    assert_eq!(records[1]["response_to"], "m-1");
    assert_eq!(records[1]["worker_message"], "plain...");
    assert_eq!(records[1]["sent"], "2024-01-01 00:00:05 UTC");
}

#[test]
fn test_list_without_persistent_hides_earlier_entries() {
    let dir = TempDir::new().unwrap();
    run(
        &dir,
        &[
            "append",
            "--message-id",
            "old",
            "--worker",
            "echo",
            "--sent",
            "2001-01-01",
        ],
    )
    .unwrap();

    let output = run(&dir, &["list", "--format", "json"]).unwrap();
    assert_eq!(output.trim(), "[]");

    let output = run(&dir, &["list", "--persistent", "--format", "text"]).unwrap();
    assert_eq!(
        output.trim_end(),
        "old : 2001-01-01 00:00:00 UTC : echo : ... : ... : ..."
    );
}

#[test]
fn test_list_filters_by_worker() {
    let dir = TempDir::new().unwrap();
    for (id, worker) in [("a", "w1"), ("b", "w2")] {
        run(
            &dir,
            &["append", "--message-id", id, "--worker", worker, "--sent", "2024-01-01"],
        )
        .unwrap();
    }

    let output = run(&dir, &["list", "--persistent", "--worker", "w2", "--format", "table"]).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("MESSAGE #"));
    assert!(lines[1].contains("w2"));
}

#[test]
fn test_append_rejects_non_object_data() {
    let dir = TempDir::new().unwrap();
    let err = run(
        &dir,
        &["append", "--message-id", "m-1", "--worker", "echo", "--data", "[1,2]"],
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("--data must be a JSON object"));
}

#[test]
fn test_list_rejects_bad_since() {
    let dir = TempDir::new().unwrap();
    let err = run(&dir, &["list", "--persistent", "--since", "someday"]).unwrap_err();
    assert!(format!("{err:#}").contains("cannot list message journal entries"));
}

#[test]
fn test_schema_reports_applied_migrations() {
    let dir = TempDir::new().unwrap();
    let output = run(&dir, &["schema"]).unwrap();
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines[0], "schema version 5 (target 5)");
    assert!(lines[1..].iter().all(|l| l.contains("applied")));
    assert!(output.contains("create_journal"));
    assert!(output.contains("fold_legacy_tables"));
    assert!(output.contains("adopt_worker_data_journal"));
}
