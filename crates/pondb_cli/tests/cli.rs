//! End-to-end runs of the `pondb` binary.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn pondb(db: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_pondb"))
        .arg("--path")
        .arg(db)
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).unwrap()
}

#[test]
fn upsert_replaces_then_insert_only_fails() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("frogs");

    stdout(&pondb(
        &db,
        &[
            "upsert",
            "Frog",
            r#"{"age": 45, "species": "Green", "owner": "Jim"}"#,
            "--key",
            "X",
        ],
    ));
    stdout(&pondb(
        &db,
        &[
            "upsert",
            "Frog",
            r#"{"age": 4, "species": "Greyfrog", "owner": "L'oric"}"#,
            "--key",
            "X",
        ],
    ));

    let out = stdout(&pondb(&db, &["get", "Frog", "X", "--format", "json"]));
    let records: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(
        records,
        serde_json::json!([{"_key": "X", "age": 4, "species": "Greyfrog", "owner": "L'oric"}])
    );

    let failed = pondb(
        &db,
        &[
            "upsert",
            "Frog",
            r#"{"age": 1}"#,
            "--key",
            "X",
            "--policy",
            "insert-only",
        ],
    );
    assert!(!failed.status.success());
}

#[test]
fn query_by_count_and_delete() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("frogs");

    stdout(&pondb(
        &db,
        &["upsert", "Frog", r#"{"ponds": {"Wald": "Dark", "Heide": "Shallow"}}"#, "-k", "A"],
    ));
    stdout(&pondb(
        &db,
        &["upsert", "Frog", r#"{"ponds": {"Wald": "Dark"}}"#, "-k", "B"],
    ));

    let out = stdout(&pondb(&db, &["query", "Frog", "--count", "ponds > 1"]));
    assert_eq!(out.lines().count(), 1);
    assert!(out.starts_with("\"A\""));

    let out = stdout(&pondb(
        &db,
        &["query", "Frog", "--contains-key", "ponds:Wald", "--delete"],
    ));
    assert!(out.contains("deleted 2 records"));

    let out = stdout(&pondb(&db, &["inspect", "--collections", "--format", "json"]));
    let report: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(report["collections"], serde_json::json!([]));
}

#[test]
fn dump_wal_lists_transactions() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("frogs");
    stdout(&pondb(&db, &["upsert", "Frog", r#"{"age": 4}"#, "-k", "7"]));

    let out = stdout(&pondb(&db, &["dump-wal"]));
    let kinds: Vec<_> = out
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .collect();
    assert_eq!(kinds, ["BEGIN", "PUT", "COMMIT"]);

    stdout(&pondb(&db, &["checkpoint"]));
    let out = stdout(&pondb(&db, &["dump-wal", "--format", "json"]));
    assert!(out.lines().any(|line| line.contains("\"Checkpoint\"")));
}

#[test]
fn numeric_text_keys_use_prefix() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("frogs");

    stdout(&pondb(&db, &["upsert", "Frog", r#"{"age": 7}"#, "-k", "text:007"]));
    stdout(&pondb(&db, &["upsert", "Frog", r#"{"age": 9}"#, "-k", "007"]));

    let out = stdout(&pondb(&db, &["get", "Frog", "text:007", "--format", "json"]));
    let records: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(records, serde_json::json!([{"_key": "007", "age": 7}]));

    let out = stdout(&pondb(&db, &["get", "Frog", "7", "--format", "json"]));
    let records: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(records, serde_json::json!([{"_key": 7, "age": 9}]));
}
