use assert_cmd::prelude::*;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::process::Command;
use tempfile::tempdir;

#[test]
fn lessons_list_reads_custom_ledger() {
    let temp = tempdir().unwrap();
    let path = temp.path().join("ledger.json");
    std::fs::write(
        &path,
        json!({
            "version": "1.0",
            "system": "phc",
            "created": "2026-01-01T00:00:00Z",
            "last_updated": "2026-01-01T00:00:00Z",
            "max_entries": 10,
            "lessons": [{
                "id": "lesson-004",
                "date": "2026-01-01T00:00:00Z",
                "severity": "critical",
                "lesson": "Halted 'git push --force': repeated failures"
            }]
        })
        .to_string(),
    )
    .unwrap();

    Command::new(assert_cmd::cargo::cargo_bin!("phc"))
        .arg("--lessons-path")
        .arg(&path)
        .args(["lessons", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 lesson(s)"))
        .stdout(predicate::str::contains("lesson-004"))
        .stdout(predicate::str::contains("critical"));

    let output = Command::new(assert_cmd::cargo::cargo_bin!("phc"))
        .arg("--lessons-path")
        .arg(&path)
        .args(["lessons", "list", "--json"])
        .output()
        .expect("run phc");
    let ledger: Value = serde_json::from_slice(&output.stdout).expect("ledger json");
    assert_eq!(ledger["max_entries"], 10);
    assert_eq!(ledger["lessons"][0]["id"], "lesson-004");
}

#[test]
fn lessons_list_handles_missing_ledger() {
    let temp = tempdir().unwrap();
    Command::new(assert_cmd::cargo::cargo_bin!("phc"))
        .current_dir(temp.path())
        .args(["lessons", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No lessons"));
}
