//! Smoke tests of the compiled `netsec` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;

fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("netsec").unwrap();
    cmd.env_remove("NETSEC_LOG");
    cmd
}

#[test]
fn no_args_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn help_lists_subcommands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("train"))
        .stdout(predicate::str::contains("predict"));
}

#[test]
fn predict_requires_input() {
    cmd().args(["--log-stderr", "predict"]).assert().failure();
}

#[test]
fn predict_nonexistent_input_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(dir.path())
        .args(["--log-stderr", "predict", "--input", "/nonexistent/batch.csv"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Prediction failed"));
}

#[test]
fn train_json_source_without_input_exits_with_one() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .current_dir(dir.path())
        .args(["--log-stderr", "train", "--source", "json"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--input is required"));
}

#[test]
fn train_from_records_prints_the_final_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let records: Vec<serde_json::Value> = (0..60)
        .map(|r: i64| {
            let a = r % 3 - 1;
            let b = (r / 3) % 3 - 1;
            json!({"a": a, "b": b, "Result": if a >= 0 { 1 } else { -1 }})
        })
        .collect();
    std::fs::write(dir.path().join("records.json"), serde_json::to_string(&records).unwrap())
        .unwrap();
    std::fs::write(
        dir.path().join("schema.yaml"),
        "columns:\n  - a: int64\n  - b: int64\n  - Result: int64\n",
    )
    .unwrap();
    let settings = json!({
        "schema_file": "schema.yaml",
        "search_spaces": [{"family": "decision_tree", "criterion": ["gini"]}],
        "tracker": {"kind": "none"}
    });
    std::fs::write(dir.path().join("settings.json"), settings.to_string()).unwrap();

    cmd()
        .current_dir(dir.path())
        .args([
            "train",
            "settings.json",
            "--input",
            "records.json",
            "--seed",
            "5",
            "--artifact-dir",
            "runs",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"test_metric_artifact\""))
        .stderr(predicate::str::contains("Logging to"));

    assert!(dir.path().join("final_model/model.bin").exists());
    assert!(dir.path().join("final_model/preprocessor.bin").exists());
    assert_eq!(std::fs::read_dir(dir.path().join("logs")).unwrap().count(), 1);
    assert_eq!(std::fs::read_dir(dir.path().join("runs")).unwrap().count(), 1);
}
