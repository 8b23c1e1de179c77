use crate::{write_file, DISCOUNT_PROGRAM};
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_cli_check_valid_program() {
    let temp_dir = TempDir::new().unwrap();
    let program = write_file(temp_dir.path(), "discounts.rulebook.json", DISCOUNT_PROGRAM);

    let mut cmd = Command::cargo_bin("rulebook").unwrap();
    cmd.arg("check").arg(&program);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("is valid (2 rule(s), 0 warning(s))"));
}

#[test]
fn test_cli_check_reports_type_mismatch() {
    let temp_dir = TempDir::new().unwrap();
    let document = DISCOUNT_PROGRAM.replace(
        r#""value": {"value": 10}"#,
        r#""value": {"value": "ten"}"#,
    );
    let program = write_file(temp_dir.path(), "typed.rulebook.json", &document);

    let mut cmd = Command::cargo_bin("rulebook").unwrap();
    cmd.arg("check").arg(&program);

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("type mismatch"))
        .stdout(predicate::str::contains("rule 'discount-high-value' then[0]"))
        .stderr(predicate::str::contains("1 validation error(s)"));
}

#[test]
fn test_cli_check_json_report() {
    let temp_dir = TempDir::new().unwrap();
    let program = write_file(temp_dir.path(), "discounts.rulebook.json", DISCOUNT_PROGRAM);

    let output = Command::cargo_bin("rulebook")
        .unwrap()
        .arg("check")
        .arg(&program)
        .arg("--json")
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["errors"], serde_json::json!([]));
    assert_eq!(report["warnings"], serde_json::json!([]));
}

#[test]
fn test_cli_check_missing_file() {
    let mut cmd = Command::cargo_bin("rulebook").unwrap();
    cmd.arg("check").arg("does-not-exist.rulebook.json");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read program"));
}
