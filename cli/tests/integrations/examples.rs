use crate::{write_file, DISCOUNT_PROGRAM};
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_cli_test_single_file() {
    let temp_dir = TempDir::new().unwrap();
    let program = write_file(temp_dir.path(), "discounts.rulebook.json", DISCOUNT_PROGRAM);

    let mut cmd = Command::cargo_bin("rulebook").unwrap();
    cmd.arg("test").arg(&program);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("big-order ... ok"))
        .stdout(predicate::str::contains("1 file(s), 1 example(s), 1 passed, 0 failed"));
}

#[test]
fn test_cli_test_directory_reports_failures() {
    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), "a.rulebook.json", DISCOUNT_PROGRAM);
    let nested = temp_dir.path().join("nested");
    std::fs::create_dir(&nested).unwrap();
    write_file(
        &nested,
        "b.rulebook.json",
        &DISCOUNT_PROGRAM.replace(r#""discountPercent": 10, "status""#, r#""discountPercent": 15, "status""#),
    );
    write_file(temp_dir.path(), "notes.json", "{}");

    let mut cmd = Command::cargo_bin("rulebook").unwrap();
    cmd.arg("test").arg(temp_dir.path());

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("big-order ... FAILED"))
        .stdout(predicate::str::contains("order.discountPercent: expected 15, found 10"))
        .stdout(predicate::str::contains("2 file(s), 2 example(s), 1 passed, 1 failed"))
        .stderr(predicate::str::contains("1 example(s) failed"));
}

#[test]
fn test_cli_test_empty_directory() {
    let temp_dir = TempDir::new().unwrap();

    let mut cmd = Command::cargo_bin("rulebook").unwrap();
    cmd.arg("test").arg(temp_dir.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("No .rulebook.json files"));
}
