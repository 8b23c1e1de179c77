use crate::{write_file, DISCOUNT_PROGRAM};
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_cli_coverage_full() {
    let temp_dir = TempDir::new().unwrap();
    let program = write_file(temp_dir.path(), "discounts.rulebook.json", DISCOUNT_PROGRAM);

    let mut cmd = Command::cargo_bin("rulebook").unwrap();
    cmd.arg("coverage").arg(&program);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("discount-high-value"))
        .stdout(predicate::str::contains("100.00%"))
        .stdout(predicate::str::contains("uncovered").not());
}

#[test]
fn test_cli_coverage_lists_uncovered_rules() {
    let temp_dir = TempDir::new().unwrap();
    let document = DISCOUNT_PROGRAM
        .replace(r#""total": 120}}"#, r#""total": 80}}"#)
        .replace(r#""discountPercent": 10, "status""#, r#""status""#);
    let program = write_file(temp_dir.path(), "partial.rulebook.json", &document);

    let mut cmd = Command::cargo_bin("rulebook").unwrap();
    cmd.arg("coverage").arg(&program);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("0/1"))
        .stdout(predicate::str::contains("uncovered: discount-high-value"));
}
