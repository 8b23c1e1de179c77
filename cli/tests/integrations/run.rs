use crate::{write_file, DISCOUNT_PROGRAM};
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn run_json(args: &[&str]) -> serde_json::Value {
    let output = Command::cargo_bin("rulebook")
        .unwrap()
        .args(args)
        .output()
        .unwrap();
    assert!(output.status.success(), "{:?}", output);
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn test_cli_run_with_fact_overrides() {
    let temp_dir = TempDir::new().unwrap();
    let program = write_file(temp_dir.path(), "discounts.rulebook.json", DISCOUNT_PROGRAM);

    let mut cmd = Command::cargo_bin("rulebook").unwrap();
    cmd.arg("run").arg(&program).arg("order.total=120");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("order.discountPercent"))
        .stdout(predicate::str::contains("discount-high-value [pass 1, priority 10] matched"))
        .stdout(predicate::str::contains("order.total (120) > 100 = true"))
        .stdout(predicate::str::contains("2 rule firing(s) in 1 pass(es)"));
}

#[test]
fn test_cli_run_with_facts_file_as_json() {
    let temp_dir = TempDir::new().unwrap();
    let program = write_file(temp_dir.path(), "discounts.rulebook.json", DISCOUNT_PROGRAM);
    let facts = write_file(temp_dir.path(), "facts.json", r#"{"order": {"total": 80}}"#);

    let result = run_json(&[
        "run",
        program.to_str().unwrap(),
        "--facts",
        facts.to_str().unwrap(),
        "--json",
    ]);

    assert_eq!(result["ruleFirings"], 1);
    assert_eq!(result["state"]["order"]["status"], "reviewed");
    assert!(result["state"]["order"].get("discountPercent").is_none());
    assert_eq!(result["traces"][0]["ruleId"], "discount-high-value");
    assert_eq!(result["traces"][0]["branch"], "else");
}

#[test]
fn test_cli_run_inline_input_with_override() {
    let temp_dir = TempDir::new().unwrap();
    let program = write_file(temp_dir.path(), "discounts.rulebook.json", DISCOUNT_PROGRAM);

    let result = run_json(&[
        "run",
        program.to_str().unwrap(),
        "--input",
        r#"{"order": {"total": 50}}"#,
        "order.total=150",
        "--json",
    ]);

    assert_eq!(result["state"]["order"]["total"], 150);
    assert_eq!(result["state"]["order"]["discountPercent"], 10);
}

#[test]
fn test_cli_run_dry_run_leaves_state_untouched() {
    let temp_dir = TempDir::new().unwrap();
    let program = write_file(temp_dir.path(), "discounts.rulebook.json", DISCOUNT_PROGRAM);

    let result = run_json(&[
        "run",
        program.to_str().unwrap(),
        "order.total=120",
        "--dry-run",
        "--json",
    ]);

    assert_eq!(result["state"], serde_json::json!({"order": {"total": 120}}));
    assert_eq!(result["ruleFirings"], 2);
    assert_eq!(result["logs"][0]["dryRun"], true);
}

#[test]
fn test_cli_run_first_match_skips_later_rules() {
    let temp_dir = TempDir::new().unwrap();
    let program = write_file(temp_dir.path(), "discounts.rulebook.json", DISCOUNT_PROGRAM);

    let result = run_json(&[
        "run",
        program.to_str().unwrap(),
        "order.total=120",
        "--mode",
        "first-match",
        "--json",
    ]);

    assert_eq!(result["ruleFirings"], 1);
    assert_eq!(result["traces"][0]["stopped"], true);
    assert_eq!(result["traces"][1]["ruleId"], "mark-reviewed");
    assert_eq!(result["traces"][1]["branch"], "skipped");
}

#[test]
fn test_cli_run_rejects_invalid_program() {
    let temp_dir = TempDir::new().unwrap();
    let program = write_file(
        temp_dir.path(),
        "broken.rulebook.json",
        &DISCOUNT_PROGRAM.replace("\"fact\": \"order.total\"}, \"operator\"", "\"fact\": \"order.totl\"}, \"operator\""),
    );

    let mut cmd = Command::cargo_bin("rulebook").unwrap();
    cmd.arg("run").arg(&program);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Program rejected"))
        .stderr(predicate::str::contains("error[reference]"));
}

#[test]
fn test_cli_run_structural_error() {
    let temp_dir = TempDir::new().unwrap();
    let program = write_file(temp_dir.path(), "bad.rulebook.json", r#"{"rules": 5}"#);

    let mut cmd = Command::cargo_bin("rulebook").unwrap();
    cmd.arg("run").arg(&program);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Structural error"));
}

#[test]
fn test_cli_run_fails_on_error_constraint() {
    let temp_dir = TempDir::new().unwrap();
    let document = DISCOUNT_PROGRAM.replace(
        "\"examples\": [",
        r#""constraints": [{
            "id": "discount-cap",
            "description": "discounts stay at or below 5%",
            "assert": {"compare": {"lhs": {"fact": "order.discountPercent"}, "operator": "lessOrEqual", "rhs": {"value": 5}}},
            "severity": "error"
          }],
          "examples": ["#,
    );
    let program = write_file(temp_dir.path(), "capped.rulebook.json", &document);

    let mut cmd = Command::cargo_bin("rulebook").unwrap();
    cmd.arg("run").arg(&program).arg("order.total=120");

    cmd.assert()
        .failure()
        .stdout(predicate::str::contains("discount-cap"))
        .stderr(predicate::str::contains("1 constraint(s) failed"));
}

#[test]
fn test_cli_run_rejects_malformed_override() {
    let temp_dir = TempDir::new().unwrap();
    let program = write_file(temp_dir.path(), "discounts.rulebook.json", DISCOUNT_PROGRAM);

    let mut cmd = Command::cargo_bin("rulebook").unwrap();
    cmd.arg("run").arg(&program).arg("total=120");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("expected entity.field"));
}

#[test]
fn test_cli_run_rejects_zero_firing_cap() {
    let temp_dir = TempDir::new().unwrap();
    let program = write_file(temp_dir.path(), "discounts.rulebook.json", DISCOUNT_PROGRAM);

    let mut cmd = Command::cargo_bin("rulebook").unwrap();
    cmd.arg("run").arg(&program).arg("--max-firings").arg("0");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("maxRuleFirings"));
}
