//! Example replay and rule coverage
//!
//! Examples run through the same evaluator as callers' inputs, always with
//! actions enabled. Expected output is matched as a deep subset of the final
//! state: every expected key must be present and equal, extra keys are ignored.

use crate::evaluator::Evaluator;
use crate::facts::FactStore;
use crate::semantic::decimal_from_json;
use crate::{
    CoverageEntry, Example, ExampleOutcome, ExampleReport, ExecutionOptions, ExecutionResult,
    Program,
};

/// Replay one example with default options
pub fn run_example(program: &Program, example: &Example) -> ExampleOutcome {
    run_example_with(program, example, &ExecutionOptions::default())
}

/// Replay one example, taking bounds and mode from `options`
pub fn run_example_with(
    program: &Program,
    example: &Example,
    options: &ExecutionOptions,
) -> ExampleOutcome {
    match execute_example(program, example, options) {
        Ok(result) => judge(example, &result),
        Err(error) => ExampleOutcome {
            example_id: example.id.clone(),
            passed: false,
            mismatches: Vec::new(),
            constraint_errors: Vec::new(),
            error: Some(error),
        },
    }
}

pub fn run_examples(program: &Program) -> ExampleReport {
    run_examples_with(program, &ExecutionOptions::default())
}

pub fn run_examples_with(program: &Program, options: &ExecutionOptions) -> ExampleReport {
    let outcomes: Vec<ExampleOutcome> = program
        .examples
        .iter()
        .map(|example| run_example_with(program, example, options))
        .collect();
    let passed = outcomes.iter().filter(|o| o.passed).count();

    ExampleReport {
        total: outcomes.len(),
        passed,
        failed: outcomes.len() - passed,
        outcomes,
    }
}

/// Count, per rule, the examples that make it fire
///
/// Rules appear in declaration order. An example whose input does not
/// decode counts towards the total but fires nothing.
pub fn assess_coverage(program: &Program) -> Vec<CoverageEntry> {
    assess_coverage_with(program, &ExecutionOptions::default())
}

pub fn assess_coverage_with(program: &Program, options: &ExecutionOptions) -> Vec<CoverageEntry> {
    let results: Vec<ExecutionResult> = program
        .examples
        .iter()
        .filter_map(|example| execute_example(program, example, options).ok())
        .collect();
    let total = program.examples.len();

    program
        .rules
        .iter()
        .map(|rule| {
            let matched = results
                .iter()
                .filter(|result| {
                    result
                        .traces
                        .iter()
                        .any(|trace| trace.rule_id == rule.id && trace.fired())
                })
                .count();
            CoverageEntry {
                rule_id: rule.id.clone(),
                matched_in_examples: matched,
                total_examples: total,
                coverage_percent: percent(matched, total),
            }
        })
        .collect()
}

fn percent(matched: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (matched as f64 / total as f64 * 10000.0).round() / 100.0
}

fn execute_example(
    program: &Program,
    example: &Example,
    options: &ExecutionOptions,
) -> Result<ExecutionResult, String> {
    let input = FactStore::from_json(&example.input).map_err(|e| e.to_string())?;
    let options = ExecutionOptions {
        enable_actions: true,
        evaluate_examples: false,
        ..options.clone()
    };
    Ok(Evaluator::new().execute(program, &input, &options))
}

fn judge(example: &Example, result: &ExecutionResult) -> ExampleOutcome {
    let mut mismatches = Vec::new();
    let actual = result.state.to_json();
    collect_mismatches(&example.expected, Some(&actual), "", &mut mismatches);

    let constraint_errors: Vec<String> = result
        .constraints
        .errors
        .iter()
        .map(|failure| {
            if failure.description.is_empty() {
                failure.constraint_id.clone()
            } else {
                format!("{}: {}", failure.constraint_id, failure.description)
            }
        })
        .collect();

    ExampleOutcome {
        example_id: example.id.clone(),
        passed: mismatches.is_empty() && constraint_errors.is_empty(),
        mismatches,
        constraint_errors,
        error: None,
    }
}

/// Walk `expected`, recording every key whose actual value differs
pub fn collect_mismatches(
    expected: &serde_json::Value,
    actual: Option<&serde_json::Value>,
    path: &str,
    mismatches: &mut Vec<String>,
) {
    match (expected, actual) {
        (serde_json::Value::Object(expected), Some(serde_json::Value::Object(actual))) => {
            for (key, value) in expected {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                collect_mismatches(value, actual.get(key), &child, mismatches);
            }
        }
        (expected, None) => {
            mismatches.push(format!("{}: expected {}, found nothing", label(path), expected))
        }
        (expected, Some(actual)) => {
            if !json_equal(expected, actual) {
                mismatches.push(format!(
                    "{}: expected {}, found {}",
                    label(path),
                    expected,
                    actual
                ));
            }
        }
    }
}

fn label(path: &str) -> &str {
    if path.is_empty() {
        "<root>"
    } else {
        path
    }
}

/// JSON equality with numbers compared as exact decimals, so `10` matches `10.0`
pub fn json_equal(expected: &serde_json::Value, actual: &serde_json::Value) -> bool {
    use serde_json::Value as Json;
    match (expected, actual) {
        (Json::Number(a), Json::Number(b)) => match (decimal_from_json(a), decimal_from_json(b)) {
            (Some(a), Some(b)) => a == b,
            _ => a == b,
        },
        (Json::Array(a), Json::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(a, b)| json_equal(a, b))
        }
        (Json::Object(a), Json::Object(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(key, value)| b.get(key).is_some_and(|other| json_equal(value, other)))
        }
        (a, b) => a == b,
    }
}
