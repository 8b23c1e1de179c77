use super::{greater, order_program, set};
use crate::{Engine, ExecutionOptions, IssueKind, RulebookError, Value};
use serde_json::json;

fn discount_engine() -> Engine {
    Engine::new(order_program(json!([
        {"id": "discount", "when": greater("order.total", 100),
         "then": [set("order.discountPercent", json!(10))]}
    ])))
    .unwrap()
}

#[test]
fn test_run_json_payload() {
    let engine = discount_engine();
    let result = engine.run(&json!({"order": {"total": 120}})).unwrap();

    assert!(result.success);
    assert_eq!(
        result.state.lookup("order.discountPercent"),
        Some(&Value::from(10))
    );
    assert!(result.trace_for("discount").unwrap().matched);
}

#[test]
fn test_invalid_program_is_refused() {
    let err = Engine::new(order_program(json!([
        {"id": "r", "when": greater("order.weight", 1)}
    ])))
    .err()
    .unwrap();

    match err {
        RulebookError::InvalidProgram(report) => {
            assert_eq!(report.errors[0].kind, IssueKind::Reference)
        }
        other => panic!("expected InvalidProgram, got {:?}", other),
    }
}

#[test]
fn test_structural_errors_from_json() {
    let err = Engine::from_json(r#"{"rules": [{"id": "r"}]}"#).err().unwrap();
    assert!(matches!(err, RulebookError::Structural(_)));

    let err = Engine::from_json("not json").err().unwrap();
    assert!(matches!(err, RulebookError::Structural(_)));
}

#[test]
fn test_invalid_facts_and_options() {
    let engine = discount_engine();
    assert!(matches!(
        engine.run(&json!("order")),
        Err(RulebookError::InvalidFacts(_))
    ));

    let zero = ExecutionOptions {
        max_rule_firings: 0,
        ..ExecutionOptions::default()
    };
    assert!(matches!(
        engine.run_with(&json!({}), &zero),
        Err(RulebookError::InvalidOptions(_))
    ));
    assert!(discount_engine().with_options(zero).is_err());
}

#[test]
fn test_warnings_are_retained() {
    let engine = Engine::new(
        serde_json::from_value(json!({
            "entities": [{"name": "invoice", "fields": [
                {"name": "amount", "type": "number", "unit": "USD"}
            ]}],
            "rules": [{"id": "big", "when": greater("invoice.amount", 1000)}]
        }))
        .unwrap(),
    )
    .unwrap();

    assert_eq!(engine.validation().warnings.len(), 1);
    assert!(engine.validation().has_kind(IssueKind::UnitMissing));
}

#[test]
fn test_examples_through_engine() {
    let mut program = order_program(json!([
        {"id": "discount", "when": greater("order.total", 100),
         "then": [set("order.discountPercent", json!(10))]}
    ]));
    program.examples = vec![serde_json::from_value(json!({
        "id": "e1",
        "input": {"order": {"total": 120}},
        "expected": {"order": {"discountPercent": 10}}
    }))
    .unwrap()];
    let engine = Engine::new(program).unwrap();

    assert!(engine.run_example("e1").unwrap().passed);
    assert!(matches!(
        engine.run_example("e2"),
        Err(RulebookError::UnknownExample(_))
    ));
    assert!(engine.run_examples().all_passed());
    assert_eq!(engine.assess_coverage()[0].coverage_percent, 100.0);
}

#[test]
fn test_engine_options_are_used_by_default() {
    let engine = Engine::new(order_program(json!([
        {"id": "tick", "when": {"exists": {"fact": "order.count"}},
         "then": [{"increment": {"target": "order.count", "by": 1}}]}
    ])))
    .unwrap()
    .with_options(ExecutionOptions {
        loop_until_settled: true,
        max_rule_firings: 3,
        ..ExecutionOptions::default()
    })
    .unwrap();

    let result = engine.run(&json!({"order": {"count": 0}})).unwrap();
    assert!(result.hit_rule_limit);
    assert_eq!(result.rule_firings, 3);
}
