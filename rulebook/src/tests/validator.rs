use super::{greater, order_entity, order_program, program, set};
use crate::{IssueKind, Severity, Validator};
use serde_json::json;

fn priced(rules: serde_json::Value) -> crate::Program {
    program(json!({
        "entities": [{"name": "order", "fields": [
            {"name": "total", "type": "number", "unit": "USD"},
            {"name": "shipping", "type": "number", "unit": "EUR"},
            {"name": "discountPercent", "type": "number"}
        ]}],
        "rules": rules
    }))
}

fn always() -> serde_json::Value {
    json!({"exists": {"fact": "order.total"}})
}

fn compare(lhs: serde_json::Value, operator: &str, rhs: serde_json::Value) -> serde_json::Value {
    json!({"compare": {"lhs": lhs, "operator": operator, "rhs": rhs}})
}

#[test]
fn test_clean_program_is_valid() {
    let program = order_program(json!([
        {"id": "discount", "when": greater("order.total", 100),
         "then": [set("order.discountPercent", json!(10))]}
    ]));
    let report = Validator::new().validate(&program);
    assert!(report.is_valid(), "{}", report.summary());
    assert!(report.warnings.is_empty());
}

#[test]
fn test_unknown_paths_are_reference_errors() {
    let program = order_program(json!([
        {"id": "r", "when": greater("customer.age", 18),
         "then": [set("order.nope", json!(1)), set("total", json!(1))]}
    ]));
    let report = Validator::new().validate(&program);

    assert_eq!(report.count(IssueKind::Reference), 3);
    assert!(report.errors[0].message.contains("unknown entity 'customer'"));
    assert_eq!(report.errors[0].location, "rule 'r' when");
    assert_eq!(report.errors[1].location, "rule 'r' then[0]");
}

#[test]
fn test_type_mismatch_in_comparison() {
    let program = order_program(json!([
        {"id": "r", "when": compare(json!({"fact": "order.status"}), "equals", json!({"value": 3}))}
    ]));
    let report = Validator::new().validate(&program);
    assert!(report.has_kind(IssueKind::TypeMismatch));
    assert!(!report.is_valid());
}

#[test]
fn test_ordering_on_strings_is_rejected() {
    let program = order_program(json!([
        {"id": "r", "when": compare(json!({"fact": "order.status"}), "greater", json!({"value": "a"}))}
    ]));
    let report = Validator::new().validate(&program);
    assert_eq!(report.count(IssueKind::TypeMismatch), 1);
    assert!(report.errors[0].message.contains("compares numbers"));
}

#[test]
fn test_ordering_on_dates_is_rejected() {
    let program = order_program(json!([
        {"id": "r", "when": compare(json!({"fact": "order.placedAt"}), "greater", json!({"value": "2024-05-01"}))}
    ]));
    let report = Validator::new().validate(&program);
    assert_eq!(report.count(IssueKind::TypeMismatch), 1);
    assert!(report.errors[0].message.contains("compares numbers"));
}

#[test]
fn test_invalid_date_literal() {
    let program = order_program(json!([
        {"id": "r", "when": compare(json!({"fact": "order.placedAt"}), "equals", json!({"value": "soon"}))},
        {"id": "s", "when": compare(json!({"fact": "order.placedAt"}), "equals", json!({"value": "2024-05-01"}))}
    ]));
    let report = Validator::new().validate(&program);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].location, "rule 'r' when");
}

#[test]
fn test_unit_mismatch_rejects_program() {
    let program = priced(json!([
        {"id": "r", "when": compare(
            json!({"fact": "order.total"}), "greater", json!({"value": 100, "unit": "EUR"}))}
    ]));
    let report = Validator::new().validate(&program);
    assert!(!report.is_valid());
    assert_eq!(report.errors[0].kind, IssueKind::UnitMismatch);
    assert_eq!(report.errors[0].severity(), Severity::Error);
}

#[test]
fn test_missing_unit_is_a_warning() {
    let program = priced(json!([
        {"id": "r", "when": compare(json!({"fact": "order.total"}), "greater", json!({"value": 100}))}
    ]));
    let report = Validator::new().validate(&program);
    assert!(report.is_valid());
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, IssueKind::UnitMissing);
}

#[test]
fn test_fact_against_fact_units() {
    let program = priced(json!([
        {"id": "r", "when": compare(
            json!({"fact": "order.total"}), "greater", json!({"fact": "order.shipping"}))}
    ]));
    let report = Validator::new().validate(&program);
    assert_eq!(report.count(IssueKind::UnitMismatch), 1);
}

#[test]
fn test_fact_label_cannot_contradict_field() {
    let program = priced(json!([
        {"id": "r", "when": compare(
            json!({"fact": "order.total", "unit": "EUR"}), "greater", json!({"value": 1, "unit": "USD"}))}
    ]));
    let report = Validator::new().validate(&program);
    assert!(report.has_kind(IssueKind::UnitMismatch));
}

#[test]
fn test_action_units_and_types() {
    let program = priced(json!([
        {"id": "r", "when": always(), "then": [
            {"set": {"target": "order.total", "value": {"value": 5, "unit": "EUR"}}},
            {"set": {"target": "order.discountPercent", "value": {"value": "ten"}}},
            {"increment": {"target": "order.shipping", "by": 1, "unit": "EUR"}},
            {"increment": {"target": "order.discountPercent", "by": "one"}}
        ]}
    ]));
    let report = Validator::new().validate(&program);

    let kinds: Vec<(IssueKind, &str)> = report
        .errors
        .iter()
        .map(|i| (i.kind, i.location.as_str()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (IssueKind::UnitMismatch, "rule 'r' then[0]"),
            (IssueKind::TypeMismatch, "rule 'r' then[1]"),
            (IssueKind::TypeMismatch, "rule 'r' then[3]"),
        ]
    );
}

#[test]
fn test_increment_requires_number_field() {
    let program = order_program(json!([
        {"id": "r", "when": always(), "then": [
            {"increment": {"target": "order.status", "by": 1}}
        ]}
    ]));
    let report = Validator::new().validate(&program);
    assert!(report.errors[0].message.contains("cannot increment 'order.status'"));
}

#[test]
fn test_static_conflict_reported_once_with_both_ids() {
    let program = order_program(json!([
        {"id": "approve", "when": always(), "then": [set("order.status", json!("approved"))]},
        {"id": "deny", "when": always(), "then": [set("order.status", json!("denied"))]}
    ]));
    let report = Validator::new().validate(&program);

    assert_eq!(report.count(IssueKind::Conflict), 1);
    let conflict = &report.errors[0];
    assert!(conflict.message.contains("approve"));
    assert!(conflict.message.contains("deny"));
}

#[test]
fn test_declaration_checks() {
    let program = program(json!({
        "entities": [
            order_entity(),
            order_entity(),
            {"name": "route", "fields": []},
            {"name": "customer", "fields": [
                {"name": "tier", "type": "string"},
                {"name": "tier", "type": "string"},
                {"name": "a.b", "type": "string"}
            ]}
        ],
        "rules": [
            {"id": "r", "when": {"any": []}, "then": [{"route": {"queue": "  "}}]},
            {"id": "r", "when": always()}
        ]
    }));
    let report = Validator::new().validate(&program);

    assert_eq!(report.count(IssueKind::Duplicate), 3);
    assert_eq!(report.count(IssueKind::InvalidName), 2);
    assert_eq!(report.count(IssueKind::EmptyGroup), 1);
    assert_eq!(report.count(IssueKind::InvalidLiteral), 1);
}

#[test]
fn test_nested_condition_locations() {
    let program = order_program(json!([
        {"id": "r", "when": {"not": {"all": [greater("order.total", 1), {"exists": {"fact": "x.y"}}]}}}
    ]));
    let report = Validator::new().validate(&program);
    assert_eq!(report.errors[0].location, "rule 'r' when.not.all[1]");
}

#[test]
fn test_constraints_are_checked() {
    let program = program(json!({
        "entities": [order_entity()],
        "constraints": [{"id": "c", "assert": {"exists": {"fact": "order.weight"}}}]
    }));
    let report = Validator::new().validate(&program);
    assert_eq!(report.errors[0].location, "constraint 'c'");
}

#[test]
fn test_bad_example_payloads() {
    let program = program(json!({
        "entities": [order_entity()],
        "examples": [
            {"id": "flat", "input": {"order": 5}, "expected": {}},
            {"id": "stranger", "input": {}, "expected": {"invoice": {"total": 1}}},
            {"id": "scalar", "input": {}, "expected": 3}
        ]
    }));
    let report = Validator::new().validate(&program);
    assert_eq!(report.count(IssueKind::InvalidExample), 3);
}

#[test]
fn test_uncovered_rules_are_linted() {
    let program = program(json!({
        "entities": [order_entity()],
        "rules": [
            {"id": "discount", "when": greater("order.total", 100),
             "then": [set("order.discountPercent", json!(10))]},
            {"id": "vip", "when": {"compare": {"lhs": {"fact": "order.vip"},
                "operator": "equals", "rhs": {"value": true}}},
             "then": [set("order.status", json!("priority"))]}
        ],
        "examples": [{"id": "e1", "input": {"order": {"total": 120}},
                      "expected": {"order": {"discountPercent": 10}}}]
    }));
    let report = Validator::new().validate(&program);

    assert!(report.is_valid());
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, IssueKind::UncoveredRule);
    assert_eq!(report.warnings[0].location, "rule 'vip'");
}
