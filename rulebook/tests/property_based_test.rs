use proptest::prelude::*;
use rulebook::{Engine, ExecutionOptions};
use serde_json::json;

fn engine() -> Engine {
    let document = json!({
        "entities": [{"name": "order", "fields": [
            {"name": "total", "type": "number"},
            {"name": "count", "type": "number"},
            {"name": "vip", "type": "boolean"},
            {"name": "status", "type": "string"},
            {"name": "notes", "type": "string"}
        ]}],
        "rules": [
            {"id": "large", "priority": 3,
             "when": {"compare": {"lhs": {"fact": "order.total"}, "operator": "greater", "rhs": {"value": 100}}},
             "then": [
                {"set": {"target": "order.status", "value": {"value": "large"}}},
                {"append": {"target": "order.notes", "value": {"value": "large order"}}}
             ],
             "else": [{"increment": {"target": "order.count", "by": 1}}]},
            {"id": "vip", "priority": 2,
             "when": {"compare": {"lhs": {"fact": "order.vip"}, "operator": "equals", "rhs": {"value": true}}},
             "then": [
                {"route": {"queue": "vip-desk"}},
                {"emit": {"event": "vip_seen", "payload": {"total": {"fact": "order.total"}}}}
             ]},
            {"id": "counted", "priority": 1,
             "when": {"compare": {"lhs": {"fact": "order.count"}, "operator": "greaterOrEqual", "rhs": {"value": 3}}},
             "then": [{"set": {"target": "order.status", "value": {"value": "frequent"}}}]}
        ],
        "constraints": [
            {"id": "bounded-count", "severity": "warn",
             "assert": {"compare": {"lhs": {"fact": "order.count"}, "operator": "less", "rhs": {"value": 10}}}}
        ]
    });
    Engine::from_json(&document.to_string()).unwrap()
}

fn options(loop_until_settled: bool, enable_actions: bool) -> ExecutionOptions {
    ExecutionOptions {
        loop_until_settled,
        enable_actions,
        max_rule_firings: 50,
        max_passes: 20,
        ..ExecutionOptions::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        ..ProptestConfig::default()
    })]

    #[test]
    fn prop_runs_are_deterministic(
        total in -1000i64..1000,
        count in 0i64..5,
        vip in any::<bool>(),
        settle in any::<bool>(),
    ) {
        let engine = engine();
        let input = json!({"order": {"total": total, "count": count, "vip": vip}});
        let options = options(settle, true);

        let first = engine.run_with(&input, &options).unwrap();
        let second = engine.run_with(&input, &options).unwrap();

        prop_assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn prop_input_is_never_mutated(
        total in -1000i64..1000,
        count in 0i64..5,
        vip in any::<bool>(),
        settle in any::<bool>(),
        enable_actions in any::<bool>(),
    ) {
        let engine = engine();
        let input = json!({"order": {"total": total, "count": count, "vip": vip}});
        let snapshot = input.clone();

        let _ = engine.run_with(&input, &options(settle, enable_actions)).unwrap();

        prop_assert_eq!(input, snapshot);
    }

    #[test]
    fn prop_dry_run_leaves_state_equal_to_input(
        total in -1000i64..1000,
        vip in any::<bool>(),
    ) {
        let engine = engine();
        let input = json!({"order": {"total": total, "vip": vip}});

        let result = engine.run_with(&input, &options(true, false)).unwrap();

        prop_assert_eq!(result.state.to_json(), input);
        prop_assert_eq!(result.passes, 1);
    }

    #[test]
    fn prop_firings_never_exceed_cap(
        total in -1000i64..1000,
        count in 0i64..5,
        cap in 1usize..8,
    ) {
        let engine = engine();
        let input = json!({"order": {"total": total, "count": count, "vip": true}});
        let options = ExecutionOptions {
            max_rule_firings: cap,
            ..options(true, true)
        };

        let result = engine.run_with(&input, &options).unwrap();

        prop_assert!(result.rule_firings <= cap);
        prop_assert!(result.passes <= options.max_passes);
    }
}
