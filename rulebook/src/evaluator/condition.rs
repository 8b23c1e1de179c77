//! Condition evaluation
//!
//! A pure function of the condition tree and the fact store. Every node is
//! evaluated (no short-circuit) so the trace explains the whole tree.

use super::operations::{compare, pattern_matches, values_equal};
use crate::facts::FactStore;
use crate::{Condition, ConditionTrace, Operand, ResolvedOperand, Value};

/// Resolve an operand to its current value; `None` marks a missing fact
pub fn resolve_operand(operand: &Operand, facts: &FactStore) -> ResolvedOperand {
    match operand {
        Operand::Fact { fact, unit } => ResolvedOperand {
            source: fact.clone(),
            value: facts.lookup(fact).cloned(),
            unit: unit.clone(),
        },
        Operand::Value { value, unit } => ResolvedOperand {
            source: "literal".to_string(),
            value: Some(value.clone()),
            unit: unit.clone(),
        },
    }
}

/// Evaluate a condition, producing its trace; `trace.result()` is the verdict
pub fn evaluate_condition(condition: &Condition, facts: &FactStore) -> ConditionTrace {
    match condition {
        Condition::Compare { lhs, operator, rhs } => {
            let lhs = resolve_operand(lhs, facts);
            let rhs = resolve_operand(rhs, facts);
            let result = match (&lhs.value, &rhs.value) {
                (Some(l), Some(r)) => compare(l, *operator, r),
                _ => false,
            };
            ConditionTrace::Compare {
                lhs,
                operator: *operator,
                rhs,
                result,
            }
        }

        Condition::Exists { fact } => {
            let value = facts.lookup(fact).cloned();
            let result = matches!(&value, Some(v) if *v != Value::Null);
            ConditionTrace::Exists {
                fact: fact.clone(),
                value,
                result,
            }
        }

        Condition::MemberOf { value, options } => {
            let value = resolve_operand(value, facts);
            let options: Vec<ResolvedOperand> =
                options.iter().map(|o| resolve_operand(o, facts)).collect();
            let result = match &value.value {
                Some(v) => options
                    .iter()
                    .filter_map(|o| o.value.as_ref())
                    .any(|option| values_equal(v, option)),
                None => false,
            };
            ConditionTrace::MemberOf {
                value,
                options,
                result,
            }
        }

        Condition::Matches {
            value,
            pattern,
            case_insensitive,
        } => {
            let value = resolve_operand(value, facts);
            let (result, substring_fallback) = match &value.value {
                Some(v) if *v != Value::Null => {
                    pattern_matches(&v.as_match_text(), pattern, *case_insensitive)
                }
                _ => (false, false),
            };
            ConditionTrace::Matches {
                value,
                pattern: pattern.clone(),
                case_insensitive: *case_insensitive,
                substring_fallback,
                result,
            }
        }

        Condition::All(children) => {
            let children: Vec<ConditionTrace> = children
                .iter()
                .map(|c| evaluate_condition(c, facts))
                .collect();
            let result = children.iter().all(ConditionTrace::result);
            ConditionTrace::All { children, result }
        }

        Condition::Any(children) => {
            let children: Vec<ConditionTrace> = children
                .iter()
                .map(|c| evaluate_condition(c, facts))
                .collect();
            let result = children.iter().any(ConditionTrace::result);
            ConditionTrace::Any { children, result }
        }

        Condition::Not(child) => {
            let child = evaluate_condition(child, facts);
            let result = !child.result();
            ConditionTrace::Not {
                child: Box::new(child),
                result,
            }
        }
    }
}
