//! Rule evaluation
//!
//! Fires the branch selected by a rule's condition, or records it as skipped.

use super::actions::apply_action;
use super::condition::evaluate_condition;
use super::context::ExecutionContext;
use crate::{Branch, ConditionTrace, Rule, RuleTrace};

/// Outcome of one rule within a pass
pub struct RuleOutcome {
    pub trace: RuleTrace,
    /// At least one action changed stored state
    pub mutated: bool,
}

/// Fire `then` if the evaluated condition matched, `else` otherwise.
///
/// Stop handling and firing accounting belong to the scheduler.
pub fn fire_rule(
    rule: &Rule,
    pass: usize,
    condition: ConditionTrace,
    context: &mut ExecutionContext,
) -> RuleOutcome {
    let matched = condition.result();
    let (branch, actions) = if matched {
        (Branch::Then, &rule.then)
    } else {
        (Branch::Else, &rule.otherwise)
    };

    let mut trace = RuleTrace {
        rule_id: rule.id.clone(),
        rule_name: rule.display_name().to_string(),
        pass,
        priority: rule.effective_priority(),
        matched,
        branch,
        condition,
        actions: Vec::with_capacity(actions.len()),
        diffs: Vec::new(),
        stopped: false,
        conflicts: Vec::new(),
    };

    let mut mutated = false;
    for (index, action) in actions.iter().enumerate() {
        let outcome = apply_action(action, index, rule, context);
        mutated |= outcome.mutated();
        if let Some(conflict) = &outcome.trace.conflict {
            trace.conflicts.push(conflict.clone());
        }
        if let Some(diff) = outcome.diff {
            trace.diffs.push(diff);
        }
        if let Some(log) = outcome.log {
            context.logs.push(log);
        }
        trace.actions.push(outcome.trace);
    }

    RuleOutcome { trace, mutated }
}

/// Trace for a rule passed over after an early stop.
///
/// The condition is still evaluated for explanation; nothing is applied.
pub fn skipped_rule(rule: &Rule, pass: usize, context: &ExecutionContext) -> RuleTrace {
    let condition = evaluate_condition(&rule.when, &context.facts);
    unapplied_rule(rule, pass, condition)
}

/// Trace for a rule whose condition was evaluated but whose branch never ran,
/// such as a match refused at the firing cap.
pub fn unapplied_rule(rule: &Rule, pass: usize, condition: ConditionTrace) -> RuleTrace {
    RuleTrace {
        rule_id: rule.id.clone(),
        rule_name: rule.display_name().to_string(),
        pass,
        priority: rule.effective_priority(),
        matched: condition.result(),
        branch: Branch::Skipped,
        condition,
        actions: Vec::new(),
        diffs: Vec::new(),
        stopped: false,
        conflicts: Vec::new(),
    }
}
