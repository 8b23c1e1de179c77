//! Action interpretation
//!
//! Applies one action to the context's fact store, or simulates it when
//! actions are disabled. Every write is type- and unit-checked against the
//! target field again here: the validator only sees literals, while a copy
//! between fields carries whatever the payload held.

use super::condition::resolve_operand;
use super::context::ExecutionContext;
use crate::catalog::{FactPath, ROUTE_SLOT};
use crate::facts::RouteAssignment;
use crate::typecheck::{check_value, TypeChecker};
use crate::{
    Action, ActionLog, ActionTrace, EmittedEvent, Field, Operand, Rule, StateDiff, Value,
};
use std::collections::BTreeMap;
use tracing::warn;

/// What one action produced
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub trace: ActionTrace,
    pub diff: Option<StateDiff>,
    pub log: Option<ActionLog>,
}

impl ActionOutcome {
    /// True when the action changed stored state
    pub fn mutated(&self) -> bool {
        !self.trace.dry_run && self.diff.as_ref().is_some_and(StateDiff::is_mutation)
    }
}

/// Apply `action`, the `index`-th action of the branch `rule` fired
pub fn apply_action(
    action: &Action,
    index: usize,
    rule: &Rule,
    context: &mut ExecutionContext,
) -> ActionOutcome {
    let dry_run = !context.options.enable_actions;
    let mut trace = ActionTrace {
        index,
        kind: action.kind(),
        target: match action {
            Action::Route { .. } => Some(ROUTE_SLOT.to_string()),
            other => other.target().map(str::to_string),
        },
        applied: false,
        dry_run,
        conflict: None,
        issue: None,
    };

    let result = match action {
        Action::Set { target, value } => {
            prepare_write(target, context, |field, _before, context| {
                let new_value = resolve_source(value, context)?;
                check_value(&new_value, field)
                    .map_err(|e| format!("cannot set '{}': {}", target, e))?;
                Ok(new_value)
            })
            .and_then(|(path, before, after)| {
                check_write_units(value, target, context, rule, index)?;
                Ok(write_fact(path, before, after, context))
            })
        }

        Action::Increment { target, by, unit } => {
            let delta_operand = Operand::Value {
                value: by.clone(),
                unit: unit.clone(),
            };
            prepare_write(target, context, |field, before, _context| {
                let delta = by
                    .as_number()
                    .ok_or_else(|| format!("increment delta {} is not a number", by.quoted()))?;
                let base = before.and_then(Value::as_number);
                let after = match base {
                    Some(base) => base
                        .checked_add(delta)
                        .ok_or_else(|| format!("incrementing '{}' overflowed", target))?,
                    // Nothing numeric to add to: the delta initialises the field
                    None => delta,
                };
                let after = Value::Number(after);
                check_value(&after, field)
                    .map_err(|e| format!("cannot increment '{}': {}", target, e))?;
                Ok(after)
            })
            .and_then(|(path, before, after)| {
                check_write_units(&delta_operand, target, context, rule, index)?;
                Ok(write_fact(path, before, after, context))
            })
        }

        Action::Append { target, value } => {
            prepare_write(target, context, |field, before, context| {
                let item = resolve_source(value, context)?;
                check_value(&item, field)
                    .map_err(|e| format!("cannot append to '{}': {}", target, e))?;
                let mut items = match before {
                    Some(Value::List(items)) => items.clone(),
                    _ => Vec::new(),
                };
                items.push(item);
                Ok(Value::List(items))
            })
            .and_then(|(path, before, after)| {
                check_write_units(value, target, context, rule, index)?;
                Ok(write_fact(path, before, after, context))
            })
        }

        Action::Route { queue, reason } => {
            let after = RouteAssignment {
                queue: queue.clone(),
                reason: reason.clone(),
            };
            let before = context.facts.route().cloned();
            if context.options.enable_actions {
                context.facts.set_route(after.clone());
            }
            Ok(StateDiff::Route { before, after })
        }

        Action::Emit { event, payload } => {
            let payload: BTreeMap<String, Value> = payload
                .iter()
                .map(|(key, operand)| {
                    let value = resolve_operand(operand, &context.facts)
                        .value
                        .unwrap_or(Value::Null);
                    (key.clone(), value)
                })
                .collect();

            trace.applied = true;
            return ActionOutcome {
                log: Some(ActionLog {
                    rule_id: rule.id.clone(),
                    action_index: index,
                    kind: action.kind(),
                    diff: None,
                    event: Some(EmittedEvent {
                        name: event.clone(),
                        payload,
                    }),
                    dry_run,
                }),
                trace,
                diff: None,
            };
        }
    };

    match result {
        Ok(diff) => {
            if let Some(conflict) = context.tracker.record(diff.path(), &rule.id, index) {
                warn!(rule = %rule.id, action = index, "{}", conflict);
                context.conflicts.push(conflict.clone());
                trace.conflict = Some(conflict);
            }
            trace.applied = true;
            ActionOutcome {
                log: Some(ActionLog {
                    rule_id: rule.id.clone(),
                    action_index: index,
                    kind: action.kind(),
                    diff: Some(diff.clone()),
                    event: None,
                    dry_run,
                }),
                trace,
                diff: Some(diff),
            }
        }
        Err(issue) => {
            warn!(rule = %rule.id, action = index, "action rejected: {}", issue);
            context
                .warnings
                .push(format!("rule '{}' action {}: {}", rule.id, index, issue));
            trace.issue = Some(issue);
            ActionOutcome {
                trace,
                diff: None,
                log: None,
            }
        }
    }
}

/// Resolve the target field and compute the value to write
fn prepare_write<F>(
    target: &str,
    context: &ExecutionContext,
    compute: F,
) -> Result<(FactPath, Option<Value>, Value), String>
where
    F: FnOnce(&Field, Option<&Value>, &ExecutionContext) -> Result<Value, String>,
{
    let path = FactPath::parse(target).map_err(|e| e.to_string())?;
    let field = context
        .catalog
        .resolve_path(&path)
        .map_err(|e| e.to_string())?;
    let before = context.facts.get(&path);
    let after = compute(field, before, context)?;
    Ok((path, before.cloned(), after))
}

/// Read the value a `set` or `append` copies
fn resolve_source(operand: &Operand, context: &ExecutionContext) -> Result<Value, String> {
    resolve_operand(operand, &context.facts)
        .value
        .ok_or_else(|| format!("source fact '{}' is missing", operand))
}

/// Unit mismatches reject the write; a missing unit is only a warning
fn check_write_units(
    operand: &Operand,
    target: &str,
    context: &mut ExecutionContext,
    rule: &Rule,
    index: usize,
) -> Result<(), String> {
    let Ok(field) = context.catalog.resolve(target) else {
        return Ok(());
    };
    let checker = TypeChecker::new(&context.catalog);
    match checker.check_units(operand, target, field) {
        Ok(()) => Ok(()),
        Err(issue) if issue.is_hard() => Err(issue.to_string()),
        Err(issue) => {
            context
                .warnings
                .push(format!("rule '{}' action {}: {}", rule.id, index, issue));
            Ok(())
        }
    }
}

fn write_fact(
    path: FactPath,
    before: Option<Value>,
    after: Value,
    context: &mut ExecutionContext,
) -> StateDiff {
    if context.options.enable_actions {
        context.facts.set(&path, after.clone());
    }
    StateDiff::Fact {
        path: path.to_string(),
        before,
        after,
    }
}
