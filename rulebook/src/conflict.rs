//! Write-conflict detection
//!
//! Both checks are advisory. The dynamic tracker flags a second writer to the
//! same path within one execution (last write wins); the static check flags
//! same-priority rules that set one path to different literals.

use crate::{Action, Operand, Program, Rule, Value};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq)]
struct WriteRecord {
    rule_id: String,
    action_index: usize,
}

/// Per-execution map from written path to its most recent writer
#[derive(Debug, Default)]
pub struct ConflictTracker {
    writes: BTreeMap<String, WriteRecord>,
}

impl ConflictTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a write and return a warning if a different action wrote the
    /// same path earlier in this execution.
    ///
    /// The same action writing again in a later pass is not a conflict.
    pub fn record(&mut self, path: &str, rule_id: &str, action_index: usize) -> Option<String> {
        let current = WriteRecord {
            rule_id: rule_id.to_string(),
            action_index,
        };
        let previous = self.writes.insert(path.to_string(), current.clone())?;
        if previous == current {
            return None;
        }

        Some(if previous.rule_id == rule_id {
            format!(
                "conflicting writes to '{}': rule '{}' action {} overrides its own action {}",
                path, rule_id, action_index, previous.action_index
            )
        } else {
            format!(
                "conflicting writes to '{}': rule '{}' overrides rule '{}'",
                path, rule_id, previous.rule_id
            )
        })
    }
}

/// A pair of same-priority rules that set one path to different literals
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticConflict {
    pub first_rule: String,
    pub second_rule: String,
    pub priority: i64,
    pub path: String,
    pub first_value: Value,
    pub second_value: Value,
}

impl StaticConflict {
    pub fn message(&self) -> String {
        format!(
            "rules '{}' and '{}' (priority {}) set '{}' to different values ({} vs {})",
            self.first_rule,
            self.second_rule,
            self.priority,
            self.path,
            self.first_value.quoted(),
            self.second_value.quoted()
        )
    }
}

/// Every literal `set` of a rule, grouped by target, across both branches
fn literal_sets(rule: &Rule) -> BTreeMap<&str, Vec<&Value>> {
    let mut sets: BTreeMap<&str, Vec<&Value>> = BTreeMap::new();
    for action in rule.then.iter().chain(&rule.otherwise) {
        if let Action::Set {
            target,
            value: Operand::Value { value, .. },
        } = action
        {
            let values = sets.entry(target.as_str()).or_default();
            if !values.contains(&value) {
                values.push(value);
            }
        }
    }
    sets
}

/// The first pair of literals, one from each rule, that disagree
fn first_disagreement<'v>(
    first: &[&'v Value],
    second: &[&'v Value],
) -> Option<(&'v Value, &'v Value)> {
    first.iter().find_map(|a| {
        second
            .iter()
            .find(|b| a != *b)
            .map(|b| (*a, *b))
    })
}

/// Find every unordered pair of same-priority rules with irreconcilable sets.
///
/// Each (pair, path) is reported once, rules ordered by id.
pub fn detect_static_conflicts(program: &Program) -> Vec<StaticConflict> {
    let mut rules: Vec<&Rule> = program.rules.iter().collect();
    rules.sort_by(|a, b| a.id.cmp(&b.id));

    let sets: Vec<BTreeMap<&str, Vec<&Value>>> = rules.iter().map(|r| literal_sets(r)).collect();
    let mut seen = BTreeSet::new();
    let mut conflicts = Vec::new();

    for i in 0..rules.len() {
        for j in (i + 1)..rules.len() {
            let (first, second) = (rules[i], rules[j]);
            if first.effective_priority() != second.effective_priority() {
                continue;
            }
            for (path, first_values) in &sets[i] {
                let Some(second_values) = sets[j].get(path) else {
                    continue;
                };
                let Some((first_value, second_value)) =
                    first_disagreement(first_values, second_values)
                else {
                    continue;
                };
                if !seen.insert((first.id.as_str(), second.id.as_str(), *path)) {
                    continue;
                }
                conflicts.push(StaticConflict {
                    first_rule: first.id.clone(),
                    second_rule: second.id.clone(),
                    priority: first.effective_priority(),
                    path: path.to_string(),
                    first_value: first_value.clone(),
                    second_value: second_value.clone(),
                });
            }
        }
    }

    conflicts
}
