use crate::facts::{FactStore, RouteAssignment};
use crate::{ActionKind, ComparisonOperator, Severity, Value};
use serde::Serialize;
use std::collections::BTreeMap;

/// An operand after resolution against the fact store
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedOperand {
    /// The fact path, or `literal`
    pub source: String,
    /// `None` when the referenced fact is missing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl ResolvedOperand {
    pub fn is_missing(&self) -> bool {
        self.value.is_none()
    }
}

/// Explanation of one condition node, mirroring the condition tree
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionTrace {
    Compare {
        lhs: ResolvedOperand,
        operator: ComparisonOperator,
        rhs: ResolvedOperand,
        result: bool,
    },
    Exists {
        fact: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
        result: bool,
    },
    MemberOf {
        value: ResolvedOperand,
        options: Vec<ResolvedOperand>,
        result: bool,
    },
    Matches {
        value: ResolvedOperand,
        pattern: String,
        #[serde(rename = "caseInsensitive")]
        case_insensitive: bool,
        /// The pattern did not compile and was matched as a plain substring
        #[serde(rename = "substringFallback")]
        substring_fallback: bool,
        result: bool,
    },
    All {
        children: Vec<ConditionTrace>,
        result: bool,
    },
    Any {
        children: Vec<ConditionTrace>,
        result: bool,
    },
    Not {
        child: Box<ConditionTrace>,
        result: bool,
    },
}

impl ConditionTrace {
    pub fn result(&self) -> bool {
        match self {
            ConditionTrace::Compare { result, .. }
            | ConditionTrace::Exists { result, .. }
            | ConditionTrace::MemberOf { result, .. }
            | ConditionTrace::Matches { result, .. }
            | ConditionTrace::All { result, .. }
            | ConditionTrace::Any { result, .. }
            | ConditionTrace::Not { result, .. } => *result,
        }
    }
}

/// A before/after record of one state write
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "slot", rename_all = "snake_case")]
pub enum StateDiff {
    Fact {
        path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        before: Option<Value>,
        after: Value,
    },
    Route {
        #[serde(skip_serializing_if = "Option::is_none")]
        before: Option<RouteAssignment>,
        after: RouteAssignment,
    },
}

impl StateDiff {
    /// True when the write changed the stored value
    pub fn is_mutation(&self) -> bool {
        match self {
            StateDiff::Fact { before, after, .. } => before.as_ref() != Some(after),
            StateDiff::Route { before, after } => before.as_ref() != Some(after),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            StateDiff::Fact { path, .. } => path,
            StateDiff::Route { .. } => crate::catalog::ROUTE_SLOT,
        }
    }
}

/// An event produced by an `emit` action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmittedEvent {
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub payload: BTreeMap<String, Value>,
}

/// Outcome of interpreting one action
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionTrace {
    pub index: usize,
    pub kind: ActionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// False when the action was rejected at runtime
    pub applied: bool,
    /// True when the write was only simulated
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conflict: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<String>,
}

/// Log entry for one applied action, in execution order
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLog {
    pub rule_id: String,
    pub action_index: usize,
    pub kind: ActionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<StateDiff>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<EmittedEvent>,
    pub dry_run: bool,
}

/// Which action list a rule evaluation fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Branch {
    Then,
    Else,
    /// Nothing fired because an earlier rule stopped the pass
    Skipped,
}

/// Everything that happened while evaluating one rule in one pass
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTrace {
    pub rule_id: String,
    pub rule_name: String,
    pub pass: usize,
    pub priority: i64,
    pub matched: bool,
    pub branch: Branch,
    pub condition: ConditionTrace,
    pub actions: Vec<ActionTrace>,
    pub diffs: Vec<StateDiff>,
    /// This rule ended the pass
    pub stopped: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,
}

impl RuleTrace {
    /// True when the rule matched and its actions ran
    pub fn fired(&self) -> bool {
        self.matched && self.branch == Branch::Then
    }

    pub fn skipped(&self) -> bool {
        self.branch == Branch::Skipped
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintFailure {
    pub constraint_id: String,
    pub description: String,
    pub severity: Severity,
    pub trace: ConditionTrace,
}

/// Post-state constraint results bucketed by severity
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintReport {
    pub checked: usize,
    pub errors: Vec<ConstraintFailure>,
    pub warnings: Vec<ConstraintFailure>,
}

impl ConstraintReport {
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Result of replaying one declared example
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleOutcome {
    pub example_id: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mismatches: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub constraint_errors: Vec<String>,
    /// Input did not decode; the example never ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub outcomes: Vec<ExampleOutcome>,
}

impl ExampleReport {
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// How many examples make a rule fire
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageEntry {
    pub rule_id: String,
    pub matched_in_examples: usize,
    pub total_examples: usize,
    pub coverage_percent: f64,
}

impl CoverageEntry {
    pub fn is_uncovered(&self) -> bool {
        self.matched_in_examples == 0
    }
}

/// Aggregate result of one execution
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub state: FactStore,
    pub logs: Vec<ActionLog>,
    pub traces: Vec<RuleTrace>,
    pub constraints: ConstraintReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub examples: Option<ExampleReport>,
    pub success: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub conflicts: Vec<String>,
    /// Runtime action issues (rejected writes, missing units)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub rule_firings: usize,
    pub passes: usize,
    pub hit_rule_limit: bool,
    pub hit_pass_limit: bool,
}

impl ExecutionResult {
    /// False when evaluation stopped at a bound rather than settling
    pub fn is_complete(&self) -> bool {
        !self.hit_rule_limit && !self.hit_pass_limit
    }

    /// The trace for a rule in its last evaluated pass
    pub fn trace_for(&self, rule_id: &str) -> Option<&RuleTrace> {
        self.traces.iter().rev().find(|t| t.rule_id == rule_id)
    }
}
