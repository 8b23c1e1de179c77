//! Post-state constraint checking

use super::condition::evaluate_condition;
use crate::facts::FactStore;
use crate::{Constraint, ConstraintFailure, ConstraintReport, Severity};

/// Evaluate every constraint against the final state, bucketing failures by severity
pub fn check_constraints(constraints: &[Constraint], facts: &FactStore) -> ConstraintReport {
    let mut report = ConstraintReport {
        checked: constraints.len(),
        ..ConstraintReport::default()
    };

    for constraint in constraints {
        let trace = evaluate_condition(&constraint.assertion, facts);
        if trace.result() {
            continue;
        }
        let failure = ConstraintFailure {
            constraint_id: constraint.id.clone(),
            description: constraint.description.clone(),
            severity: constraint.severity,
            trace,
        };
        match constraint.severity {
            Severity::Error => report.errors.push(failure),
            Severity::Warn => report.warnings.push(failure),
        }
    }

    report
}
