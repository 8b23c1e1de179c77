//! Semantic validation
//!
//! Runs after decoding and before any execution. Every finding is collected
//! into a [`ValidationReport`]; nothing here short-circuits, so a single pass
//! reports every problem in the program.

use crate::catalog::{EntityCatalog, ROUTE_SLOT};
use crate::conflict::detect_static_conflicts;
use crate::facts::FactStore;
use crate::typecheck::{TypeCheckError, TypeChecker, UnitIssue};
use crate::{
    Action, ComparisonOperator, Condition, Field, Operand, Program, ScalarType, Severity, Value,
};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    Reference,
    TypeMismatch,
    UnitMismatch,
    UnitMissing,
    Conflict,
    Duplicate,
    InvalidName,
    EmptyGroup,
    InvalidLiteral,
    InvalidExample,
    UncoveredRule,
}

impl IssueKind {
    pub fn severity(&self) -> Severity {
        match self {
            IssueKind::UnitMissing | IssueKind::UncoveredRule => Severity::Warn,
            _ => Severity::Error,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            IssueKind::Reference => "reference",
            IssueKind::TypeMismatch => "type mismatch",
            IssueKind::UnitMismatch => "unit mismatch",
            IssueKind::UnitMissing => "unit missing",
            IssueKind::Conflict => "conflict",
            IssueKind::Duplicate => "duplicate",
            IssueKind::InvalidName => "invalid name",
            IssueKind::EmptyGroup => "empty group",
            IssueKind::InvalidLiteral => "invalid literal",
            IssueKind::InvalidExample => "invalid example",
            IssueKind::UncoveredRule => "uncovered rule",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One semantic finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub kind: IssueKind,
    /// Where in the program, e.g. `rule 'discount' then[0]`
    pub location: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(kind: IssueKind, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            location: location.into(),
            message: message.into(),
        }
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.location, self.message)
    }
}

/// Findings bucketed by severity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn push(&mut self, issue: ValidationIssue) {
        match issue.severity() {
            Severity::Error => self.errors.push(issue),
            Severity::Warn => self.warnings.push(issue),
        }
    }

    /// True when nothing prevents execution
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_kind(&self, kind: IssueKind) -> bool {
        self.errors
            .iter()
            .chain(&self.warnings)
            .any(|issue| issue.kind == kind)
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.errors
            .iter()
            .chain(&self.warnings)
            .filter(|issue| issue.kind == kind)
            .count()
    }

    /// One line per error
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|issue| format!("  - {}", issue))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Whole-program semantic validator
#[derive(Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Validate a decoded program
    pub fn validate(&self, program: &Program) -> ValidationReport {
        let mut report = ValidationReport::default();
        let catalog = EntityCatalog::new(program);
        let mut pass = Pass {
            catalog: &catalog,
            checker: TypeChecker::new(&catalog),
            report: &mut report,
        };

        // Phase 1: declarations
        pass.check_declarations(program);

        // Phase 2: rule conditions and actions
        for rule in &program.rules {
            let location = format!("rule '{}'", rule.id);
            pass.check_condition(&rule.when, &format!("{} when", location));
            for (index, action) in rule.then.iter().enumerate() {
                pass.check_action(action, &format!("{} then[{}]", location, index));
            }
            for (index, action) in rule.otherwise.iter().enumerate() {
                pass.check_action(action, &format!("{} else[{}]", location, index));
            }
        }

        // Phase 3: constraints
        for constraint in &program.constraints {
            pass.check_condition(
                &constraint.assertion,
                &format!("constraint '{}'", constraint.id),
            );
        }

        // Phase 4: same-priority literal conflicts
        for conflict in detect_static_conflicts(program) {
            pass.push(
                IssueKind::Conflict,
                format!(
                    "rules '{}' and '{}'",
                    conflict.first_rule, conflict.second_rule
                ),
                conflict.message(),
            );
        }

        // Phase 5: example payloads
        pass.check_examples(program);

        // Phase 6: coverage lint, only meaningful for a runnable program
        if report.is_valid() && !program.examples.is_empty() {
            for entry in crate::example_runner::assess_coverage(program) {
                if entry.is_uncovered() {
                    report.push(ValidationIssue::new(
                        IssueKind::UncoveredRule,
                        format!("rule '{}'", entry.rule_id),
                        format!(
                            "no example makes this rule fire ({} example(s) checked)",
                            entry.total_examples
                        ),
                    ));
                }
            }
        }

        report
    }
}

struct Pass<'a, 'r> {
    catalog: &'a EntityCatalog<'a>,
    checker: TypeChecker<'a>,
    report: &'r mut ValidationReport,
}

impl<'a> Pass<'a, '_> {
    fn push(&mut self, kind: IssueKind, location: impl Into<String>, message: impl Into<String>) {
        self.report
            .push(ValidationIssue::new(kind, location, message));
    }

    fn check_declarations(&mut self, program: &Program) {
        let mut entities = HashSet::new();
        for entity in &program.entities {
            let location = format!("entity '{}'", entity.name);
            if entity.name == ROUTE_SLOT {
                self.push(
                    IssueKind::InvalidName,
                    &location,
                    format!("'{}' is reserved for route assignments", ROUTE_SLOT),
                );
            }
            self.check_name(&entity.name, &location);
            if !entities.insert(entity.name.as_str()) {
                self.push(IssueKind::Duplicate, &location, "entity declared more than once");
            }

            let mut fields = HashSet::new();
            for field in &entity.fields {
                let field_location = format!("field '{}.{}'", entity.name, field.name);
                self.check_name(&field.name, &field_location);
                if !fields.insert(field.name.as_str()) {
                    self.push(
                        IssueKind::Duplicate,
                        field_location,
                        "field declared more than once",
                    );
                }
            }
        }

        self.check_unique_ids("rule", program.rules.iter().map(|r| r.id.as_str()));
        self.check_unique_ids(
            "constraint",
            program.constraints.iter().map(|c| c.id.as_str()),
        );
        self.check_unique_ids("example", program.examples.iter().map(|e| e.id.as_str()));
    }

    fn check_name(&mut self, name: &str, location: &str) {
        if name.is_empty() || name.contains('.') {
            self.push(
                IssueKind::InvalidName,
                location,
                "names must be non-empty and must not contain '.'",
            );
        }
    }

    fn check_unique_ids<'i>(&mut self, what: &str, ids: impl Iterator<Item = &'i str>) {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        for id in ids {
            if !seen.insert(id) && reported.insert(id) {
                self.push(
                    IssueKind::Duplicate,
                    format!("{} '{}'", what, id),
                    format!("{} id is not unique", what),
                );
            }
        }
    }

    fn check_condition(&mut self, condition: &Condition, location: &str) {
        match condition {
            Condition::Compare { lhs, operator, rhs } => {
                self.check_comparison(lhs, *operator, rhs, location)
            }
            Condition::Exists { fact } => {
                if let Err(e) = self.catalog.resolve(fact) {
                    self.push(IssueKind::Reference, location, e.to_string());
                }
            }
            Condition::MemberOf { value, options } => {
                let anchor = self.operand_type(value, None, location);
                for option in options {
                    let found = self.operand_type(option, anchor, location);
                    self.check_same_type(anchor, found, location);
                    self.check_operand_units(value, option, location);
                }
            }
            Condition::Matches { value, .. } => {
                self.operand_type(value, None, location);
            }
            Condition::All(children) => self.check_group("all", children, location),
            Condition::Any(children) => self.check_group("any", children, location),
            Condition::Not(child) => self.check_condition(child, &format!("{}.not", location)),
        }
    }

    fn check_group(&mut self, kind: &str, children: &[Condition], location: &str) {
        if children.is_empty() {
            self.push(
                IssueKind::EmptyGroup,
                location,
                format!("'{}' group has no conditions", kind),
            );
        }
        for (index, child) in children.iter().enumerate() {
            self.check_condition(child, &format!("{}.{}[{}]", location, kind, index));
        }
    }

    /// Ordering operators accept numbers only. Any other type on either side,
    /// dates included, is a `TypeMismatch` error; dates still compare for
    /// equality. At run time a non-numeric ordering evaluates to false.
    fn check_comparison(
        &mut self,
        lhs: &Operand,
        operator: ComparisonOperator,
        rhs: &Operand,
        location: &str,
    ) {
        if operator.is_membership() {
            // Sequence semantics: only references are checked
            for operand in [lhs, rhs] {
                if let Some(path) = operand.path() {
                    if let Err(e) = self.catalog.resolve(path) {
                        self.push(IssueKind::Reference, location, e.to_string());
                    }
                }
            }
            return;
        }

        // A fact operand fixes the type a literal on the other side is read as
        let anchor = [lhs, rhs]
            .into_iter()
            .find_map(|operand| operand.path())
            .and_then(|path| self.catalog.resolve(path).ok())
            .map(|field| field.scalar_type);
        let lhs_type = self.operand_type(lhs, anchor, location);
        let rhs_type = self.operand_type(rhs, anchor, location);

        if operator.is_ordering() {
            for found in [lhs_type, rhs_type].into_iter().flatten() {
                if found != ScalarType::Number {
                    self.push(
                        IssueKind::TypeMismatch,
                        location,
                        format!(
                            "'{}' compares numbers, found {}",
                            operator.name(),
                            found
                        ),
                    );
                    return;
                }
            }
        }
        self.check_same_type(lhs_type, rhs_type, location);
        self.check_operand_units(lhs, rhs, location);
    }

    fn check_same_type(
        &mut self,
        expected: Option<ScalarType>,
        found: Option<ScalarType>,
        location: &str,
    ) {
        if let (Some(expected), Some(found)) = (expected, found) {
            if expected != found {
                self.push(
                    IssueKind::TypeMismatch,
                    location,
                    format!("expected {}, found {}", expected, found),
                );
            }
        }
    }

    /// Check units between two operands, anchored on whichever is a fact
    /// with a declared unit
    fn check_operand_units(&mut self, lhs: &Operand, rhs: &Operand, location: &str) {
        for (anchor, other) in [(lhs, rhs), (rhs, lhs)] {
            let Some(path) = anchor.path() else {
                continue;
            };
            let Ok(field) = self.catalog.resolve(path) else {
                continue;
            };
            if field.unit.is_none() {
                continue;
            }
            if let Err(issue) = self.checker.check_units(other, path, field) {
                self.push_unit_issue(issue, location);
            }
            return;
        }
    }

    fn push_unit_issue(&mut self, issue: UnitIssue, location: &str) {
        let kind = if issue.is_hard() {
            IssueKind::UnitMismatch
        } else {
            IssueKind::UnitMissing
        };
        self.push(kind, location, issue.to_string());
    }

    /// Type of an operand, reporting unresolvable references and bad literals
    fn operand_type(
        &mut self,
        operand: &Operand,
        expected: Option<ScalarType>,
        location: &str,
    ) -> Option<ScalarType> {
        self.check_fact_label(operand, location);
        match self.checker.check_operand(operand, expected) {
            Ok(found) => Some(found),
            Err(e) => {
                self.push_type_error(e, location);
                None
            }
        }
    }

    /// A fact operand may restate its unit, but not contradict its field
    fn check_fact_label(&mut self, operand: &Operand, location: &str) {
        let (Some(path), Some(label)) = (operand.path(), operand.unit()) else {
            return;
        };
        let Ok(field) = self.catalog.resolve(path) else {
            return;
        };
        if let Some(declared) = &field.unit {
            if declared != label {
                self.push(
                    IssueKind::UnitMismatch,
                    location,
                    format!(
                        "'{}' is measured in {}, operand labels it {}",
                        path, declared, label
                    ),
                );
            }
        }
    }

    fn push_type_error(&mut self, error: TypeCheckError, location: &str) {
        let kind = match &error {
            TypeCheckError::Reference(_) => IssueKind::Reference,
            TypeCheckError::Mismatch { .. } | TypeCheckError::InvalidDate(_) => {
                IssueKind::TypeMismatch
            }
            TypeCheckError::InvalidLiteral(_) => IssueKind::InvalidLiteral,
        };
        self.push(kind, location, error.to_string());
    }

    fn check_action(&mut self, action: &Action, location: &str) {
        match action {
            Action::Set { target, value } | Action::Append { target, value } => {
                let Some(field) = self.resolve_target(target, location) else {
                    self.operand_type(value, None, location);
                    return;
                };
                self.check_fact_label(value, location);
                if let Err(e) = self.checker.check_agreement(value, field.scalar_type) {
                    self.push_type_error(e, location);
                }
                if let Err(issue) = self.checker.check_units(value, target, field) {
                    self.push_unit_issue(issue, location);
                }
            }

            Action::Increment { target, by, unit } => {
                if !matches!(by, Value::Number(_)) {
                    self.push(
                        IssueKind::TypeMismatch,
                        location,
                        format!("increment delta must be a number, found {}", by.kind_name()),
                    );
                }
                let Some(field) = self.resolve_target(target, location) else {
                    return;
                };
                if field.scalar_type != ScalarType::Number {
                    self.push(
                        IssueKind::TypeMismatch,
                        location,
                        format!(
                            "cannot increment '{}': field is {}, not number",
                            target, field.scalar_type
                        ),
                    );
                }
                let delta = Operand::Value {
                    value: by.clone(),
                    unit: unit.clone(),
                };
                if let Err(issue) = self.checker.check_units(&delta, target, field) {
                    self.push_unit_issue(issue, location);
                }
            }

            Action::Emit { payload, .. } => {
                for (key, operand) in payload {
                    self.operand_type(operand, None, &format!("{} payload '{}'", location, key));
                }
            }

            Action::Route { queue, .. } => {
                if queue.trim().is_empty() {
                    self.push(
                        IssueKind::InvalidLiteral,
                        location,
                        "route queue must not be empty",
                    );
                }
            }
        }
    }

    fn resolve_target(&mut self, target: &str, location: &str) -> Option<&'a Field> {
        match self.catalog.resolve(target) {
            Ok(field) => Some(field),
            Err(e) => {
                self.push(IssueKind::Reference, location, e.to_string());
                None
            }
        }
    }

    fn check_examples(&mut self, program: &Program) {
        for example in &program.examples {
            let location = format!("example '{}'", example.id);
            if let Err(e) = FactStore::from_json(&example.input) {
                self.push(IssueKind::InvalidExample, &location, format!("input: {}", e));
            }
            match &example.expected {
                serde_json::Value::Object(expected) => {
                    for entity in expected.keys() {
                        if entity != ROUTE_SLOT && self.catalog.entity(entity).is_none() {
                            self.push(
                                IssueKind::InvalidExample,
                                &location,
                                format!("expected output names unknown entity '{}'", entity),
                            );
                        }
                    }
                }
                other => self.push(
                    IssueKind::InvalidExample,
                    &location,
                    format!("expected output must be an object, found {}", other),
                ),
            }
        }
    }
}

