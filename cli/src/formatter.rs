use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, Row, Table};
use rulebook::{
    ActionTrace, Branch, ConditionTrace, CoverageEntry, ExampleReport, ExecutionResult,
    ResolvedOperand, RuleTrace, StateDiff, ValidationIssue, ValidationReport, Value,
};

enum LineType {
    Branch,
    LastBranch,
    Action,
    Rejected,
    Diff,
}

impl LineType {
    fn format_line(&self, base_prefix: &str, content: &str) -> String {
        let symbol = match self {
            LineType::Branch => "├─",
            LineType::LastBranch => "└─",
            LineType::Action => "├─>",
            LineType::Rejected => "×",
            LineType::Diff => "└─ =",
        };
        format!("{}{} {}\n", base_prefix, symbol, content)
    }
}

pub struct Formatter {}

impl Default for Formatter {
    fn default() -> Self {
        Self::new()
    }
}

impl Formatter {
    pub fn new() -> Self {
        Self {}
    }

    pub fn format_result(&self, result: &ExecutionResult) -> String {
        let mut output = String::new();

        output.push_str(&self.format_state_table(&result.state.to_json()));
        output.push('\n');

        for trace in &result.traces {
            output.push_str(&self.format_rule_trace(trace));
            output.push('\n');
        }

        if !result.constraints.errors.is_empty() || !result.constraints.warnings.is_empty() {
            output.push_str(&self.format_constraints(result));
            output.push('\n');
        }

        for conflict in &result.conflicts {
            output.push_str(&format!("conflict: {}\n", conflict));
        }
        for warning in &result.warnings {
            output.push_str(&format!("warning: {}\n", warning));
        }

        if let Some(examples) = &result.examples {
            output.push_str(&self.format_examples("examples", examples));
        }

        output.push_str(&format!(
            "{} rule firing(s) in {} pass(es)",
            result.rule_firings, result.passes
        ));
        if result.hit_rule_limit {
            output.push_str(", stopped at the rule firing limit");
        }
        if result.hit_pass_limit {
            output.push_str(", stopped at the pass limit");
        }
        output.push('\n');
        output
    }

    fn format_state_table(&self, state: &serde_json::Value) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(Row::from(vec![
            Cell::new("Fact").set_alignment(CellAlignment::Left),
            Cell::new("Value").set_alignment(CellAlignment::Left),
        ]));

        if let serde_json::Value::Object(entities) = state {
            for (entity, fields) in entities {
                match fields {
                    serde_json::Value::Object(fields) => {
                        for (field, value) in fields {
                            table.add_row(Row::from(vec![
                                format!("{}.{}", entity, field),
                                value.to_string(),
                            ]));
                        }
                    }
                    other => {
                        table.add_row(Row::from(vec![entity.clone(), other.to_string()]));
                    }
                }
            }
        }

        table.to_string()
    }

    fn format_rule_trace(&self, trace: &RuleTrace) -> String {
        let status = match trace.branch {
            Branch::Then => "matched",
            Branch::Else => "else",
            Branch::Skipped => "skipped",
        };
        let mut title = format!(
            "{} [pass {}, priority {}] {}",
            trace.rule_id, trace.pass, trace.priority, status
        );
        if trace.stopped {
            title.push_str(", stopped pass");
        }

        let mut content = String::new();
        self.format_condition(&trace.condition, "", true, &mut content);
        for action in &trace.actions {
            self.format_action(action, &mut content);
        }
        for diff in &trace.diffs {
            content.push_str(&LineType::Diff.format_line("", &format_diff(diff)));
        }
        for conflict in &trace.conflicts {
            content.push_str(&LineType::Rejected.format_line("", conflict));
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.add_row(Row::from(vec![Cell::new(&title)]));

        let content = content.trim_end();
        if !content.is_empty() {
            table.add_row(Row::from(vec![Cell::new(content)]));
        }

        table.to_string()
    }

    fn format_condition(
        &self,
        trace: &ConditionTrace,
        indent: &str,
        last: bool,
        output: &mut String,
    ) {
        let line = if last {
            LineType::LastBranch
        } else {
            LineType::Branch
        };
        let mark = if trace.result() { "true" } else { "false" };

        match trace {
            ConditionTrace::All { children, .. } | ConditionTrace::Any { children, .. } => {
                let label = if matches!(trace, ConditionTrace::All { .. }) {
                    "all"
                } else {
                    "any"
                };
                output.push_str(&line.format_line(indent, &format!("{} = {}", label, mark)));
                let nested = child_indent(indent, last);
                for (i, child) in children.iter().enumerate() {
                    self.format_condition(child, &nested, i + 1 == children.len(), output);
                }
            }
            ConditionTrace::Not { child, .. } => {
                output.push_str(&line.format_line(indent, &format!("not = {}", mark)));
                self.format_condition(child, &child_indent(indent, last), true, output);
            }
            ConditionTrace::Compare {
                lhs, operator, rhs, ..
            } => {
                let text = format!(
                    "{} {} {} = {}",
                    format_operand(lhs),
                    operator,
                    format_operand(rhs),
                    mark
                );
                output.push_str(&line.format_line(indent, &text));
            }
            ConditionTrace::Exists { fact, value, .. } => {
                let text = match value {
                    Some(value) => format!("exists {} ({}) = {}", fact, value.quoted(), mark),
                    None => format!("exists {} = {}", fact, mark),
                };
                output.push_str(&line.format_line(indent, &text));
            }
            ConditionTrace::MemberOf { value, options, .. } => {
                let options: Vec<String> = options.iter().map(format_operand).collect();
                let text = format!(
                    "{} in [{}] = {}",
                    format_operand(value),
                    options.join(", "),
                    mark
                );
                output.push_str(&line.format_line(indent, &text));
            }
            ConditionTrace::Matches {
                value,
                pattern,
                case_insensitive,
                substring_fallback,
                ..
            } => {
                let mut text = format!("{} matches /{}/", format_operand(value), pattern);
                if *case_insensitive {
                    text.push('i');
                }
                if *substring_fallback {
                    text.push_str(" (substring)");
                }
                text.push_str(&format!(" = {}", mark));
                output.push_str(&line.format_line(indent, &text));
            }
        }
    }

    fn format_action(&self, action: &ActionTrace, output: &mut String) {
        let mut text = format!("{}[{}]", action.kind.name(), action.index);
        if let Some(target) = &action.target {
            text.push_str(&format!(" {}", target));
        }
        if action.dry_run {
            text.push_str(" (dry run)");
        }

        if action.applied {
            output.push_str(&LineType::Action.format_line("", &text));
        } else {
            output.push_str(&LineType::Rejected.format_line("", &text));
        }
        if let Some(issue) = &action.issue {
            output.push_str(&LineType::Rejected.format_line("│  ", issue));
        }
    }

    fn format_constraints(&self, result: &ExecutionResult) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(Row::from(vec!["Constraint", "Severity", "Description"]));
        for failure in result
            .constraints
            .errors
            .iter()
            .chain(&result.constraints.warnings)
        {
            table.add_row(Row::from(vec![
                failure.constraint_id.clone(),
                failure.severity.to_string(),
                failure.description.clone(),
            ]));
        }
        format!(
            "{} of {} constraint(s) failed\n{}",
            result.constraints.errors.len() + result.constraints.warnings.len(),
            result.constraints.checked,
            table
        )
    }

    /// Renders nothing for a clean report
    pub fn format_validation(&self, report: &ValidationReport) -> String {
        if report.errors.is_empty() && report.warnings.is_empty() {
            return String::new();
        }

        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(Row::from(vec!["Severity", "Kind", "Location", "Message"]));
        for issue in report.errors.iter().chain(&report.warnings) {
            table.add_row(issue_row(issue));
        }
        format!("{}\n", table)
    }

    pub fn format_examples(&self, source: &str, report: &ExampleReport) -> String {
        let mut output = format!(
            "{}: {} of {} example(s) passed\n",
            source, report.passed, report.total
        );
        for outcome in &report.outcomes {
            let mark = if outcome.passed { "ok" } else { "FAILED" };
            output.push_str(&format!("  {} ... {}\n", outcome.example_id, mark));
            if let Some(error) = &outcome.error {
                output.push_str(&LineType::Rejected.format_line("    ", error));
            }
            for mismatch in &outcome.mismatches {
                output.push_str(&LineType::Rejected.format_line("    ", mismatch));
            }
            for error in &outcome.constraint_errors {
                output.push_str(&LineType::Rejected.format_line("    ", error));
            }
        }
        output
    }

    pub fn format_coverage(&self, coverage: &[CoverageEntry]) -> String {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_header(Row::from(vec!["Rule", "Examples", "Coverage"]));
        for entry in coverage {
            table.add_row(Row::from(vec![
                Cell::new(&entry.rule_id),
                Cell::new(format!(
                    "{}/{}",
                    entry.matched_in_examples, entry.total_examples
                ))
                .set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.2}%", entry.coverage_percent))
                    .set_alignment(CellAlignment::Right),
            ]));
        }

        let uncovered: Vec<&str> = coverage
            .iter()
            .filter(|entry| entry.is_uncovered())
            .map(|entry| entry.rule_id.as_str())
            .collect();
        let mut output = format!("{}\n", table);
        if !uncovered.is_empty() {
            output.push_str(&format!("uncovered: {}\n", uncovered.join(", ")));
        }
        output
    }
}

fn issue_row(issue: &ValidationIssue) -> Row {
    Row::from(vec![
        issue.severity().to_string(),
        issue.kind.to_string(),
        issue.location.clone(),
        issue.message.clone(),
    ])
}

fn child_indent(indent: &str, last: bool) -> String {
    if last {
        format!("{}   ", indent)
    } else {
        format!("{}│  ", indent)
    }
}

fn format_operand(operand: &ResolvedOperand) -> String {
    let value = operand
        .value
        .as_ref()
        .map(Value::quoted)
        .unwrap_or_else(|| "<missing>".to_string());
    let mut text = if operand.source == "literal" {
        value
    } else {
        format!("{} ({})", operand.source, value)
    };
    if let Some(unit) = &operand.unit {
        text.push_str(&format!(" {}", unit));
    }
    text
}

fn format_diff(diff: &StateDiff) -> String {
    match diff {
        StateDiff::Fact {
            path,
            before,
            after,
        } => format!(
            "{}: {} -> {}",
            path,
            before
                .as_ref()
                .map(Value::quoted)
                .unwrap_or_else(|| "<unset>".to_string()),
            after.quoted()
        ),
        StateDiff::Route { before, after } => format!(
            "route: {} -> {}",
            before
                .as_ref()
                .map(|route| route.queue.clone())
                .unwrap_or_else(|| "<unset>".to_string()),
            after.queue
        ),
    }
}
