use rulebook::{RulebookError, ValidationIssue};

/// Format a RulebookError for the terminal
///
/// Rejected programs list every finding, errors first, one per line.
pub fn format_error(error: &RulebookError) -> String {
    match error {
        RulebookError::InvalidProgram(report) => {
            let mut output = format!(
                "Program rejected: {} error(s), {} warning(s)\n",
                report.errors.len(),
                report.warnings.len()
            );
            for issue in &report.errors {
                output.push_str(&format_issue("error", issue));
            }
            for issue in &report.warnings {
                output.push_str(&format_issue("warning", issue));
            }
            output
        }
        RulebookError::Structural(message) => {
            format!("Structural error: {}\n  = the document does not decode into a program", message)
        }
        RulebookError::InvalidFacts(message) => {
            format!("Invalid facts: {}\n  = payloads look like {{\"entity\": {{\"field\": value}}}}", message)
        }
        other => format!("Error: {}", other),
    }
}

fn format_issue(label: &str, issue: &ValidationIssue) -> String {
    format!(
        "  {}[{}] {}\n    {}\n",
        label, issue.kind, issue.location, issue.message
    )
}
