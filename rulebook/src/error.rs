use crate::validator::ValidationReport;
use thiserror::Error;

/// Failures that stop a program or payload from reaching the engine
///
/// Once execution starts nothing is raised: runtime conditions are recorded
/// on the [`ExecutionResult`](crate::ExecutionResult) instead.
#[derive(Debug, Error)]
pub enum RulebookError {
    /// The document does not decode into a program
    #[error("Structural error: {0}")]
    Structural(String),

    /// The fact payload does not fit the entity/field shape
    #[error("Invalid facts: {0}")]
    InvalidFacts(String),

    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// The program failed semantic validation and must not run
    #[error("Program rejected with {} error(s):\n{}", .0.errors.len(), .0.summary())]
    InvalidProgram(ValidationReport),

    #[error("Unknown example: '{0}'")]
    UnknownExample(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
