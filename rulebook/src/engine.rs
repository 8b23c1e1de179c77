use crate::evaluator::Evaluator;
use crate::example_runner;
use crate::facts::FactStore;
use crate::{
    CoverageEntry, ExampleOutcome, ExampleReport, ExecutionOptions, ExecutionResult, Program,
    RulebookError, RulebookResult, ValidationReport, Validator,
};
use tracing::warn;

/// The rulebook execution engine.
///
/// Owns one validated program. Construction runs the validator, so an
/// `Engine` never executes a program with pre-execution errors.
pub struct Engine {
    program: Program,
    validator: Validator,
    evaluator: Evaluator,
    options: ExecutionOptions,
    report: ValidationReport,
}

impl Engine {
    /// Validate `program` and wrap it, refusing it if validation finds errors
    pub fn new(program: Program) -> RulebookResult<Self> {
        let validator = Validator::new();
        let report = validator.validate(&program);
        if !report.is_valid() {
            warn!(
                program = program.name.as_deref().unwrap_or("<unnamed>"),
                errors = report.errors.len(),
                "program rejected"
            );
            return Err(RulebookError::InvalidProgram(report));
        }

        Ok(Self {
            program,
            validator,
            evaluator: Evaluator::new(),
            options: ExecutionOptions::default(),
            report,
        })
    }

    /// Decode a JSON program document and validate it
    pub fn from_json(document: &str) -> RulebookResult<Self> {
        Self::new(crate::serializers::program_from_json(document)?)
    }

    /// Replace the options used by [`Engine::run`] and the example entry points
    pub fn with_options(mut self, options: ExecutionOptions) -> RulebookResult<Self> {
        options.validate()?;
        self.options = options;
        Ok(self)
    }

    pub fn options(&self) -> &ExecutionOptions {
        &self.options
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Warnings retained from loading (missing units, uncovered rules)
    pub fn validation(&self) -> &ValidationReport {
        &self.report
    }

    /// Re-run the validator, e.g. after examples were edited
    pub fn revalidate(&self) -> ValidationReport {
        self.validator.validate(&self.program)
    }

    /// Execute against a JSON fact payload with the engine's options
    pub fn run(&self, input: &serde_json::Value) -> RulebookResult<ExecutionResult> {
        self.run_with(input, &self.options)
    }

    pub fn run_with(
        &self,
        input: &serde_json::Value,
        options: &ExecutionOptions,
    ) -> RulebookResult<ExecutionResult> {
        let facts = FactStore::from_json(input)?;
        self.run_facts(&facts, options)
    }

    /// Execute against an already decoded store; `facts` is left untouched
    pub fn run_facts(
        &self,
        facts: &FactStore,
        options: &ExecutionOptions,
    ) -> RulebookResult<ExecutionResult> {
        options.validate()?;
        Ok(self.evaluator.execute(&self.program, facts, options))
    }

    /// Replay one declared example by id
    pub fn run_example(&self, example_id: &str) -> RulebookResult<ExampleOutcome> {
        let example = self
            .program
            .examples
            .iter()
            .find(|e| e.id == example_id)
            .ok_or_else(|| RulebookError::UnknownExample(example_id.to_string()))?;
        Ok(example_runner::run_example_with(
            &self.program,
            example,
            &self.options,
        ))
    }

    pub fn run_examples(&self) -> ExampleReport {
        example_runner::run_examples_with(&self.program, &self.options)
    }

    pub fn assess_coverage(&self) -> Vec<CoverageEntry> {
        example_runner::assess_coverage_with(&self.program, &self.options)
    }
}
