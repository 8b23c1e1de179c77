use crate::{MatchMode, RulebookError, RulebookResult};
use serde::{Deserialize, Serialize};

/// Options for one execution
///
/// The two bounds are the engine's only termination guarantees when
/// `loop_until_settled` is on: a rule set that keeps mutating state stops at
/// whichever is reached first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionOptions {
    /// Overrides the program's default match mode (rule-level modes still win)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<MatchMode>,

    /// Maximum matched rules per execution
    pub max_rule_firings: usize,

    /// Maximum passes per execution
    pub max_passes: usize,

    /// False simulates every action without writing (dry-run)
    pub enable_actions: bool,

    /// Repeat passes while the previous pass mutated state
    pub loop_until_settled: bool,

    /// Also replay the program's examples and attach the report
    pub evaluate_examples: bool,
}

impl Default for ExecutionOptions {
    fn default() -> Self {
        Self {
            mode: None,
            max_rule_firings: 1000,
            max_passes: 100,
            enable_actions: true,
            loop_until_settled: false,
            evaluate_examples: false,
        }
    }
}

impl ExecutionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dry_run() -> Self {
        Self {
            enable_actions: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> RulebookResult<()> {
        if self.max_rule_firings == 0 {
            return Err(RulebookError::InvalidOptions(
                "maxRuleFirings must be a positive integer".to_string(),
            ));
        }
        if self.max_passes == 0 {
            return Err(RulebookError::InvalidOptions(
                "maxPasses must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}
