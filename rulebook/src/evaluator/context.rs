//! Execution context for one call to the engine
//!
//! Owns the fact store and every piece of per-execution state; nothing
//! outlives the call that created it.

use crate::catalog::EntityCatalog;
use crate::conflict::ConflictTracker;
use crate::facts::FactStore;
use crate::{ActionLog, ExecutionOptions, MatchMode, Program, Rule, RuleTrace};

pub struct ExecutionContext<'a> {
    pub program: &'a Program,

    pub catalog: EntityCatalog<'a>,

    pub options: &'a ExecutionOptions,

    /// Private copy of the caller's input, mutated unless in dry-run
    pub facts: FactStore,

    /// Written paths for dynamic conflict detection
    pub tracker: ConflictTracker,

    /// Matched rules across all passes
    pub firings: usize,

    pub logs: Vec<ActionLog>,
    pub traces: Vec<RuleTrace>,
    pub conflicts: Vec<String>,
    pub warnings: Vec<String>,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(program: &'a Program, facts: FactStore, options: &'a ExecutionOptions) -> Self {
        Self {
            program,
            catalog: EntityCatalog::new(program),
            options,
            facts,
            tracker: ConflictTracker::new(),
            firings: 0,
            logs: Vec::new(),
            traces: Vec::new(),
            conflicts: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Rule mode, else the caller's override, else the program default
    pub fn effective_mode(&self, rule: &Rule) -> MatchMode {
        rule.mode
            .or(self.options.mode)
            .or(self.program.config.mode)
            .unwrap_or_default()
    }

    pub fn firing_cap_reached(&self) -> bool {
        self.firings >= self.options.max_rule_firings
    }
}
