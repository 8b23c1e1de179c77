//! Deterministic rule execution
//!
//! Executes a validated program by:
//! 1. Copying the caller's facts into a private store
//! 2. Ordering rules by descending priority, then ascending id
//! 3. Running passes over the ordered rules until settled, stopped or capped
//! 4. Checking constraints against the final state

pub mod actions;
pub mod condition;
pub mod constraints;
pub mod context;
pub mod operations;
pub mod rules;

use crate::facts::FactStore;
use crate::{ExecutionOptions, ExecutionResult, MatchMode, Program, Rule};
use condition::evaluate_condition;
use constraints::check_constraints;
use context::ExecutionContext;
use rules::{fire_rule, skipped_rule, unapplied_rule, RuleOutcome};
use tracing::{debug, info};

/// Drives passes over a program's rules
#[derive(Default)]
pub struct Evaluator;

#[derive(Debug, Default)]
struct PassOutcome {
    mutated: bool,
    stopped: bool,
    hit_rule_limit: bool,
}

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    /// Execute `program` against a copy of `input`.
    ///
    /// The program must already have passed validation. The input is never
    /// modified; the final state is returned on the result.
    pub fn execute(
        &self,
        program: &Program,
        input: &FactStore,
        options: &ExecutionOptions,
    ) -> ExecutionResult {
        let ordered = ordered_rules(program);
        let mut context = ExecutionContext::new(program, input.clone(), options);

        let mut passes = 0;
        let mut hit_rule_limit = false;
        let mut hit_pass_limit = false;

        loop {
            passes += 1;
            let outcome = run_pass(&ordered, passes, &mut context);
            debug!(
                pass = passes,
                mutated = outcome.mutated,
                stopped = outcome.stopped,
                firings = context.firings,
                "pass complete"
            );

            if outcome.hit_rule_limit {
                info!(
                    limit = options.max_rule_firings,
                    "rule firing limit reached, result is incomplete"
                );
                hit_rule_limit = true;
                break;
            }
            if !options.loop_until_settled || outcome.stopped || !outcome.mutated {
                break;
            }
            if passes >= options.max_passes {
                info!(
                    limit = options.max_passes,
                    "pass limit reached before state settled"
                );
                hit_pass_limit = true;
                break;
            }
        }

        let constraints = check_constraints(&program.constraints, &context.facts);
        let examples = options
            .evaluate_examples
            .then(|| crate::example_runner::run_examples(program));
        let success = constraints.passed();

        ExecutionResult {
            state: context.facts,
            logs: context.logs,
            traces: context.traces,
            constraints,
            examples,
            success,
            conflicts: context.conflicts,
            warnings: context.warnings,
            rule_firings: context.firings,
            passes,
            hit_rule_limit,
            hit_pass_limit,
        }
    }
}

/// Execute a validated program; see [`Evaluator::execute`]
pub fn run(program: &Program, input: &FactStore, options: &ExecutionOptions) -> ExecutionResult {
    Evaluator::new().execute(program, input, options)
}

/// Descending priority (unset = 0), ties broken by ascending id
pub fn ordered_rules(program: &Program) -> Vec<&Rule> {
    let mut rules: Vec<&Rule> = program.rules.iter().collect();
    rules.sort_by(|a, b| {
        b.effective_priority()
            .cmp(&a.effective_priority())
            .then_with(|| a.id.cmp(&b.id))
    });
    rules
}

fn run_pass(rules: &[&Rule], pass: usize, context: &mut ExecutionContext) -> PassOutcome {
    let mut outcome = PassOutcome::default();

    for rule in rules {
        if outcome.stopped {
            let trace = skipped_rule(rule, pass, context);
            context.traces.push(trace);
            continue;
        }

        let condition = evaluate_condition(&rule.when, &context.facts);
        let matched = condition.result();
        if matched {
            if context.firing_cap_reached() {
                debug!(rule = %rule.id, pass, "firing cap reached");
                context.traces.push(unapplied_rule(rule, pass, condition));
                outcome.hit_rule_limit = true;
                return outcome;
            }
            context.firings += 1;
            debug!(rule = %rule.id, pass, firings = context.firings, "rule fired");
        }

        let RuleOutcome { mut trace, mutated } = fire_rule(rule, pass, condition, context);
        outcome.mutated |= mutated;

        if matched && (context.effective_mode(rule) == MatchMode::FirstMatch || rule.stop_processing)
        {
            trace.stopped = true;
            outcome.stopped = true;
        }
        context.traces.push(trace);
    }

    outcome
}
