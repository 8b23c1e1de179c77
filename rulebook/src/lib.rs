//! # Rulebook Engine
//!
//! **Deterministic, explainable rule programs**
//!
//! A rulebook program is a typed document of entities, rules, constraints and
//! examples. It is validated once and then executed against fact payloads;
//! every decision the engine makes is recorded on the result.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rulebook::{Engine, RulebookResult};
//!
//! fn main() -> RulebookResult<()> {
//!     let engine = Engine::from_json(r#"{
//!         "entities": [{"name": "order", "fields": [
//!             {"name": "total", "type": "number"},
//!             {"name": "discountPercent", "type": "number"}
//!         ]}],
//!         "rules": [{
//!             "id": "discount-high-value",
//!             "when": {"compare": {
//!                 "lhs": {"fact": "order.total"},
//!                 "operator": "greater",
//!                 "rhs": {"value": 100}
//!             }},
//!             "then": [{"set": {"target": "order.discountPercent", "value": {"value": 10}}}]
//!         }]
//!     }"#)?;
//!
//!     let result = engine.run(&serde_json::json!({"order": {"total": 120}}))?;
//!     assert!(result.success);
//!     Ok(())
//! }
//! ```
//!
//! ## Core Concepts
//!
//! ### Facts
//! Values addressed by `entity.field`. Each execution works on a private copy
//! of the caller's payload.
//!
//! ### Rules
//! A condition plus `then`/`else` actions. Rules run in descending priority,
//! ties broken by id. A pass can stop early (`firstMatch`, `stopProcessing`),
//! and passes can repeat until state settles, within fixed bounds.
//!
//! ### Constraints and examples
//! Constraints are checked against the final state. Examples pair an input
//! with an expected partial output and double as coverage fixtures.

pub mod catalog;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod example_runner;
pub mod facts;
pub mod options;
pub mod response;
pub mod semantic;
pub mod serializers;
pub mod typecheck;
pub mod validator;

pub use catalog::{EntityCatalog, FactPath, ReferenceError};
pub use engine::Engine;
pub use error::RulebookError;
pub use evaluator::{run, Evaluator};
pub use example_runner::{assess_coverage, run_example, run_examples};
pub use facts::{FactStore, RouteAssignment};
pub use options::ExecutionOptions;
pub use response::*;
pub use semantic::*;
pub use validator::{IssueKind, ValidationIssue, ValidationReport, Validator};

/// Result type for rulebook operations
pub type RulebookResult<T> = Result<T, RulebookError>;

#[cfg(test)]
mod tests;
