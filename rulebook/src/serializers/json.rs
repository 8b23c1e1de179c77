use crate::facts::FactStore;
use crate::{ExecutionResult, Program, RulebookError, RulebookResult};

/// Decode a JSON program document.
///
/// This is the structural gate: anything that does not decode into the
/// program model is rejected here and never reaches the validator.
pub fn program_from_json(document: &str) -> RulebookResult<Program> {
    serde_json::from_str(document).map_err(|e| RulebookError::Structural(e.to_string()))
}

pub fn program_from_value(document: serde_json::Value) -> RulebookResult<Program> {
    serde_json::from_value(document).map_err(|e| RulebookError::Structural(e.to_string()))
}

pub fn program_to_json(program: &Program) -> RulebookResult<String> {
    Ok(serde_json::to_string_pretty(program)?)
}

pub fn facts_from_json(payload: &serde_json::Value) -> RulebookResult<FactStore> {
    FactStore::from_json(payload)
}

/// Decode a fact payload from text; an empty document is an empty store
pub fn facts_from_str(payload: &str) -> RulebookResult<FactStore> {
    if payload.trim().is_empty() {
        return Ok(FactStore::new());
    }
    let value: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| RulebookError::InvalidFacts(e.to_string()))?;
    FactStore::from_json(&value)
}

pub fn result_to_json(result: &ExecutionResult) -> RulebookResult<serde_json::Value> {
    Ok(serde_json::to_value(result)?)
}
