use crate::facts::FactStore;
use crate::Program;
use serde_json::json;

pub(crate) fn program(document: serde_json::Value) -> Program {
    serde_json::from_value(document).unwrap()
}

pub(crate) fn store(payload: serde_json::Value) -> FactStore {
    FactStore::from_json(&payload).unwrap()
}

/// The `order` entity most tests run against
pub(crate) fn order_entity() -> serde_json::Value {
    json!({
        "name": "order",
        "fields": [
            {"name": "total", "type": "number"},
            {"name": "discountPercent", "type": "number"},
            {"name": "count", "type": "number"},
            {"name": "status", "type": "string"},
            {"name": "tags", "type": "string"},
            {"name": "vip", "type": "boolean"},
            {"name": "placedAt", "type": "date"}
        ]
    })
}

/// A program over the `order` entity with the given rules
pub(crate) fn order_program(rules: serde_json::Value) -> Program {
    program(json!({
        "entities": [order_entity()],
        "rules": rules
    }))
}

pub(crate) fn greater(path: &str, value: i64) -> serde_json::Value {
    json!({"compare": {"lhs": {"fact": path}, "operator": "greater", "rhs": {"value": value}}})
}

pub(crate) fn equals(path: &str, value: serde_json::Value) -> serde_json::Value {
    json!({"compare": {"lhs": {"fact": path}, "operator": "equals", "rhs": {"value": value}}})
}

pub(crate) fn set(path: &str, value: serde_json::Value) -> serde_json::Value {
    json!({"set": {"target": path, "value": {"value": value}}})
}



// Validation and examples
mod engine;
mod validator;
