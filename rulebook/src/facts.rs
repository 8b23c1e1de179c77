//! The per-execution fact store
//!
//! A two-level map (entity name -> field name -> value) plus the reserved
//! route slot. Each execution owns a fresh store decoded from the caller's
//! payload, so caller state is never aliased.

use crate::catalog::{FactPath, ROUTE_SLOT};
use crate::{RulebookError, RulebookResult, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Queue assignment written by `route` actions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteAssignment {
    pub queue: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FactStore {
    entities: BTreeMap<String, BTreeMap<String, Value>>,
    route: Option<RouteAssignment>,
}

impl FactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a JSON payload of the form `{entity: {field: value}, route?: {...}}`
    pub fn from_json(payload: &serde_json::Value) -> RulebookResult<Self> {
        let object = match payload {
            serde_json::Value::Object(object) => object,
            serde_json::Value::Null => return Ok(Self::new()),
            other => {
                return Err(RulebookError::InvalidFacts(format!(
                    "fact payload must be an object, found {}",
                    json_kind(other)
                )))
            }
        };

        let mut store = Self::new();
        for (entity, fields) in object {
            if entity == ROUTE_SLOT {
                if !fields.is_null() {
                    let route = serde_json::from_value(fields.clone()).map_err(|e| {
                        RulebookError::InvalidFacts(format!("invalid route slot: {}", e))
                    })?;
                    store.route = Some(route);
                }
                continue;
            }

            let serde_json::Value::Object(fields) = fields else {
                return Err(RulebookError::InvalidFacts(format!(
                    "entity '{}' must be an object of fields, found {}",
                    entity,
                    json_kind(fields)
                )));
            };

            let slot = store.entities.entry(entity.clone()).or_default();
            for (field, value) in fields {
                let value = Value::try_from(value.clone()).map_err(|e| {
                    RulebookError::InvalidFacts(format!("{}.{}: {}", entity, field, e))
                })?;
                slot.insert(field.clone(), value);
            }
        }
        Ok(store)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut object = serde_json::Map::new();
        for (entity, fields) in &self.entities {
            let fields: serde_json::Map<String, serde_json::Value> = fields
                .iter()
                .map(|(name, value)| (name.clone(), serde_json::Value::from(value)))
                .collect();
            object.insert(entity.clone(), serde_json::Value::Object(fields));
        }
        if let Some(route) = &self.route {
            let mut slot = serde_json::Map::new();
            slot.insert(
                "queue".to_string(),
                serde_json::Value::String(route.queue.clone()),
            );
            if let Some(reason) = &route.reason {
                slot.insert(
                    "reason".to_string(),
                    serde_json::Value::String(reason.clone()),
                );
            }
            object.insert(ROUTE_SLOT.to_string(), serde_json::Value::Object(slot));
        }
        serde_json::Value::Object(object)
    }

    pub fn get(&self, path: &FactPath) -> Option<&Value> {
        self.entities.get(&path.entity)?.get(&path.field)
    }

    /// Look up a dotted path; malformed paths read as missing
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let path = FactPath::parse(path).ok()?;
        self.get(&path)
    }

    /// Write a value, returning the previous one
    pub fn set(&mut self, path: &FactPath, value: Value) -> Option<Value> {
        self.entities
            .entry(path.entity.clone())
            .or_default()
            .insert(path.field.clone(), value)
    }

    pub fn route(&self) -> Option<&RouteAssignment> {
        self.route.as_ref()
    }

    /// Replace the route assignment, returning the previous one
    pub fn set_route(&mut self, route: RouteAssignment) -> Option<RouteAssignment> {
        self.route.replace(route)
    }

    pub fn entities(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, Value>)> {
        self.entities.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl Serialize for FactStore {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_json().serialize(serializer)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
