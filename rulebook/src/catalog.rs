//! Path resolution against the entity catalog
//!
//! Every fact reference in a program is a dotted `entity.field` path. The
//! catalog resolves such paths to their declared [`Field`], and is shared by
//! the validator, the type checker and the action interpreter.

use crate::{Entity, Field, Program};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Name of the reserved fact-store slot written by `route` actions
pub const ROUTE_SLOT: &str = "route";

/// A parsed `entity.field` reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FactPath {
    pub entity: String,
    pub field: String,
}

impl FactPath {
    pub fn new(entity: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            field: field.into(),
        }
    }

    /// Split a dotted path into exactly two non-empty segments
    pub fn parse(path: &str) -> Result<Self, ReferenceError> {
        let mut segments = path.split('.');
        match (segments.next(), segments.next(), segments.next()) {
            (Some(entity), Some(field), None) if !entity.is_empty() && !field.is_empty() => {
                Ok(Self::new(entity, field))
            }
            _ => Err(ReferenceError::MalformedPath(path.to_string())),
        }
    }
}

impl fmt::Display for FactPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity, self.field)
    }
}

/// A path that does not resolve to a declared field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    #[error("'{0}' is not a valid fact path (expected 'entity.field')")]
    MalformedPath(String),

    #[error("'{path}' references unknown entity '{entity}'")]
    UnknownEntity { path: String, entity: String },

    #[error("'{path}' references unknown field '{field}' on entity '{entity}'")]
    UnknownField {
        path: String,
        entity: String,
        field: String,
    },
}

/// Lookup table from entity name to its declaration
#[derive(Debug, Clone)]
pub struct EntityCatalog<'a> {
    entities: BTreeMap<&'a str, &'a Entity>,
}

impl<'a> EntityCatalog<'a> {
    /// Build the catalog; on duplicate entity names the first declaration wins
    /// (duplicates are reported by the validator).
    pub fn new(program: &'a Program) -> Self {
        let mut entities = BTreeMap::new();
        for entity in &program.entities {
            entities.entry(entity.name.as_str()).or_insert(entity);
        }
        Self { entities }
    }

    pub fn entity(&self, name: &str) -> Option<&'a Entity> {
        self.entities.get(name).copied()
    }

    /// Resolve a dotted path to its declared field
    pub fn resolve(&self, path: &str) -> Result<&'a Field, ReferenceError> {
        let parsed = FactPath::parse(path)?;
        self.resolve_path(&parsed)
    }

    pub fn resolve_path(&self, path: &FactPath) -> Result<&'a Field, ReferenceError> {
        let entity = self
            .entity(&path.entity)
            .ok_or_else(|| ReferenceError::UnknownEntity {
                path: path.to_string(),
                entity: path.entity.clone(),
            })?;

        entity
            .field(&path.field)
            .ok_or_else(|| ReferenceError::UnknownField {
                path: path.to_string(),
                entity: path.entity.clone(),
                field: path.field.clone(),
            })
    }
}
