//! Type and unit checking
//!
//! Ties field declarations to operand usage. Used by the validator for the
//! whole-program pass and by the action interpreter for every write, since a
//! copy between fields can carry whatever value the payload supplied.

use crate::catalog::{EntityCatalog, ReferenceError};
use crate::{Field, Operand, ScalarType, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeCheckError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("expected {expected}, found {found}")]
    Mismatch {
        expected: ScalarType,
        found: String,
    },

    #[error("'{0}' is not a valid date")]
    InvalidDate(String),

    #[error("literal {0} is not a string, number or boolean")]
    InvalidLiteral(String),
}

/// Result of comparing an operand's unit with a field's unit
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitIssue {
    #[error("unit missing: '{field}' is measured in {expected}")]
    Missing { field: String, expected: String },

    #[error("unit mismatch: '{field}' is measured in {expected}, operand uses {found}")]
    Mismatch {
        field: String,
        expected: String,
        found: String,
    },
}

impl UnitIssue {
    /// Mismatches reject the program, a missing unit is only a warning
    pub fn is_hard(&self) -> bool {
        matches!(self, UnitIssue::Mismatch { .. })
    }
}

/// Accepts RFC 3339 timestamps, `YYYY-MM-DD` and `YYYY-MM-DDTHH:MM:SS`
pub fn parse_date(text: &str) -> bool {
    DateTime::parse_from_rfc3339(text).is_ok()
        || NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").is_ok()
}

pub struct TypeChecker<'a> {
    catalog: &'a EntityCatalog<'a>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(catalog: &'a EntityCatalog<'a>) -> Self {
        Self { catalog }
    }

    /// Determine the scalar type of an operand.
    ///
    /// Fact operands take the declared type of their field. Literals are
    /// inferred, except that a string literal checked against `date` must
    /// parse as a date and is then typed as one.
    pub fn check_operand(
        &self,
        operand: &Operand,
        expected: Option<ScalarType>,
    ) -> Result<ScalarType, TypeCheckError> {
        match operand {
            Operand::Fact { fact, .. } => Ok(self.catalog.resolve(fact)?.scalar_type),
            Operand::Value { value, .. } => match value {
                Value::Boolean(_) => Ok(ScalarType::Boolean),
                Value::Number(_) => Ok(ScalarType::Number),
                Value::Text(text) if expected == Some(ScalarType::Date) => {
                    if parse_date(text) {
                        Ok(ScalarType::Date)
                    } else {
                        Err(TypeCheckError::InvalidDate(text.clone()))
                    }
                }
                Value::Text(_) => Ok(ScalarType::String),
                Value::Null | Value::List(_) => {
                    Err(TypeCheckError::InvalidLiteral(value.to_string()))
                }
            },
        }
    }

    /// Check that an operand agrees with the expected type
    pub fn check_agreement(
        &self,
        operand: &Operand,
        expected: ScalarType,
    ) -> Result<(), TypeCheckError> {
        let found = self.check_operand(operand, Some(expected))?;
        if found == expected {
            Ok(())
        } else {
            Err(TypeCheckError::Mismatch {
                expected,
                found: found.name().to_string(),
            })
        }
    }

    /// The unit an operand carries: its own label, else its field's unit
    pub fn operand_unit(&self, operand: &Operand) -> Option<String> {
        if let Some(unit) = operand.unit() {
            return Some(unit.to_string());
        }
        operand
            .path()
            .and_then(|path| self.catalog.resolve(path).ok())
            .and_then(|field| field.unit.clone())
    }

    /// Compare the operand's unit with the unit the field declares
    pub fn check_units(
        &self,
        operand: &Operand,
        field_path: &str,
        field: &Field,
    ) -> Result<(), UnitIssue> {
        let Some(expected) = &field.unit else {
            return Ok(());
        };
        match self.operand_unit(operand) {
            None => Err(UnitIssue::Missing {
                field: field_path.to_string(),
                expected: expected.clone(),
            }),
            Some(found) if &found != expected => Err(UnitIssue::Mismatch {
                field: field_path.to_string(),
                expected: expected.clone(),
                found,
            }),
            Some(_) => Ok(()),
        }
    }
}

/// Check a runtime value against the declared type of the field it is written to
pub fn check_value(value: &Value, field: &Field) -> Result<(), TypeCheckError> {
    let agrees = match (field.scalar_type, value) {
        (_, Value::Null) => true,
        (ScalarType::String, Value::Text(_)) => true,
        (ScalarType::Number, Value::Number(_)) => true,
        (ScalarType::Boolean, Value::Boolean(_)) => true,
        (ScalarType::Date, Value::Text(text)) => {
            if !parse_date(text) {
                return Err(TypeCheckError::InvalidDate(text.clone()));
            }
            true
        }
        _ => false,
    };

    if agrees {
        Ok(())
    } else {
        Err(TypeCheckError::Mismatch {
            expected: field.scalar_type,
            found: value.kind_name().to_string(),
        })
    }
}
