use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A rule program: entity catalog, rules, post-state constraints and examples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub config: ProgramConfig,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub examples: Vec<Example>,
}

/// Program-level defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<MatchMode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Entity {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub scalar_type: ScalarType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Number,
    Boolean,
    Date,
}

impl ScalarType {
    /// Returns a human-readable name for this type
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::String => "string",
            ScalarType::Number => "number",
            ScalarType::Boolean => "boolean",
            ScalarType::Date => "date",
        }
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How many matching rules a single pass applies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchMode {
    FirstMatch,
    #[default]
    AllMatches,
}

/// A condition or action operand: a fact reference or a literal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Operand {
    Fact {
        fact: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
    Value {
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
}

impl Operand {
    pub fn fact(path: impl Into<String>) -> Self {
        Operand::Fact {
            fact: path.into(),
            unit: None,
        }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Operand::Value {
            value: value.into(),
            unit: None,
        }
    }

    /// Attach a unit label to this operand
    pub fn with_unit(self, label: impl Into<String>) -> Self {
        match self {
            Operand::Fact { fact, .. } => Operand::Fact {
                fact,
                unit: Some(label.into()),
            },
            Operand::Value { value, .. } => Operand::Value {
                value,
                unit: Some(label.into()),
            },
        }
    }

    pub fn unit(&self) -> Option<&str> {
        match self {
            Operand::Fact { unit, .. } | Operand::Value { unit, .. } => unit.as_deref(),
        }
    }

    /// The dotted path if this operand references a fact
    pub fn path(&self) -> Option<&str> {
        match self {
            Operand::Fact { fact, .. } => Some(fact),
            Operand::Value { .. } => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Fact { fact, .. } => write!(f, "{}", fact)?,
            Operand::Value { value, .. } => write!(f, "{}", value.quoted())?,
        }
        if let Some(unit) = self.unit() {
            write!(f, " {}", unit)?;
        }
        Ok(())
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComparisonOperator {
    Equals,
    NotEquals,
    Greater,
    GreaterOrEqual,
    Less,
    LessOrEqual,
    Contains,
    In,
}

impl ComparisonOperator {
    /// Returns a human-readable name for the operator
    pub fn name(&self) -> &'static str {
        match self {
            ComparisonOperator::Equals => "equals",
            ComparisonOperator::NotEquals => "not equals",
            ComparisonOperator::Greater => "greater than",
            ComparisonOperator::GreaterOrEqual => "greater than or equal",
            ComparisonOperator::Less => "less than",
            ComparisonOperator::LessOrEqual => "less than or equal",
            ComparisonOperator::Contains => "contains",
            ComparisonOperator::In => "in",
        }
    }

    /// True for the operators that only apply to numbers
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            ComparisonOperator::Greater
                | ComparisonOperator::GreaterOrEqual
                | ComparisonOperator::Less
                | ComparisonOperator::LessOrEqual
        )
    }

    /// True for the operators with sequence semantics
    pub fn is_membership(&self) -> bool {
        matches!(self, ComparisonOperator::Contains | ComparisonOperator::In)
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            ComparisonOperator::Equals => "==",
            ComparisonOperator::NotEquals => "!=",
            ComparisonOperator::Greater => ">",
            ComparisonOperator::GreaterOrEqual => ">=",
            ComparisonOperator::Less => "<",
            ComparisonOperator::LessOrEqual => "<=",
            ComparisonOperator::Contains => "contains",
            ComparisonOperator::In => "in",
        };
        f.write_str(symbol)
    }
}

/// A boolean condition tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Condition {
    Compare {
        lhs: Operand,
        operator: ComparisonOperator,
        rhs: Operand,
    },
    Exists {
        fact: String,
    },
    MemberOf {
        value: Operand,
        options: Vec<Operand>,
    },
    Matches {
        value: Operand,
        pattern: String,
        #[serde(default, rename = "caseInsensitive")]
        case_insensitive: bool,
    },
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn compare(lhs: Operand, operator: ComparisonOperator, rhs: Operand) -> Self {
        Condition::Compare { lhs, operator, rhs }
    }

    pub fn exists(path: impl Into<String>) -> Self {
        Condition::Exists { fact: path.into() }
    }

    pub fn negate(child: Condition) -> Self {
        Condition::Not(Box::new(child))
    }
}

/// A single effect fired by a rule branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Set {
        target: String,
        value: Operand,
    },
    Increment {
        target: String,
        by: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
    },
    Append {
        target: String,
        value: Operand,
    },
    Emit {
        event: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        payload: BTreeMap<String, Operand>,
    },
    Route {
        queue: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Set { .. } => ActionKind::Set,
            Action::Increment { .. } => ActionKind::Increment,
            Action::Append { .. } => ActionKind::Append,
            Action::Emit { .. } => ActionKind::Emit,
            Action::Route { .. } => ActionKind::Route,
        }
    }

    /// The declared field this action writes, if any
    pub fn target(&self) -> Option<&str> {
        match self {
            Action::Set { target, .. }
            | Action::Increment { target, .. }
            | Action::Append { target, .. } => Some(target),
            Action::Emit { .. } | Action::Route { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Set,
    Increment,
    Append,
    Emit,
    Route,
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Set => "set",
            ActionKind::Increment => "increment",
            ActionKind::Append => "append",
            ActionKind::Emit => "emit",
            ActionKind::Route => "route",
        }
    }
}

/// A rule: condition plus the actions fired on match (`then`) and non-match (`else`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<MatchMode>,
    pub when: Condition,
    #[serde(default)]
    pub then: Vec<Action>,
    #[serde(default, rename = "else")]
    pub otherwise: Vec<Action>,
    #[serde(default)]
    pub stop_processing: bool,
}

impl Rule {
    /// Priority with the unset default applied
    pub fn effective_priority(&self) -> i64 {
        self.priority.unwrap_or(0)
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warn,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warn => f.write_str("warn"),
        }
    }
}

/// A post-state invariant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "assert")]
    pub assertion: Condition,
    #[serde(default)]
    pub severity: Severity,
}

/// A declared input/expected-output pair, replayed by the example runner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub id: String,
    #[serde(default = "empty_object")]
    pub input: serde_json::Value,
    #[serde(default = "empty_object")]
    pub expected: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// A fact value
///
/// Literals in a program are restricted to text, numbers and booleans; `Null`
/// and `List` only appear in fact payloads and as the result of `append`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(Decimal),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    /// Name of the runtime kind, for messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::Text(_) => "string",
            Value::List(_) => "list",
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Value::Boolean(_) | Value::Number(_) | Value::Text(_))
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Rendering used for substring and pattern matching
    pub fn as_match_text(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Display with strings quoted, for traces and messages
    pub fn quoted(&self) -> String {
        match self {
            Value::Text(s) => format!("\"{}\"", s),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n.normalize()),
            Value::Text(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str(&item.quoted())?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Decimal::from(n))
    }
}

impl From<Decimal> for Value {
    fn from(n: Decimal) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

/// Parse a JSON number into an exact decimal
pub(crate) fn decimal_from_json(n: &serde_json::Number) -> Option<Decimal> {
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .or_else(|| n.as_f64().and_then(Decimal::from_f64))
}

pub(crate) fn decimal_to_json(n: Decimal) -> serde_json::Value {
    let n = n.normalize();
    if n.fract().is_zero() {
        if let Some(i) = n.to_i64() {
            return serde_json::Value::from(i);
        }
    }
    n.to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|| serde_json::Value::String(n.to_string()))
}

impl TryFrom<serde_json::Value> for Value {
    type Error = String;

    fn try_from(json: serde_json::Value) -> Result<Self, Self::Error> {
        match json {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Boolean(b)),
            serde_json::Value::Number(n) => decimal_from_json(&n)
                .map(Value::Number)
                .ok_or_else(|| format!("number {} is out of range", n)),
            serde_json::Value::String(s) => Ok(Value::Text(s)),
            serde_json::Value::Array(items) => items
                .into_iter()
                .map(Value::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            serde_json::Value::Object(_) => {
                Err("objects are not valid fact values".to_string())
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => decimal_to_json(*n),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serde_json::Value::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let json = serde_json::Value::deserialize(deserializer)?;
        Value::try_from(json).map_err(serde::de::Error::custom)
    }
}
