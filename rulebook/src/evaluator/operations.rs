//! Value comparison semantics
//!
//! Missing operands never reach these functions; the condition evaluator
//! treats them as a non-match first.

use crate::{ComparisonOperator, Value};
use regex::RegexBuilder;

/// Equality across runtime values. Numbers compare by value, so `10` equals `10.0`.
pub fn values_equal(left: &Value, right: &Value) -> bool {
    left == right
}

/// Apply a comparison operator to two present values
pub fn compare(left: &Value, op: ComparisonOperator, right: &Value) -> bool {
    match op {
        ComparisonOperator::Equals => values_equal(left, right),
        ComparisonOperator::NotEquals => !values_equal(left, right),
        ComparisonOperator::Greater
        | ComparisonOperator::GreaterOrEqual
        | ComparisonOperator::Less
        | ComparisonOperator::LessOrEqual => {
            let (Some(l), Some(r)) = (left.as_number(), right.as_number()) else {
                return false;
            };
            match op {
                ComparisonOperator::Greater => l > r,
                ComparisonOperator::GreaterOrEqual => l >= r,
                ComparisonOperator::Less => l < r,
                _ => l <= r,
            }
        }
        ComparisonOperator::Contains => contains(left, right),
        ComparisonOperator::In => contains_element(right, left),
    }
}

/// A string containing the stringified needle, or a list containing it
pub fn contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::Text(text) => text.contains(&needle.as_match_text()),
        Value::List(_) => contains_element(haystack, needle),
        _ => false,
    }
}

fn contains_element(list: &Value, item: &Value) -> bool {
    match list {
        Value::List(items) => items.iter().any(|candidate| values_equal(candidate, item)),
        _ => false,
    }
}

/// Match text against a pattern.
///
/// Returns `(matched, substring_fallback)`. A pattern that does not compile
/// degrades to plain substring containment instead of failing.
pub fn pattern_matches(text: &str, pattern: &str, case_insensitive: bool) -> (bool, bool) {
    match RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
    {
        Ok(regex) => (regex.is_match(text), false),
        Err(_) => {
            let matched = if case_insensitive {
                text.to_lowercase().contains(&pattern.to_lowercase())
            } else {
                text.contains(pattern)
            };
            (matched, true)
        }
    }
}
