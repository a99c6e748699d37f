// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Pure condition evaluation against entity snapshots
//!
//! All conditions in a rule must match (logical AND) and evaluation
//! short-circuits on the first failure. Coercion follows the loose rules the
//! rule editor exposes: equality is strict except that numbers compare as
//! doubles, `contains` compares string forms, numeric comparators coerce
//! both sides to floats and treat non-numeric values as NaN (which
//! never satisfies any comparator), and the emptiness operators use blanket
//! falsiness: null, absent, `""`, `0` and `false` all count as empty. That
//! last rule is a known imprecision for numeric fields (a deal value of 0
//! matches `is_empty`) and is preserved deliberately.

use crate::entity::{field, Entity};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single field/operator/value test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    #[serde(default)]
    pub value: Value,
}

/// Comparison operators available to rule conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
    IsEmpty,
    IsNotEmpty,
}

/// Evaluate a rule's conditions against an entity snapshot
///
/// An empty condition list trivially matches: automations with no conditions
/// always fire on trigger + permission match. Missing fields are read as null
/// and flow through the coercion rules; nothing here can fail.
pub fn matches_conditions(entity: &Entity, conditions: &[Condition]) -> bool {
    conditions.iter().all(|c| matches_one(entity, c))
}

fn matches_one(entity: &Entity, condition: &Condition) -> bool {
    let actual = field(entity, &condition.field);
    let expected = &condition.value;

    match condition.operator {
        Operator::Equals => loose_eq(actual, expected),
        Operator::NotEquals => !loose_eq(actual, expected),
        Operator::Contains => string_form(actual).contains(&string_form(expected)),
        Operator::Gt => numeric(actual, expected, |a, b| a > b),
        Operator::Lt => numeric(actual, expected, |a, b| a < b),
        Operator::Gte => numeric(actual, expected, |a, b| a >= b),
        Operator::Lte => numeric(actual, expected, |a, b| a <= b),
        // `in` requires the condition value to already be a list
        Operator::In => match expected {
            Value::Array(options) => options.contains(actual),
            _ => false,
        },
        Operator::IsEmpty => is_falsy(actual),
        Operator::IsNotEmpty => !is_falsy(actual),
    }
}

/// Equality with numbers compared as doubles, so `1500` equals `1500.0`.
/// Everything else stays strict: `"5"` never equals `5`.
fn loose_eq(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        _ => actual == expected,
    }
}

fn numeric(actual: &Value, expected: &Value, cmp: impl Fn(f64, f64) -> bool) -> bool {
    let (a, b) = (as_number(actual), as_number(expected));
    // NaN on either side fails every comparator
    if a.is_nan() || b.is_nan() {
        return false;
    }
    cmp(a, b)
}

/// Numeric coercion: numbers pass through, numeric strings parse, booleans
/// become 0/1, everything else (null, arrays, objects, non-numeric strings)
/// is NaN
fn as_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        Value::Bool(true) => 1.0,
        Value::Bool(false) => 0.0,
        _ => f64::NAN,
    }
}

/// String coercion for substring tests
fn string_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Blanket falsiness: null, empty string, zero and false are all "empty"
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Value::String(s) => s.is_empty(),
        // Arrays and objects are always truthy, even when empty
        Value::Array(_) | Value::Object(_) => false,
    }
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
