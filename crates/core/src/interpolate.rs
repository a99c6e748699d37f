// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Message template interpolation

use crate::entity::Entity;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

// Regex pattern for {{field_name}} - this is a constant valid pattern
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static FIELD_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("constant regex pattern is valid"));

/// Interpolate `{{field}}` placeholders with values from an entity snapshot
///
/// Placeholders referencing absent fields are left verbatim so rule authors
/// can see the mistake in the delivered message. Never fails.
pub fn interpolate(template: &str, entity: &Entity) -> String {
    FIELD_PATTERN
        .replace_all(template, |caps: &regex::Captures| {
            let name = &caps[1];
            match entity.get(name) {
                Some(value) => display_form(value),
                None => caps[0].to_string(),
            }
        })
        .to_string()
}

/// How a field renders inside a message: strings bare, scalars via their
/// JSON form
fn display_form(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[path = "interpolate_tests.rs"]
mod tests;
