// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Automation rules as the engine sees them
//!
//! Rules are authored through the CRUD API and are read-only here except for
//! the run-count bookkeeping the rule store performs after a successful run.

use crate::action::Action;
use crate::condition::Condition;
use crate::envelope::{decode_payload, PayloadError};
use crate::trigger::Trigger;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A trigger-activated automation rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationRule {
    pub id: String,
    pub name: String,
    pub trigger: Trigger,
    pub is_active: bool,
    /// Versioned payload of `Condition` items
    #[serde(default = "empty_payload")]
    pub conditions: Value,
    /// Versioned payload of `Action` items
    #[serde(default = "empty_payload")]
    pub actions: Value,
    /// Creating user; `None` means a system rule with full authority
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub run_count: u64,
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
}

fn empty_payload() -> Value {
    Value::Array(vec![])
}

impl AutomationRule {
    /// Decode the rule's conditions, rejecting payload versions this build
    /// does not understand
    pub fn conditions(&self) -> Result<Vec<Condition>, PayloadError> {
        decode_payload(&self.conditions)?
            .iter()
            .map(|item| serde_json::from_value(item.clone()).map_err(PayloadError::from))
            .collect()
    }

    /// Decode the rule's actions; unrecognized action kinds are dropped
    pub fn actions(&self) -> Result<Vec<Action>, PayloadError> {
        let mut actions = Vec::new();
        for item in decode_payload(&self.actions)? {
            if let Some(action) = Action::parse(&item)? {
                actions.push(action);
            }
        }
        Ok(actions)
    }
}

#[cfg(test)]
#[path = "rule_tests.rs"]
mod tests;
