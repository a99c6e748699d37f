// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Typed automation actions
//!
//! Actions are stored as `{"kind": ..., "config": {...}}` objects. Kinds this
//! build does not recognize parse to `None` and are skipped: a forward
//! compatible no-op, never an error, so a rule authored against a newer
//! deployment cannot fail older workers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One discrete effect a rule can cause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "config", rename_all = "snake_case")]
pub enum Action {
    /// Insert a follow-up task on the triggering entity
    CreateTask {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        assignee_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        due_days: Option<i64>,
    },
    /// Enqueue an outbound email (deduplicated per recipient per day)
    SendEmail {
        to: String,
        subject: String,
        body: String,
    },
    /// Enqueue an in-app notification (not date-deduplicated)
    SendNotification {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
        title: String,
        #[serde(default)]
        body: String,
    },
    /// Mutate a field on the triggering entity; the sole re-entrancy point
    UpdateField { field: String, value: Value },
}

impl Action {
    /// Parse one raw payload item; unknown kinds yield `None`
    ///
    /// A recognized kind with a malformed config is still an error; only the
    /// kind discriminant is forward-compatible.
    pub fn parse(item: &Value) -> Result<Option<Action>, serde_json::Error> {
        const KNOWN: [&str; 4] = [
            "create_task",
            "send_email",
            "send_notification",
            "update_field",
        ];
        let kind = item.get("kind").and_then(Value::as_str);
        match kind {
            Some(k) if KNOWN.contains(&k) => {
                serde_json::from_value(item.clone()).map(Some)
            }
            _ => Ok(None),
        }
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateTask { .. } => "create_task",
            Action::SendEmail { .. } => "send_email",
            Action::SendNotification { .. } => "send_notification",
            Action::UpdateField { .. } => "update_field",
        }
    }
}

#[cfg(test)]
#[path = "action_tests.rs"]
mod tests;
