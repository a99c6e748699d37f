// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Trigger events, the unit of work flowing through the automation queue

use crate::entity::EntityKind;
use crate::trigger::Trigger;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Hard ceiling on recursive re-triggering
///
/// `update_field` actions can re-trigger matching rules indefinitely; depth
/// counting is the only loop-prevention mechanism. No cycle detection across
/// distinct rules is attempted.
pub const MAX_AUTOMATION_DEPTH: u32 = 3;

/// Old/new values for a single mutated field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldChange {
    pub old: Value,
    pub new: Value,
}

/// An entity mutation (or synthetic scan result) awaiting rule evaluation
///
/// Created by the mutation path or the scheduler; exclusively consumed, and
/// possibly regenerated at `depth + 1`, by the automation engine. Not
/// persisted as a first-class entity; it lives on the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerEvent {
    pub trigger: Trigger,
    pub entity_kind: EntityKind,
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changes: Option<HashMap<String, FieldChange>>,
    #[serde(default)]
    pub depth: u32,
}

impl TriggerEvent {
    /// A fresh event at depth 0 with no field diff
    pub fn new(trigger: Trigger, entity_kind: EntityKind, entity_id: impl Into<String>) -> Self {
        Self {
            trigger,
            entity_kind,
            entity_id: entity_id.into(),
            changes: None,
            depth: 0,
        }
    }

    /// The follow-up event produced when an action mutates a field
    ///
    /// Depth is incremented from the triggering event so the engine can bound
    /// the causal chain.
    pub fn followup(
        &self,
        trigger: Trigger,
        field: impl Into<String>,
        old: Value,
        new: Value,
    ) -> Self {
        let mut changes = HashMap::new();
        changes.insert(field.into(), FieldChange { old, new });
        Self {
            trigger,
            entity_kind: self.entity_kind,
            entity_id: self.entity_id.clone(),
            changes: Some(changes),
            depth: self.depth + 1,
        }
    }

    /// Whether this event sits at or beyond the recursion ceiling
    pub fn depth_exceeded(&self) -> bool {
        self.depth >= MAX_AUTOMATION_DEPTH
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
