// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Entity kinds and loosely-typed entity snapshots
//!
//! The engine treats CRM entities as JSON objects read from the entity store.
//! Conditions and interpolation reference fields by name, so a fixed struct
//! per entity type would buy nothing here; the typed seam is `EntityKind`,
//! which selects the repository an operation dispatches to.

use crate::trigger::Trigger;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point-in-time snapshot of an entity, as stored
pub type Entity = serde_json::Map<String, serde_json::Value>;

/// The entity types automations can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Deal,
    Contact,
    Company,
    Task,
    Notification,
    Activity,
}

impl EntityKind {
    /// All kinds, in registry order
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Deal,
        EntityKind::Contact,
        EntityKind::Company,
        EntityKind::Task,
        EntityKind::Notification,
        EntityKind::Activity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Deal => "deal",
            EntityKind::Contact => "contact",
            EntityKind::Company => "company",
            EntityKind::Task => "task",
            EntityKind::Notification => "notification",
            EntityKind::Activity => "activity",
        }
    }

    /// The trigger synthesized when an automation mutates a field on this kind
    ///
    /// Mirrors the `{ENTITYTYPE}_UPDATED` re-trigger produced by the
    /// `update_field` action. Kinds without an update trigger (notifications,
    /// activities) return `None`; mutating them does not re-enter the engine.
    pub fn updated_trigger(&self) -> Option<Trigger> {
        match self {
            EntityKind::Deal => Some(Trigger::DealUpdated),
            EntityKind::Contact => Some(Trigger::ContactUpdated),
            EntityKind::Company => Some(Trigger::CompanyUpdated),
            EntityKind::Task => Some(Trigger::TaskUpdated),
            EntityKind::Notification | EntityKind::Activity => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static NULL: serde_json::Value = serde_json::Value::Null;

/// Get a field from an entity snapshot, treating absence as JSON null
pub fn field<'a>(entity: &'a Entity, name: &str) -> &'a serde_json::Value {
    entity.get(name).unwrap_or(&NULL)
}
