// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Coarse role capabilities
//!
//! `can_perform` is the pure capability function the engine consults when
//! re-validating a rule creator's authority at execution time. Session and
//! row-level scoping live in the API layer; this matrix only answers whether
//! a role may perform a mutation kind on a resource type at all.

use crate::entity::EntityKind;
use serde::{Deserialize, Serialize};

/// A user's coarse role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Manager,
    Member,
    Viewer,
}

/// The mutation kinds automations imply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Create,
    Update,
    Delete,
}

/// Whether `role` may perform `capability` on `resource`
pub fn can_perform(role: Role, capability: Capability, resource: EntityKind) -> bool {
    match role {
        Role::Admin => true,
        Role::Manager => !matches!(capability, Capability::Delete),
        Role::Member => match capability {
            Capability::Delete => false,
            // Members cannot touch company records
            Capability::Create | Capability::Update => !matches!(resource, EntityKind::Company),
        },
        Role::Viewer => false,
    }
}
