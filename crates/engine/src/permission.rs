// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Execution-time permission re-validation
//!
//! A rule executes under its creator's authority as it stands *now*, not as
//! it stood when the rule was authored. Rules with no recorded creator are
//! system rules and run with full authority.

use loam_adapters::{StoreError, UserDirectory};
use loam_core::{can_perform, AutomationRule, Capability, EntityKind};

/// Outcome of the creator permission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionCheck {
    Granted,
    /// Denied with the human-readable reason recorded in the audit row
    Denied(String),
}

impl PermissionCheck {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionCheck::Granted)
    }
}

/// Re-validate that a rule's creator may still mutate the target entity kind
pub async fn check_creator(
    users: &dyn UserDirectory,
    rule: &AutomationRule,
    target: EntityKind,
) -> Result<PermissionCheck, StoreError> {
    let Some(creator) = &rule.created_by else {
        return Ok(PermissionCheck::Granted);
    };

    match users.role_of(creator).await? {
        None => Ok(PermissionCheck::Denied(format!(
            "creator {} no longer exists",
            creator
        ))),
        Some(role) => {
            if can_perform(role, Capability::Update, target) {
                Ok(PermissionCheck::Granted)
            } else {
                Ok(PermissionCheck::Denied(format!(
                    "creator {} lacks permission to update {}",
                    creator, target
                )))
            }
        }
    }
}

#[cfg(test)]
#[path = "permission_tests.rs"]
mod tests;
