// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! User role lookup

use crate::entity::StoreError;
use async_trait::async_trait;
use loam_core::Role;
use std::collections::HashMap;
use std::sync::Mutex;

/// Resolves a user's current role
///
/// Queried at execution time, not authoring time: a rule creator's role may
/// have changed since the rule was written.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `None` when the user no longer exists
    async fn role_of(&self, user_id: &str) -> Result<Option<Role>, StoreError>;
}

/// In-memory user directory
#[derive(Default)]
pub struct MemoryUserDirectory {
    roles: Mutex<HashMap<String, Role>>,
}

impl MemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or change) a user's role
    pub fn set_role(&self, user_id: impl Into<String>, role: Role) {
        let mut roles = self.roles.lock().unwrap_or_else(|e| e.into_inner());
        roles.insert(user_id.into(), role);
    }

    /// Remove a user entirely
    pub fn remove(&self, user_id: &str) {
        let mut roles = self.roles.lock().unwrap_or_else(|e| e.into_inner());
        roles.remove(user_id);
    }
}

#[async_trait]
impl UserDirectory for MemoryUserDirectory {
    async fn role_of(&self, user_id: &str) -> Result<Option<Role>, StoreError> {
        let roles = self.roles.lock().unwrap_or_else(|e| e.into_inner());
        Ok(roles.get(user_id).copied())
    }
}
