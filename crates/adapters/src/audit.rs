// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Append-only automation audit store

use crate::entity::StoreError;
use async_trait::async_trait;
use loam_core::AutomationLog;
use std::sync::Mutex;

/// Audit log sink; rows are never mutated or deleted by the engine
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: AutomationLog) -> Result<(), StoreError>;
}

/// In-memory audit store recording appended rows in order
#[derive(Default)]
pub struct MemoryAuditStore {
    entries: Mutex<Vec<AutomationLog>>,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows appended so far
    pub fn entries(&self) -> Vec<AutomationLog> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn append(&self, entry: AutomationLog) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(entry);
        Ok(())
    }
}
