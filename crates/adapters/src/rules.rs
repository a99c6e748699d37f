// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Loam Contributors

//! Automation rule store

use crate::entity::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use loam_core::{AutomationRule, Trigger};
use std::sync::Mutex;

/// Read access to automation rules plus run-stat bookkeeping
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Active rules whose trigger matches, in stored order
    async fn find_active_by_trigger(
        &self,
        trigger: Trigger,
    ) -> Result<Vec<AutomationRule>, StoreError>;

    /// Bump run_count and set last_run_at after a successful run
    async fn increment_run_stats(
        &self,
        rule_id: &str,
        ran_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// In-memory rule store
#[derive(Default)]
pub struct MemoryRuleStore {
    rules: Mutex<Vec<AutomationRule>>,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, rule: AutomationRule) {
        let mut rules = self.rules.lock().unwrap_or_else(|e| e.into_inner());
        rules.push(rule);
    }

    /// Fetch a rule by id, for assertions on run stats
    pub fn get(&self, rule_id: &str) -> Option<AutomationRule> {
        let rules = self.rules.lock().unwrap_or_else(|e| e.into_inner());
        rules.iter().find(|r| r.id == rule_id).cloned()
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn find_active_by_trigger(
        &self,
        trigger: Trigger,
    ) -> Result<Vec<AutomationRule>, StoreError> {
        let rules = self.rules.lock().unwrap_or_else(|e| e.into_inner());
        Ok(rules
            .iter()
            .filter(|r| r.is_active && r.trigger == trigger)
            .cloned()
            .collect())
    }

    async fn increment_run_stats(
        &self,
        rule_id: &str,
        ran_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut rules = self.rules.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(rule) = rules.iter_mut().find(|r| r.id == rule_id) {
            rule.run_count += 1;
            rule.last_run_at = Some(ran_at);
        }
        Ok(())
    }
}
